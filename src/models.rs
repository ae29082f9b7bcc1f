use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub start_date: Option<QueryDate>,
    #[serde(default)]
    pub end_date: Option<QueryDate>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            start_date: None,
            end_date: None,
            limit: default_limit(),
        }
    }

    /// Inclusive session-time window, or None when neither bound is set.
    pub fn date_range(&self) -> Option<DateRange> {
        if self.start_date.is_none() && self.end_date.is_none() {
            return None;
        }
        Some(DateRange {
            start: self.start_date.map(QueryDate::timestamp),
            end: self.end_date.map(|d| d.last_instant().timestamp()),
        })
    }
}

/// A date bound on a query. A bare date covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl QueryDate {
    /// Parse `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(QueryDate::Day(day));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(QueryDate::Instant(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|dt| QueryDate::Instant(dt.and_utc()))
    }

    /// Unix seconds of the first instant covered.
    pub fn timestamp(self) -> i64 {
        self.first_instant().timestamp()
    }

    fn first_instant(self) -> DateTime<Utc> {
        match self {
            QueryDate::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
            QueryDate::Instant(dt) => dt,
        }
    }

    fn last_instant(self) -> DateTime<Utc> {
        match self {
            QueryDate::Day(day) => day
                .and_hms_opt(23, 59, 59)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(|| day.and_time(NaiveTime::MIN).and_utc()),
            QueryDate::Instant(dt) => dt,
        }
    }
}

impl<'de> Deserialize<'de> for QueryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        QueryDate::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised date: {raw}")))
    }
}

/// Inclusive range of session times as unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateRange {
    pub fn contains(&self, epoch: i64) -> bool {
        self.start.is_none_or(|s| epoch >= s) && self.end.is_none_or(|e| epoch <= e)
    }
}

/// A single transcript passage returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub event_id: String,
    pub text: String,
    pub meeting_date: String,
    pub meeting_title: String,
    pub speaker: String,
    pub relevance_score: f32,
    pub start_time: String,
    pub end_time: String,
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    /// Wall-clock seconds spent in the pipeline
    pub processing_time: f64,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_defaults() {
        let q: SearchQuery = serde_json::from_str(r#"{"query": "bike lanes"}"#).unwrap();
        assert_eq!(q.limit, 10);
        assert!(q.start_date.is_none());
        assert!(q.date_range().is_none());
    }

    #[test]
    fn test_search_query_accepts_dates_and_datetimes() {
        let q: SearchQuery = serde_json::from_str(
            r#"{"query": "parks", "start_date": "2023-04-01", "end_date": "2023-04-30T18:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            q.start_date,
            Some(QueryDate::Day(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()))
        );
        assert!(matches!(q.end_date, Some(QueryDate::Instant(_))));
    }

    #[test]
    fn test_search_query_rejects_bad_date() {
        let err = serde_json::from_str::<SearchQuery>(r#"{"query": "parks", "start_date": "April"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unrecognised date"));
    }

    #[test]
    fn test_naive_datetime_taken_as_utc() {
        let d = QueryDate::parse("2023-04-01T09:30:00").unwrap();
        assert_eq!(d.first_instant().timestamp(), 1_680_341_400);
    }

    #[test]
    fn test_date_range_covers_whole_end_day() {
        let mut q = SearchQuery::new("parks");
        q.start_date = QueryDate::parse("2023-04-01");
        q.end_date = QueryDate::parse("2023-04-01");
        let range = q.date_range().unwrap();

        let midnight = 1_680_307_200; // 2023-04-01T00:00:00Z
        assert_eq!(range.start, Some(midnight));
        assert!(range.contains(midnight + 20 * 3600));
        assert!(!range.contains(midnight + 86_400));
        assert!(!range.contains(midnight - 1));
    }

    #[test]
    fn test_open_ended_range() {
        let range = DateRange {
            start: Some(100),
            end: None,
        };
        assert!(range.contains(i64::MAX));
        assert!(!range.contains(99));
    }

    #[test]
    fn test_response_serializes_expected_fields() {
        let resp = SearchResponse {
            results: vec![],
            total_results: 0,
            processing_time: 0.25,
            summary: "none".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["total_results"], 0);
        assert_eq!(json["processing_time"], 0.25);
        assert_eq!(json["summary"], "none");
    }
}
