use std::sync::Arc;

use crate::config::Config;
use crate::service::SearchService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<SearchService>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let service = SearchService::from_config(&config).await?;
        Ok(Self::with_service(config, service))
    }

    pub fn with_service(config: Config, service: SearchService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }
}
