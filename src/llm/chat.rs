use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{ensure_success, ProviderError};

/// A chat-style completion: one system prompt, one user turn, one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Chat completions over HTTP against Ollama or an OpenAI-compatible API.
pub struct HttpChatModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpChatModel {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let content = match self.config.provider.as_str() {
            "ollama" => call_ollama(&self.client, &self.config, system, user).await?,
            "openai" => call_openai(&self.client, &self.config, system, user).await?,
            other => return Err(ProviderError::Unsupported(other.to_string())),
        };

        let content = content.trim();
        if content.is_empty() {
            return Err(ProviderError::Malformed("empty completion".to_string()));
        }
        Ok(content.to_string())
    }
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

fn messages(system: &str, user: &str) -> Vec<Message> {
    vec![
        Message {
            role: "system".to_string(),
            content: system.to_string(),
        },
        Message {
            role: "user".to_string(),
            content: user.to_string(),
        },
    ]
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, ProviderError> {
    let url = format!("{}/api/chat", config.base_url.trim_end_matches('/'));

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: messages(system, user),
        stream: false,
    };

    let resp = client.post(&url).json(&req).send().await?;
    let body: OllamaChatResponse = ensure_success(resp).await?.json().await?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, ProviderError> {
    let url = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: messages(system, user),
        temperature: 0.3,
    };

    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&req)
        .send()
        .await?;

    let body: OpenAiChatResponse = ensure_success(resp).await?.json().await?;
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::Malformed("no choices in completion".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            base_url: server.uri(),
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_openai_completion_sends_system_and_user_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "bike lanes"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "  protected bike lanes  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = HttpChatModel::new(reqwest::Client::new(), config_for(&server, "openai"));
        let out = model.complete("be brief", "bike lanes").await.unwrap();
        assert_eq!(out, "protected bike lanes");
    }

    #[tokio::test]
    async fn test_ollama_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "zoning variance"}
            })))
            .mount(&server)
            .await;

        let model = HttpChatModel::new(reqwest::Client::new(), config_for(&server, "ollama"));
        assert_eq!(model.complete("sys", "zoning").await.unwrap(), "zoning variance");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let model = HttpChatModel::new(reqwest::Client::new(), config_for(&server, "openai"));
        match model.complete("sys", "q").await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "   "}}]
            })))
            .mount(&server)
            .await;

        let model = HttpChatModel::new(reqwest::Client::new(), config_for(&server, "openai"));
        assert!(matches!(
            model.complete("sys", "q").await,
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        let model = HttpChatModel::new(reqwest::Client::new(), config);
        assert!(matches!(
            model.complete("sys", "q").await,
            Err(ProviderError::Unsupported(p)) if p == "carrier-pigeon"
        ));
    }
}
