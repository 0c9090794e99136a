use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::provider::types::{parse_error_body, ProviderError};

/// A chat-completion backend. The engine talks to providers only through
/// this trait so its fallback chain can be exercised without a network.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Issues exactly one chat-completion request. No retry, no fallback;
    /// that is the orchestrator's job.
    ///
    /// # Arguments
    /// * `config` - Endpoint, credentials and timeout for this provider
    /// * `system_prompt` - The system role message
    /// * `user_prompt` - The user role message
    ///
    /// # Returns
    /// The assistant message content, or a classified failure.
    async fn call_single(
        &self,
        config: &ProviderConfig,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError>;
}

/// Default `ChatProvider` speaking the OpenAI-compatible wire shape.
#[derive(Clone, Default)]
pub struct HttpChatProvider {
    client: Client,
}

impl HttpChatProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn endpoint_url(config: &ProviderConfig) -> String {
        format!(
            "{}/chat/completions",
            config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn call_single(
        &self,
        config: &ProviderConfig,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured {
                provider: config.name.clone(),
            });
        }

        let url = Self::endpoint_url(config);
        let body = json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": 0.7,
            "max_tokens": 1500,
            "stream": false,
            "top_p": 0.9,
            "frequency_penalty": 0.1
        });

        #[cfg(debug_assertions)]
        log::debug!("Request URL: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        provider: config.name.clone(),
                        seconds: config.timeout.as_secs(),
                    }
                } else {
                    ProviderError::Request {
                        provider: config.name.clone(),
                        details: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Auth {
                provider: config.name.clone(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: config.name.clone(),
                    seconds: config.timeout.as_secs(),
                }
            } else {
                ProviderError::Request {
                    provider: config.name.clone(),
                    details: e.to_string(),
                }
            }
        })?;

        if !status.is_success() {
            let message = match parse_error_body(&text) {
                Some((error_type, message)) => {
                    log::warn!(
                        "Error response - Status: {}, Type: {}, Message: {}",
                        status.as_u16(),
                        error_type,
                        message
                    );
                    message
                }
                None => text,
            };
            return Err(ProviderError::Http {
                provider: config.name.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let data: Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::Shape {
                provider: config.name.clone(),
                details: e.to_string(),
            })?;

        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Shape {
                provider: config.name.clone(),
                details: "missing choices[0].message.content".to_string(),
            })
    }
}
