//! The network exchange with the provider.
//!
//! One POST per call: no retries and no streaming.  Every failure is mapped
//! onto a [`CompletionError`] variant the caller can show to the user.

use gemchat_shared::constants::{API_KEY_HEADER, DEFAULT_MODEL};
use gemchat_shared::protocol::GenerateContentResponse;
use gemchat_store::{Chat, GlobalSettings};

use crate::config::ClientConfig;
use crate::error::CompletionError;
use crate::request::build_payload;

const API_ERROR_FALLBACK: &str = "Gemini API returned an error.";

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CompletionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// `{endpoint}/{model}:generateContent`, with a blank model replaced by
    /// the default.
    pub fn url_for(&self, model: &str) -> String {
        let model = match model.trim() {
            "" => DEFAULT_MODEL,
            trimmed => trimmed,
        };
        format!("{}/{}:generateContent", self.endpoint, model)
    }

    /// Send the chat's conversation window and return the reply text.
    ///
    /// Fails without touching the network when no key is configured or the
    /// chat has nothing to send.
    pub async fn complete(
        &self,
        chat: &Chat,
        settings: &GlobalSettings,
    ) -> Result<String, CompletionError> {
        let api_key = settings.api_key.trim();
        if api_key.is_empty() {
            return Err(CompletionError::MissingKey);
        }

        let payload = build_payload(chat, settings)?;
        let url = self.url_for(&settings.model);

        tracing::debug!(
            chat_id = %chat.id,
            turns = payload.contents.len(),
            url = %url,
            "sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(status = status.as_u16(), error = %e, "failed to read error body");
                    String::new()
                }
            };
            tracing::warn!(status = status.as_u16(), "completion request rejected");
            return Err(CompletionError::ApiError {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        let body: GenerateContentResponse = serde_json::from_slice(&bytes)?;

        if let Some(error) = body.error {
            let message = error
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| API_ERROR_FALLBACK.to_string());
            tracing::warn!(message = %message, "provider returned an error object");
            return Err(CompletionError::ApiError {
                status: None,
                message,
            });
        }

        let text = body.first_candidate_text();
        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        tracing::debug!(chat_id = %chat.id, chars = text.chars().count(), "completion received");
        Ok(text)
    }
}
