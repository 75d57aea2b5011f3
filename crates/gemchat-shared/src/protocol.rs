//! Wire types for the Gemini `generateContent` exchange.
//!
//! Field names follow the provider's JSON exactly: the request mixes
//! camelCase (`generationConfig`, `maxOutputTokens`) with snake_case
//! (`system_instruction`, `inline_data`, `mime_type`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::Role;

/// Request body for `POST {endpoint}/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    /// Conversation turns, oldest first
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
    /// Present only when the chat carries non-empty system instructions
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system_instruction: Option<SystemInstruction>,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// A unit of transmissible content within a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Base64 payload with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Response body.  Either `candidates` or `error` is populated.  Decoding
/// never fails on a missing, `null` or wrongly-typed field: such a field is
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerateContentResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub candidates: Vec<Candidate>,
    /// Set for any truthy `error` value; a non-object one yields an empty body.
    #[serde(default, deserialize_with = "error_object", skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Candidate {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CandidateContent {
    #[serde(default, deserialize_with = "lenient_list")]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponsePart {
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

/// Provider-reported error object
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| serde_json::from_value(v).ok()))
}

/// A list whose undecodable items fall back to their default, so item
/// positions are kept.  Anything other than an array is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn error_object<'de, D>(deserializer: D) -> Result<Option<ApiErrorBody>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(value @ Value::Object(_)) => Some(serde_json::from_value(value).unwrap_or_default()),
        Some(_) => Some(ApiErrorBody::default()),
    })
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, trimmed.
    pub fn first_candidate_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Role::User,
                parts: vec![Part::text("Hi"), Part::inline("image/png", "AAAA")],
            }],
            generation_config: GenerationConfig {
                temperature: 0.6,
                max_output_tokens: 1024,
            },
            system_instruction: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Hi"},
                        {"inline_data": {"mime_type": "image/png", "data": "AAAA"}}
                    ]
                }],
                "generationConfig": {"temperature": 0.6, "maxOutputTokens": 1024}
            })
        );
    }

    #[test]
    fn test_first_candidate_text_joins_and_trims() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "  Hello"}, {"text": ", world  "}, {}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.first_candidate_text(), "Hello, world");
    }

    #[test]
    fn test_missing_candidates_yield_empty_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.first_candidate_text(), "");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_null_and_mistyped_fields_are_absent() {
        for body in [
            json!({"candidates": null}),
            json!({"candidates": "nope"}),
            json!({"candidates": [{"content": {"parts": null}}]}),
            json!({"candidates": [{"content": "nope"}]}),
            json!({"candidates": [7]}),
        ] {
            let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
            assert_eq!(response.first_candidate_text(), "");
            assert!(response.error.is_none());
        }

        let body = json!({"candidates": [{"content": {"parts": [{"text": 5}, {"text": "ok"}]}}]});
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.first_candidate_text(), "ok");
    }

    #[test]
    fn test_truthy_error_values() {
        for body in [json!({"error": "denied"}), json!({"error": true}), json!({"error": [1]})] {
            let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
            assert!(response.error.unwrap().message.is_none());
        }
        for body in [json!({"error": null}), json!({"error": false}), json!({"error": ""}), json!({"error": 0})] {
            let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
            assert!(response.error.is_none());
        }

        let body = json!({"error": {"code": "400", "message": "bad"}});
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, None);
        assert_eq!(error.message.as_deref(), Some("bad"));
    }

    #[test]
    fn test_error_body_decodes() {
        let body = json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}});
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.message.as_deref(), Some("API key not valid"));
        assert_eq!(error.code, Some(400));
    }
}
