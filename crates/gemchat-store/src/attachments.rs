//! Attachment sanitization and size formatting.
//!
//! Attachments arrive from file ingestion, from edit/retry flows that copy an
//! earlier message, and from legacy stored data.  All of them pass through
//! [`sanitize_attachments`] before they are stored, so a stored attachment
//! always carries a non-empty base64 payload and a MIME type.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use gemchat_shared::constants::DEFAULT_MIME_TYPE;

use crate::models::Attachment;

/// Loosely-typed attachment as supplied by a caller or found in stored data.
///
/// Deserialization never fails on a wrongly-typed field: such a field is
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
}

impl From<Attachment> for AttachmentInput {
    fn from(a: Attachment) -> Self {
        Self {
            name: Some(a.name),
            mime_type: Some(a.mime_type),
            data: Some(a.data),
            size: a.size,
        }
    }
}

impl From<&Attachment> for AttachmentInput {
    fn from(a: &Attachment) -> Self {
        a.clone().into()
    }
}

/// Drop entries without data, default missing MIME types and names.
pub fn sanitize_attachments<I>(inputs: I) -> Vec<Attachment>
where
    I: IntoIterator<Item = AttachmentInput>,
{
    inputs
        .into_iter()
        .filter_map(|input| {
            let data = input.data.filter(|d| !d.is_empty())?;
            let mime_type = input
                .mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

            Some(Attachment {
                name: input.name.unwrap_or_default(),
                mime_type,
                data,
                size: input.size,
            })
        })
        .collect()
}

/// Human-readable byte count (`"512 B"`, `"1.5 KB"`, `"12 MB"`).
///
/// Non-finite and non-positive sizes produce an empty string.
pub fn format_size(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if !bytes.is_finite() || bytes <= 0.0 {
        return String::new();
    }

    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let precision = if size >= 10.0 || unit == 0 { 0 } else { 1 };
    // ties round up, not to even
    let scale = 10f64.powi(precision as i32);
    let rounded = (size * scale).round() / scale;
    format!("{:.*} {}", precision, rounded, UNITS[unit])
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.floor() as u64)
        }),
        _ => None,
    })
}
