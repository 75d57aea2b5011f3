//! Turning local files and data URLs into attachments.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use gemchat_shared::constants::DEFAULT_MIME_TYPE;
use gemchat_store::Attachment;

use crate::error::IngestError;

/// Read `path` and encode it as an attachment.
///
/// The MIME type is `declared_mime` when given and non-blank, otherwise it
/// is guessed from the file extension.
pub async fn read_attachment(path: &Path, declared_mime: Option<&str>) -> Result<Attachment, IngestError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(IngestError::Empty(path.to_path_buf()));
    }

    let mime_type = match non_blank(declared_mime) {
        Some(declared) => declared.to_string(),
        None => mime_guess::from_path(path).first_or_octet_stream().to_string(),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::debug!(name = %name, mime_type = %mime_type, size = bytes.len(), "file ingested");

    Ok(Attachment {
        name,
        mime_type,
        data: STANDARD.encode(&bytes),
        size: Some(bytes.len() as u64),
    })
}

/// Parse a `data:<mime>;base64,<payload>` URL.
///
/// A declared MIME type wins over the one in the header.
pub fn attachment_from_data_url(
    name: &str,
    url: &str,
    declared_mime: Option<&str>,
) -> Result<Attachment, IngestError> {
    let (meta, payload) = url
        .split_once(',')
        .ok_or_else(|| IngestError::InvalidDataUrl(format!("no payload in data URL for {name}")))?;
    if payload.is_empty() {
        return Err(IngestError::InvalidDataUrl(format!("empty payload for {name}")));
    }

    let header_mime = meta
        .strip_prefix("data:")
        .and_then(|rest| {
            let (mime, encoding) = rest.rsplit_once(';')?;
            encoding.eq_ignore_ascii_case("base64").then_some(mime)
        })
        .ok_or_else(|| IngestError::InvalidDataUrl(format!("{name} is not a base64 data URL")))?;

    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| IngestError::InvalidDataUrl(format!("bad base64 payload for {name}: {e}")))?;

    let mime_type = non_blank(declared_mime)
        .or(non_blank(Some(header_mime)))
        .unwrap_or(DEFAULT_MIME_TYPE)
        .trim()
        .to_string();

    Ok(Attachment {
        name: name.to_string(),
        mime_type,
        data: payload.to_string(),
        size: Some(decoded.len() as u64),
    })
}

/// Read every path, skipping (and logging) files that fail.
pub async fn read_attachments(paths: &[PathBuf]) -> Vec<Attachment> {
    let reads = paths.iter().map(|path| read_attachment(path, None));
    futures::future::join_all(reads)
        .await
        .into_iter()
        .zip(paths)
        .filter_map(|(result, path)| match result {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping attachment");
                None
            }
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_attachment_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let attachment = read_attachment(&path, None).await.unwrap();
        assert_eq!(attachment.name, "photo.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data, "iVBORw==");
        assert_eq!(attachment.size, Some(4));
    }

    #[tokio::test]
    async fn test_declared_mime_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.unknownext");
        std::fs::write(&path, b"hello").unwrap();

        let guessed = read_attachment(&path, Some("  ")).await.unwrap();
        assert_eq!(guessed.mime_type, DEFAULT_MIME_TYPE);

        let declared = read_attachment(&path, Some("text/markdown")).await.unwrap();
        assert_eq!(declared.mime_type, "text/markdown");
        assert_eq!(declared.data, "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_empty_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, b"").unwrap();

        assert!(matches!(
            read_attachment(&empty, None).await,
            Err(IngestError::Empty(_))
        ));
        assert!(matches!(
            read_attachment(&dir.path().join("missing.txt"), None).await,
            Err(IngestError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_attachments_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.txt");
        std::fs::write(&good, b"a").unwrap();

        let attachments = read_attachments(&[dir.path().join("nope.txt"), good]).await;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "a.txt");
        assert_eq!(attachments[0].mime_type, "text/plain");
    }

    #[test]
    fn test_data_url() {
        let a = attachment_from_data_url("cat.gif", "data:image/gif;base64,R0lGODlh", None).unwrap();
        assert_eq!(a.mime_type, "image/gif");
        assert_eq!(a.data, "R0lGODlh");
        assert_eq!(a.size, Some(6));

        let b = attachment_from_data_url("x", "data:;base64,AAAA", None).unwrap();
        assert_eq!(b.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(b.size, Some(3));

        let c = attachment_from_data_url("x", "data:image/gif;base64,AAAA", Some("image/webp")).unwrap();
        assert_eq!(c.mime_type, "image/webp");

        assert!(attachment_from_data_url("x", "data:image/gif;base64,", None).is_err());
        assert!(attachment_from_data_url("x", "no comma here", None).is_err());
    }

    #[test]
    fn test_data_url_must_carry_base64() {
        assert!(matches!(
            attachment_from_data_url("x.txt", "data:text/plain,hello", None),
            Err(IngestError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            attachment_from_data_url("x.txt", "data:text/plain;charset=utf-8,hello", None),
            Err(IngestError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            attachment_from_data_url("x.txt", "data:text/plain;base64,not base64!", None),
            Err(IngestError::InvalidDataUrl(_))
        ));
    }
}
