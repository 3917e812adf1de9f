//! Conversion of stored file bytes into content a model can consume.
//!
//! [`FileKind::classify`] picks a strategy from the MIME type and filename; [`resolve`] applies
//! it. Unknown types and PDFs without a text layer resolve to
//! [`ContentEnvelope::Unsupported`], which is a normal result. Errors are reserved for decoder
//! failures on a recognized format and always come back as [`Error::Conversion`].

mod container;
pub mod docx;
pub mod kind;
pub mod pdf;
pub mod sheet;
pub mod slides;
pub mod xmind;

use std::time::Duration;

use bytes::Bytes;

use crate::{
    core::Content,
    error::{Error, Result},
};

pub use kind::FileKind;

pub const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type";
pub const PDF_WITHOUT_TEXT: &str =
    "Please convert the pdf to a word document or image format first";

/// Default bound on a single document decode.
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub enum ContentEnvelope {
    Text(String),
    Image { data: Bytes, mime_type: String },
    Audio { data: Bytes, mime_type: String },
    Unsupported(String),
}

impl ContentEnvelope {
    pub fn unsupported<S: Into<String>>(reason: S) -> Self {
        ContentEnvelope::Unsupported(reason.into())
    }

    pub fn into_content(self) -> Content {
        match self {
            ContentEnvelope::Text(text) => Content::text(text),
            ContentEnvelope::Image { data, mime_type } => Content::image_bytes(&data, mime_type),
            ContentEnvelope::Audio { data, mime_type } => Content::audio_bytes(&data, mime_type),
            ContentEnvelope::Unsupported(reason) => Content::text(reason),
        }
    }
}

/// Classifies `content` by `mime_type` and `filename` and converts it.
pub fn resolve(content: &[u8], mime_type: &str, filename: &str) -> Result<ContentEnvelope> {
    resolve_kind(FileKind::classify(mime_type, filename), content, mime_type)
}

/// Converts `content` with an already chosen strategy. `mime_type` becomes the hint on image
/// and audio envelopes.
pub fn resolve_kind(kind: FileKind, content: &[u8], mime_type: &str) -> Result<ContentEnvelope> {
    let envelope = match kind {
        FileKind::Image => ContentEnvelope::Image {
            data: Bytes::copy_from_slice(content),
            mime_type: mime_type.to_string(),
        },
        FileKind::Audio => ContentEnvelope::Audio {
            data: Bytes::copy_from_slice(content),
            mime_type: mime_type.to_string(),
        },
        FileKind::Text => ContentEnvelope::Text(String::from_utf8_lossy(content).into_owned()),
        FileKind::Word => ContentEnvelope::Text(docx::to_markdown(content)?),
        FileKind::Spreadsheet => ContentEnvelope::Text(sheet::read_workbook(content)?.to_json()?),
        FileKind::Presentation => {
            ContentEnvelope::Text(serde_json::to_string(&slides::read_presentation(content)?)?)
        }
        FileKind::Pdf => {
            let text = pdf::extract_text(content)?;
            if pdf::has_text_layer(&text) {
                ContentEnvelope::Text(serde_json::to_string(&text)?)
            } else {
                ContentEnvelope::unsupported(PDF_WITHOUT_TEXT)
            }
        }
        FileKind::MindMap => {
            ContentEnvelope::Text(serde_json::to_string(&xmind::read_mind_map(content)?)?)
        }
        FileKind::Unsupported => ContentEnvelope::unsupported(UNSUPPORTED_FILE_TYPE),
    };
    Ok(envelope)
}

/// Runs [`resolve_kind`] off the async runtime with a deadline on document decoders.
#[derive(Debug, Clone, Copy)]
pub struct ContentResolver {
    decode_timeout: Duration,
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_TIMEOUT)
    }
}

impl ContentResolver {
    pub fn new(decode_timeout: Duration) -> Self {
        Self { decode_timeout }
    }

    pub async fn resolve_kind(
        &self,
        kind: FileKind,
        content: Bytes,
        mime_type: String,
    ) -> Result<ContentEnvelope> {
        if !kind.needs_decoder() {
            return resolve_kind(kind, &content, &mime_type);
        }

        let task = tokio::task::spawn_blocking(move || resolve_kind(kind, &content, &mime_type));
        match tokio::time::timeout(self.decode_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!(%kind, error = %join_error, "Decoder crashed");
                Err(Error::conversion(kind.as_str(), "decoder crashed"))
            }
            // The blocking thread cannot be interrupted; it finishes in the background.
            Err(_) => Err(Error::conversion(
                kind.as_str(),
                format!("decoding exceeded {}s", self.decode_timeout.as_secs()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_returned_verbatim() {
        let samples = [
            ("text/plain", "notes.txt", "plain text\r\nwith lines"),
            ("text/csv", "t.csv", "a,b\n1,2\n"),
            ("text/html", "i.html", "<p>héllo ✓</p>"),
            ("application/octet-stream", "readme.md", "# Title\n\n* item"),
            ("", "empty.md", ""),
        ];
        for (mime, name, text) in samples {
            assert_eq!(
                resolve(text.as_bytes(), mime, name).unwrap(),
                ContentEnvelope::Text(text.to_string()),
                "{mime}"
            );
        }
    }

    #[test]
    fn unknown_types_are_unsupported_not_errors() {
        let envelope = resolve(b"\x00\x01\x02", "application/zip", "bundle.zip").unwrap();
        assert_eq!(
            envelope,
            ContentEnvelope::Unsupported(UNSUPPORTED_FILE_TYPE.to_string())
        );
    }

    #[test]
    fn audio_passes_bytes_through() {
        let envelope = resolve(b"ID3\x04", "audio/mpeg", "song.mp3").unwrap();
        assert_eq!(
            envelope,
            ContentEnvelope::Audio {
                data: Bytes::from_static(b"ID3\x04"),
                mime_type: "audio/mpeg".into()
            }
        );
    }

    #[test]
    fn corrupt_office_document_is_a_conversion_error() {
        let err = resolve(b"not a zip", kind::MIME_DOCX, "a.docx").unwrap_err();
        assert!(matches!(err, Error::Conversion { ref format, .. } if format == "docx"));
    }

    #[test]
    fn unsupported_envelope_becomes_plain_text_content() {
        let content = ContentEnvelope::unsupported(PDF_WITHOUT_TEXT).into_content();
        assert_eq!(content.as_text(), Some(PDF_WITHOUT_TEXT));
    }

    #[tokio::test]
    async fn resolver_reports_decoder_failures_as_conversion_errors() {
        let resolver = ContentResolver::default();
        let err = resolver
            .resolve_kind(
                FileKind::Spreadsheet,
                Bytes::from_static(b"garbage"),
                kind::MIME_XLSX.into(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
    }

    #[test]
    fn pdf_text_is_returned_as_a_json_string() {
        let pdf = pdf::testing::build_pdf("BT /F1 12 Tf 72 712 Td (Invoice 42) Tj ET");
        let ContentEnvelope::Text(json) = resolve(&pdf, "application/pdf", "invoice.pdf").unwrap()
        else {
            panic!("expected text");
        };
        let text: String = serde_json::from_str(&json).unwrap();
        assert!(text.split_whitespace().collect::<String>().contains("Invoice42"));
    }

    #[test]
    fn pdf_without_text_asks_for_conversion() {
        let pdf = pdf::testing::build_pdf("");
        let envelope = resolve(&pdf, "application/pdf", "scan.pdf").unwrap();
        assert_eq!(envelope, ContentEnvelope::unsupported(PDF_WITHOUT_TEXT));
        assert_eq!(envelope.into_content().as_text(), Some(PDF_WITHOUT_TEXT));
    }

    #[tokio::test]
    async fn resolver_rejects_deeply_nested_mind_maps() {
        let depth = 200_000;
        let xml = format!(
            "<xmap-content><sheet>{}{}</sheet></xmap-content>",
            "<topic><children><topics>".repeat(depth),
            "</topics></children></topic>".repeat(depth),
        );
        let zip = container::testing::build_zip(&[("content.xml", xml.as_str())]);
        let err = ContentResolver::default()
            .resolve_kind(FileKind::MindMap, Bytes::from(zip), kind::MIME_XMIND.into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { ref format, .. } if format == "xmind"));
    }

    #[tokio::test]
    async fn resolver_handles_plain_kinds_inline() {
        let resolver = ContentResolver::new(Duration::from_millis(1));
        let envelope = resolver
            .resolve_kind(FileKind::Text, Bytes::from_static(b"hi"), "text/plain".into())
            .await
            .unwrap();
        assert_eq!(envelope, ContentEnvelope::Text("hi".into()));
    }
}
