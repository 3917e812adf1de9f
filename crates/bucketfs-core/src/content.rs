use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioContent {
    pub data: String,
    pub mime_type: String,
}

/// A single item of a tool result, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    Text(TextContent),
    Image(ImageContent),
    Audio(AudioContent),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(TextContent { text: text.into() })
    }

    /// Image content from already base64-encoded data.
    pub fn image<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        Content::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    /// Audio content from already base64-encoded data.
    pub fn audio<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        Content::Audio(AudioContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    pub fn image_bytes<T: Into<String>>(bytes: &[u8], mime_type: T) -> Self {
        Self::image(BASE64.encode(bytes), mime_type)
    }

    pub fn audio_bytes<T: Into<String>>(bytes: &[u8], mime_type: T) -> Self {
        Self::audio(BASE64.encode(bytes), mime_type)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// `(data, mime_type)` of an image item.
    pub fn as_image(&self) -> Option<(&str, &str)> {
        match self {
            Content::Image(image) => Some((&image.data, &image.mime_type)),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<(&str, &str)> {
        match self {
            Content::Audio(audio) => Some((&audio.data, &audio.mime_type)),
            _ => None,
        }
    }
}
