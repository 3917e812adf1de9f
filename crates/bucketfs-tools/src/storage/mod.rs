pub mod appwrite;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use appwrite::{AppwriteGateway, StorageConfig};

/// Metadata of a stored file, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_original: u64,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileList {
    pub total: u64,
    pub files: Vec<FileMetadata>,
}

/// Dimensions and quality of a backend-rendered image preview. A zero dimension keeps the
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSpec {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl PreviewSpec {
    /// Rendition used when an image is read through the tools.
    pub const READ: PreviewSpec = PreviewSpec {
        width: 512,
        height: 0,
        quality: 60,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub bytes: Bytes,
    /// Content type reported for the rendition, when the backend sends one.
    pub mime_type: Option<String>,
}

/// Operations on the configured bucket. Implementations own the bucket id.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata>;

    async fn get_file_view(&self, file_id: &str) -> Result<Bytes>;

    async fn get_file_preview(&self, file_id: &str, spec: PreviewSpec) -> Result<Preview>;

    async fn create_file(&self, file_id: &str, filename: &str, content: Bytes)
    -> Result<FileMetadata>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;

    async fn list_files(&self) -> Result<FileList>;
}
