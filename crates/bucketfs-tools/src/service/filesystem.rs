use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::params::{
    FileIdParams, WriteBase64Params, WriteContentParams, WritePathParams, parse,
};
use crate::{
    core::{Tool, content::Content, protocol::capabilities::ServerCapabilities},
    error::{Error, Result},
    resolver::{ContentEnvelope, ContentResolver, FileKind, UNSUPPORTED_FILE_TYPE},
    server::{CapabilitiesBuilder, Router},
    storage::{FileMetadata, PreviewSpec, StorageGateway},
};

pub const DELETED_MESSAGE: &str = "Deleted file successfully";

/// A fresh backend file id: a v4 UUID as 32 lowercase hex characters.
pub fn new_file_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The subset of [`FileMetadata`] returned by `list` and `get_file_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_id: String,
    pub name: String,
    pub signature: String,
    pub size: u64,
    pub mime_type: String,
}

impl From<FileMetadata> for FileSummary {
    fn from(metadata: FileMetadata) -> Self {
        FileSummary {
            file_id: metadata.id,
            name: metadata.name,
            signature: metadata.signature,
            size: metadata.size_original,
            mime_type: metadata.mime_type,
        }
    }
}

/// File-system style tools over a single storage bucket.
#[derive(Clone)]
pub struct FileSystemService {
    storage: Arc<dyn StorageGateway>,
    resolver: ContentResolver,
}

impl FileSystemService {
    pub fn new(storage: Arc<dyn StorageGateway>, resolver: ContentResolver) -> Self {
        Self { storage, resolver }
    }

    async fn read(&self, file_id: &str) -> Result<Content> {
        let metadata = self.storage.get_file(file_id).await?;
        let kind = FileKind::classify(&metadata.mime_type, &metadata.name);
        tracing::debug!(file_id, %kind, mime_type = %metadata.mime_type, "Reading file");

        let envelope = match kind {
            // Images are served as a downscaled rendition, never the original bytes.
            FileKind::Image => {
                let preview = self
                    .storage
                    .get_file_preview(file_id, PreviewSpec::READ)
                    .await?;
                let mime_type = preview
                    .mime_type
                    .filter(|m| m.starts_with("image/"))
                    .unwrap_or(metadata.mime_type);
                ContentEnvelope::Image {
                    data: preview.bytes,
                    mime_type,
                }
            }
            FileKind::Unsupported => ContentEnvelope::unsupported(UNSUPPORTED_FILE_TYPE),
            kind => {
                let bytes = self.storage.get_file_view(file_id).await?;
                self.resolver
                    .resolve_kind(kind, bytes, metadata.mime_type)
                    .await?
            }
        };

        Ok(envelope.into_content())
    }

    async fn upload(&self, filename: &str, content: Bytes) -> Result<String> {
        let file_id = new_file_id();
        let size = content.len();
        self.storage.create_file(&file_id, filename, content).await?;
        tracing::info!(file_id = %file_id, filename, size, "Uploaded file");
        Ok(file_id)
    }

    async fn write_by_path(&self, filename: &str, path: &str) -> Result<String> {
        let content = tokio::fs::read(path).await?;
        let file_id = self.upload(filename, Bytes::from(content)).await?;

        // Removal failure after a successful upload is logged, not returned.
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path, error = %e, "Failed to remove uploaded source file");
        }
        Ok(file_id)
    }

    async fn write_by_base64(&self, filename: &str, data: &str) -> Result<String> {
        let content = BASE64
            .decode(data.trim())
            .map_err(|e| Error::InvalidParameters(format!("data is not valid base64: {e}")))?;
        self.upload(filename, Bytes::from(content)).await
    }

    async fn delete(&self, file_id: &str) -> Result<String> {
        self.storage.delete_file(file_id).await?;
        tracing::info!(file_id, "Deleted file");
        Ok(DELETED_MESSAGE.to_string())
    }

    async fn list(&self) -> Result<String> {
        let list = self.storage.list_files().await?;
        let files: Vec<FileSummary> = list.files.into_iter().map(FileSummary::from).collect();
        Ok(json!({ "total": list.total, "files": files }).to_string())
    }

    async fn get_file_metadata(&self, file_id: &str) -> Result<String> {
        let metadata = self.storage.get_file(file_id).await?;
        Ok(serde_json::to_string(&FileSummary::from(metadata))?)
    }
}

fn file_id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "fileId": { "type": "string", "description": description }
        },
        "required": ["fileId"]
    })
}

fn write_schema(field: &str, description: &str) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "filename": {
                "type": "string",
                "description": "Name of the file to create, including its extension"
            }
        },
        "required": ["filename", field]
    });
    schema["properties"][field] = json!({ "type": "string", "description": description });
    schema
}

#[async_trait]
impl Router for FileSystemService {
    fn name(&self) -> String {
        "bucketfs".to_string()
    }

    fn instructions(&self) -> String {
        "This server exposes a storage bucket as a file system. Files are addressed by id; \
         use list to discover ids and read to get their content as text, image or audio."
            .to_string()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new().with_tools(false).build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "read",
                "Read a file. Documents, spreadsheets, presentations, PDFs and mind maps are \
                 converted to text; images and audio are returned as media.",
                file_id_schema("Id of the file to read"),
            ),
            Tool::new(
                "write_by_content",
                "Create a file from text content and return its id",
                write_schema("content", "Text content of the file"),
            ),
            Tool::new(
                "write_by_path",
                "Upload a local file and return its id. The local file is removed after a \
                 successful upload.",
                write_schema("path", "Path of the local file to upload"),
            ),
            Tool::new(
                "write_by_base64",
                "Create a file from base64 encoded bytes and return its id",
                write_schema("data", "Base64 encoded file content"),
            ),
            Tool::new(
                "delete",
                "Delete a file",
                file_id_schema("Id of the file to delete"),
            ),
            Tool::new(
                "list",
                "List the files in the bucket",
                json!({ "type": "object", "properties": {} }),
            ),
            Tool::new(
                "get_file_metadata",
                "Get the id, name, signature, size and MIME type of a file",
                file_id_schema("Id of the file"),
            ),
        ]
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Vec<Content>> {
        let content = match tool_name {
            "read" => {
                let params: FileIdParams = parse(tool_name, arguments)?;
                self.read(&params.file_id).await?
            }
            "write_by_content" => {
                let params: WriteContentParams = parse(tool_name, arguments)?;
                Content::text(
                    self.upload(&params.filename, Bytes::from(params.content))
                        .await?,
                )
            }
            "write_by_path" => {
                let params: WritePathParams = parse(tool_name, arguments)?;
                Content::text(self.write_by_path(&params.filename, &params.path).await?)
            }
            "write_by_base64" => {
                let params: WriteBase64Params = parse(tool_name, arguments)?;
                Content::text(self.write_by_base64(&params.filename, &params.data).await?)
            }
            "delete" => {
                let params: FileIdParams = parse(tool_name, arguments)?;
                Content::text(self.delete(&params.file_id).await?)
            }
            "list" => Content::text(self.list().await?),
            "get_file_metadata" => {
                let params: FileIdParams = parse(tool_name, arguments)?;
                Content::text(self.get_file_metadata(&params.file_id).await?)
            }
            _ => return Err(Error::ToolNotFound(tool_name.to_string())),
        };
        Ok(vec![content])
    }
}
