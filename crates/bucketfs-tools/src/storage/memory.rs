//! In-memory gateway for exercising the tools without a backend.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::{Error, Result},
    storage::{FileList, FileMetadata, Preview, PreviewSpec, StorageGateway},
};

struct StoredFile {
    metadata: FileMetadata,
    content: Bytes,
    preview: Option<Preview>,
}

#[derive(Default)]
pub struct MemoryGateway {
    files: Mutex<BTreeMap<String, StoredFile>>,
    previews_requested: Mutex<Vec<(String, PreviewSpec)>>,
    views_requested: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &str, name: &str, mime_type: &str, content: &[u8]) {
        let metadata = FileMetadata {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size_original: content.len() as u64,
            signature: format!("sig-{id}"),
        };
        self.files.lock().unwrap().insert(
            id.to_string(),
            StoredFile {
                metadata,
                content: Bytes::copy_from_slice(content),
                preview: None,
            },
        );
    }

    pub fn set_preview(&self, id: &str, bytes: &[u8], mime_type: Option<&str>) {
        if let Some(file) = self.files.lock().unwrap().get_mut(id) {
            file.preview = Some(Preview {
                bytes: Bytes::copy_from_slice(bytes),
                mime_type: mime_type.map(str::to_string),
            });
        }
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn content(&self, id: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(id).map(|f| f.content.clone())
    }

    pub fn metadata(&self, id: &str) -> Option<FileMetadata> {
        self.files
            .lock()
            .unwrap()
            .get(id)
            .map(|f| f.metadata.clone())
    }

    pub fn previews_requested(&self) -> Vec<(String, PreviewSpec)> {
        self.previews_requested.lock().unwrap().clone()
    }

    pub fn views_requested(&self) -> Vec<String> {
        self.views_requested.lock().unwrap().clone()
    }

    fn not_found(file_id: &str) -> Error {
        Error::NotFound {
            file_id: file_id.to_string(),
        }
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata> {
        self.metadata(file_id)
            .ok_or_else(|| Self::not_found(file_id))
    }

    async fn get_file_view(&self, file_id: &str) -> Result<Bytes> {
        self.views_requested
            .lock()
            .unwrap()
            .push(file_id.to_string());
        self.content(file_id).ok_or_else(|| Self::not_found(file_id))
    }

    async fn get_file_preview(&self, file_id: &str, spec: PreviewSpec) -> Result<Preview> {
        self.previews_requested
            .lock()
            .unwrap()
            .push((file_id.to_string(), spec));
        let files = self.files.lock().unwrap();
        let file = files.get(file_id).ok_or_else(|| Self::not_found(file_id))?;
        Ok(file.preview.clone().unwrap_or_else(|| Preview {
            bytes: file.content.clone(),
            mime_type: None,
        }))
    }

    async fn create_file(
        &self,
        file_id: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<FileMetadata> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(Error::transport(
                "create_file",
                Some(file_id),
                "HTTP 503: Service Unavailable",
            ));
        }
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        self.insert(file_id, filename, mime.essence_str(), &content);
        self.metadata(file_id)
            .ok_or_else(|| Self::not_found(file_id))
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(file_id))
    }

    async fn list_files(&self) -> Result<FileList> {
        let files: Vec<FileMetadata> = self
            .files
            .lock()
            .unwrap()
            .values()
            .map(|f| f.metadata.clone())
            .collect();
        Ok(FileList {
            total: files.len() as u64,
            files,
        })
    }
}
