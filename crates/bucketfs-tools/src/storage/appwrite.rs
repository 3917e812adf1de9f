use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client, Response, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    storage::{FileList, FileMetadata, Preview, PreviewSpec, StorageGateway},
};

/// Uploads larger than this are sent in `Content-Range` chunks, as the API requires.
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Connection settings for an Appwrite storage bucket.
#[derive(Clone)]
pub struct StorageConfig {
    /// API root, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: Url,
    pub project_id: String,
    pub api_key: String,
    pub bucket_id: String,
    /// Upper bound for every HTTP call, connect to last byte.
    pub request_timeout: Duration,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("project_id", &self.project_id)
            .field("api_key", &"<redacted>")
            .field("bucket_id", &self.bucket_id)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// [`StorageGateway`] backed by the Appwrite storage REST API.
#[derive(Clone)]
pub struct AppwriteGateway {
    client: Client,
    config: StorageConfig,
    chunk_size: usize,
}

impl AppwriteGateway {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let project = HeaderValue::from_str(&config.project_id)
            .map_err(|e| Error::Config(format!("invalid project id: {e}")))?;
        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| Error::Config(format!("invalid api key: {e}")))?;
        key.set_sensitive(true);
        headers.insert("X-Appwrite-Project", project);
        headers.insert("X-Appwrite-Key", key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!("bucketfs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            chunk_size: UPLOAD_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn bucket_id(&self) -> &str {
        &self.config.bucket_id
    }

    /// `{endpoint}/storage/buckets/{bucket}/files/{segments..}`, each segment percent-encoded.
    fn files_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!(
                    "endpoint '{}' cannot be a base",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(["storage", "buckets", self.config.bucket_id.as_str(), "files"])
            .extend(segments);
        Ok(url)
    }

    async fn checked(
        response: reqwest::Result<Response>,
        operation: &str,
        file_id: Option<&str>,
    ) -> Result<Response> {
        let response = response.map_err(|e| Error::transport(operation, file_id, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(file_id) = file_id {
                return Err(Error::NotFound {
                    file_id: file_id.to_string(),
                });
            }
        }

        let message = match response.json::<ApiError>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(Error::transport(
            operation,
            file_id,
            format!("HTTP {}: {message}", status.as_u16()),
        ))
    }

    async fn upload_part(
        &self,
        file_id: &str,
        filename: &str,
        mime_type: &str,
        chunk: Vec<u8>,
        content_range: Option<String>,
    ) -> Result<FileMetadata> {
        let part = Part::bytes(chunk)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| Error::transport("create_file", Some(file_id), e))?;
        let form = Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let mut request = self.client.post(self.files_url(&[])?).multipart(form);
        if let Some(range) = content_range {
            request = request
                .header("Content-Range", range)
                .header("X-Appwrite-ID", file_id);
        }

        let response = Self::checked(request.send().await, "create_file", Some(file_id)).await?;
        response
            .json()
            .await
            .map_err(|e| Error::transport("create_file", Some(file_id), e))
    }
}

#[async_trait]
impl StorageGateway for AppwriteGateway {
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata> {
        let url = self.files_url(&[file_id])?;
        let response =
            Self::checked(self.client.get(url).send().await, "get_file", Some(file_id)).await?;
        response
            .json()
            .await
            .map_err(|e| Error::transport("get_file", Some(file_id), e))
    }

    async fn get_file_view(&self, file_id: &str) -> Result<Bytes> {
        let url = self.files_url(&[file_id, "view"])?;
        let response = Self::checked(
            self.client.get(url).send().await,
            "get_file_view",
            Some(file_id),
        )
        .await?;
        response
            .bytes()
            .await
            .map_err(|e| Error::transport("get_file_view", Some(file_id), e))
    }

    async fn get_file_preview(&self, file_id: &str, spec: PreviewSpec) -> Result<Preview> {
        let mut url = self.files_url(&[file_id, "preview"])?;
        url.query_pairs_mut()
            .append_pair("width", &spec.width.to_string())
            .append_pair("height", &spec.height.to_string())
            .append_pair("quality", &spec.quality.to_string());

        let response = Self::checked(
            self.client.get(url).send().await,
            "get_file_preview",
            Some(file_id),
        )
        .await?;
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport("get_file_preview", Some(file_id), e))?;

        Ok(Preview { bytes, mime_type })
    }

    async fn create_file(
        &self,
        file_id: &str,
        filename: &str,
        content: Bytes,
    ) -> Result<FileMetadata> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let total = content.len();

        if total <= self.chunk_size {
            return self
                .upload_part(file_id, filename, mime.essence_str(), content.to_vec(), None)
                .await;
        }

        let mut metadata = None;
        for (index, chunk) in content.chunks(self.chunk_size).enumerate() {
            let start = index * self.chunk_size;
            let end = start + chunk.len() - 1;
            tracing::debug!(file_id, start, end, total, "Uploading chunk");
            metadata = Some(
                self.upload_part(
                    file_id,
                    filename,
                    mime.essence_str(),
                    chunk.to_vec(),
                    Some(format!("bytes {start}-{end}/{total}")),
                )
                .await?,
            );
        }
        metadata.ok_or_else(|| Error::transport("create_file", Some(file_id), "empty upload"))
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = self.files_url(&[file_id])?;
        Self::checked(
            self.client.delete(url).send().await,
            "delete_file",
            Some(file_id),
        )
        .await?;
        Ok(())
    }

    async fn list_files(&self) -> Result<FileList> {
        let url = self.files_url(&[])?;
        let response = Self::checked(self.client.get(url).send().await, "list_files", None).await?;
        response
            .json()
            .await
            .map_err(|e| Error::transport("list_files", None, e))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path, query_param},
    };

    use super::*;

    const FILES: &str = "/v1/storage/buckets/bkt/files";

    fn gateway(server: &MockServer) -> AppwriteGateway {
        AppwriteGateway::new(StorageConfig {
            endpoint: Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            project_id: "proj".into(),
            api_key: "secret".into(),
            bucket_id: "bkt".into(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn metadata_json(id: &str, name: &str, mime: &str) -> serde_json::Value {
        json!({
            "$id": id,
            "bucketId": "bkt",
            "name": name,
            "signature": "5d41402abc4b2a76b9719d911017c592",
            "mimeType": mime,
            "sizeOriginal": 5,
            "chunksTotal": 1,
            "chunksUploaded": 1
        })
    }

    #[tokio::test]
    async fn get_file_sends_credentials_and_parses_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{FILES}/abc")))
            .and(header("X-Appwrite-Project", "proj"))
            .and(header("X-Appwrite-Key", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(metadata_json("abc", "a.txt", "text/plain")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let metadata = gateway(&server).get_file("abc").await.unwrap();
        assert_eq!(metadata.id, "abc");
        assert_eq!(metadata.name, "a.txt");
        assert_eq!(metadata.mime_type, "text/plain");
        assert_eq!(metadata.size_original, 5);
    }

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{FILES}/gone/view")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "The requested file could not be found.",
                "code": 404,
                "type": "storage_file_not_found"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).get_file_view("gone").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { file_id } if file_id == "gone"));
    }

    #[tokio::test]
    async fn preview_requests_dimensions_and_reports_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{FILES}/img/preview")))
            .and(query_param("width", "512"))
            .and(query_param("height", "0"))
            .and(query_param("quality", "60"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp; charset=binary")
                    .set_body_bytes(b"small".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let preview = gateway(&server)
            .get_file_preview("img", PreviewSpec::READ)
            .await
            .unwrap();
        assert_eq!(preview.bytes.as_ref(), b"small");
        assert_eq!(preview.mime_type.as_deref(), Some("image/webp"));
    }

    #[tokio::test]
    async fn create_file_posts_multipart_with_generated_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(FILES))
            .and(body_string_contains("name=\"fileId\""))
            .and(body_string_contains("new-id"))
            .and(body_string_contains("filename=\"notes.md\""))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(metadata_json("new-id", "notes.md", "text/markdown")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let metadata = gateway(&server)
            .create_file("new-id", "notes.md", Bytes::from_static(b"# hi\n"))
            .await
            .unwrap();
        assert_eq!(metadata.id, "new-id");
    }

    #[tokio::test]
    async fn large_upload_is_sent_in_ranges() {
        let server = MockServer::start().await;
        for range in ["bytes 0-3/10", "bytes 4-7/10", "bytes 8-9/10"] {
            Mock::given(method("POST"))
                .and(path(FILES))
                .and(header("Content-Range", range))
                .respond_with(
                    ResponseTemplate::new(201)
                        .set_body_json(metadata_json("big", "big.bin", "application/octet-stream")),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let metadata = gateway(&server)
            .with_chunk_size(4)
            .create_file("big", "big.bin", Bytes::from_static(b"0123456789"))
            .await
            .unwrap();
        assert_eq!(metadata.id, "big");
    }

    #[tokio::test]
    async fn backend_failure_carries_operation_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILES))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "Server Error",
                "code": 500
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).list_files().await.unwrap_err();
        assert_eq!(err.to_string(), "list_files failed: HTTP 500: Server Error");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILES))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "files": [metadata_json("abc", "a.txt", "text/plain")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{FILES}/abc")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let list = gateway.list_files().await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.files[0].name, "a.txt");
        gateway.delete_file("abc").await.unwrap();
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = StorageConfig {
            endpoint: Url::parse("https://cloud.appwrite.io/v1").unwrap(),
            project_id: "proj".into(),
            api_key: "super-secret".into(),
            bucket_id: "bkt".into(),
            request_timeout: Duration::from_secs(1),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
