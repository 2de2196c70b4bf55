//! Upload coordinator: pushes the token image and its metadata document to
//! object storage through pre-signed URLs.
//!
//! The signing service hands out one write URL per file name. The bytes are
//! PUT to that URL and the public URL is the signed URL minus its query
//! string.

use crate::types::{ImageFile, TokenMetadataDocument, UploadedAsset};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const METADATA_CONTENT_TYPE: &str = "application/json";

/// External service issuing pre-signed write URLs.
#[async_trait]
pub trait UploadUrlSigner: Send + Sync {
    /// Request a write URL for an object named `file_name`.
    async fn request_upload_url(&self, file_name: &str) -> Result<String>;
}

/// Object storage reachable through pre-signed URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, signed_url: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedUrlRequest<'a> {
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    success: Option<SignedUrl>,
    failure: Option<String>,
}

/// Signing service reached over HTTP.
pub struct HttpUploadSigner {
    http_client: Client,
    endpoint: String,
}

impl HttpUploadSigner {
    pub fn new(http_client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl UploadUrlSigner for HttpUploadSigner {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn request_upload_url(&self, file_name: &str) -> Result<String> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&SignedUrlRequest { file_name })
            .send()
            .await
            .context("Failed to reach upload signer")?;

        if !response.status().is_success() {
            return Err(anyhow!("Upload signer returned {}", response.status()));
        }

        let body: SignedUrlResponse = response
            .json()
            .await
            .context("Failed to parse upload signer response")?;

        match (body.success, body.failure) {
            (Some(signed), _) => Ok(signed.url),
            (None, Some(failure)) => Err(anyhow!("Upload signer refused: {}", failure)),
            (None, None) => Err(anyhow!("Upload signer returned no URL")),
        }
    }
}

/// Object store reached with plain HTTP PUTs.
pub struct HttpObjectStore {
    http_client: Client,
}

impl HttpObjectStore {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip(self, signed_url, bytes), fields(len = bytes.len()))]
    async fn put(&self, signed_url: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .http_client
            .put(signed_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to PUT object")?;

        if !response.status().is_success() {
            return Err(anyhow!("Object store returned {}", response.status()));
        }
        Ok(())
    }
}

/// Public URL of an object given its pre-signed write URL.
pub fn public_url(signed_url: &str) -> &str {
    signed_url
        .split_once('?')
        .map_or(signed_url, |(base, _)| base)
}

/// Coordinates the signer and the store for one launch.
#[derive(Clone)]
pub struct UploadCoordinator {
    signer: Arc<dyn UploadUrlSigner>,
    store: Arc<dyn ObjectStore>,
}

impl UploadCoordinator {
    pub fn new(signer: Arc<dyn UploadUrlSigner>, store: Arc<dyn ObjectStore>) -> Self {
        Self { signer, store }
    }

    /// HTTP signer and store sharing one client.
    pub fn over_http(http_client: Client, signer_endpoint: impl Into<String>) -> Self {
        Self::new(
            Arc::new(HttpUploadSigner::new(http_client.clone(), signer_endpoint)),
            Arc::new(HttpObjectStore::new(http_client)),
        )
    }

    /// Upload raw bytes under `asset_name` and return where they can be read.
    #[instrument(skip(self, bytes), fields(asset = %asset_name, content_type = %content_type))]
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        asset_name: &str,
        content_type: &str,
    ) -> Result<UploadedAsset> {
        let signed_url = self
            .signer
            .request_upload_url(asset_name)
            .await
            .with_context(|| format!("Failed to obtain upload URL for {}", asset_name))?;

        self.store
            .put(&signed_url, bytes, content_type)
            .await
            .with_context(|| format!("Failed to upload {}", asset_name))?;

        let asset = UploadedAsset {
            public_url: public_url(&signed_url).to_string(),
        };
        debug!("Uploaded {} to {}", asset_name, asset.public_url);
        Ok(asset)
    }

    pub async fn upload_image(&self, image: &ImageFile) -> Result<UploadedAsset> {
        let asset = self
            .upload(image.bytes.clone(), &image.file_name, &image.content_type)
            .await?;
        info!("Token image available at {}", asset.public_url);
        Ok(asset)
    }

    /// Upload the `{name, symbol, description, image}` document.
    pub async fn upload_metadata(&self, document: &TokenMetadataDocument) -> Result<UploadedAsset> {
        let bytes = serde_json::to_vec(document).context("Failed to encode metadata document")?;
        let asset = self
            .upload(bytes, METADATA_FILE_NAME, METADATA_CONTENT_TYPE)
            .await?;
        info!("Token metadata available at {}", asset.public_url);
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launchpad::simulated::InMemoryUploads;

    #[test]
    fn test_public_url_strips_query() {
        assert_eq!(
            public_url("https://bucket.s3.amazonaws.com/logo.png?X-Amz-Signature=abc&X-Amz-Expires=60"),
            "https://bucket.s3.amazonaws.com/logo.png"
        );
        assert_eq!(
            public_url("https://bucket.s3.amazonaws.com/logo.png"),
            "https://bucket.s3.amazonaws.com/logo.png"
        );
    }

    #[tokio::test]
    async fn test_upload_puts_bytes_with_content_type() {
        let uploads = Arc::new(InMemoryUploads::new("https://assets.example.com"));
        let coordinator = UploadCoordinator::new(uploads.clone(), uploads.clone());

        let image = ImageFile {
            file_name: "logo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        let asset = coordinator.upload_image(&image).await.unwrap();

        assert!(asset.public_url.starts_with("https://assets.example.com/"));
        assert!(asset.public_url.ends_with("logo.png"));
        assert!(!asset.public_url.contains('?'));

        let stored = uploads.object(&asset.public_url).await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.bytes, image.bytes);
    }

    #[tokio::test]
    async fn test_metadata_document_is_json() {
        let uploads = Arc::new(InMemoryUploads::new("https://assets.example.com"));
        let coordinator = UploadCoordinator::new(uploads.clone(), uploads.clone());

        let document = TokenMetadataDocument {
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            description: "Launch test".to_string(),
            image: "https://assets.example.com/logo.png".to_string(),
        };
        let asset = coordinator.upload_metadata(&document).await.unwrap();
        assert!(asset.public_url.ends_with(METADATA_FILE_NAME));

        let stored = uploads.object(&asset.public_url).await.unwrap();
        assert_eq!(stored.content_type, METADATA_CONTENT_TYPE);
        let decoded: TokenMetadataDocument = serde_json::from_slice(&stored.bytes).unwrap();
        assert_eq!(decoded, document);
    }

    #[tokio::test]
    async fn test_signer_failure_aborts_before_put() {
        let uploads = Arc::new(InMemoryUploads::new("https://assets.example.com"));
        uploads.fail_signing("signer offline").await;
        let coordinator = UploadCoordinator::new(uploads.clone(), uploads.clone());

        let err = coordinator
            .upload(vec![1, 2, 3], "logo.png", "image/png")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("signer offline"));
        assert_eq!(uploads.put_count().await, 0);
    }

    #[test]
    fn test_signer_response_shapes() {
        let ok: SignedUrlResponse =
            serde_json::from_str(r#"{"success":{"url":"https://b/x.png?sig=1"}}"#).unwrap();
        assert_eq!(ok.success.unwrap().url, "https://b/x.png?sig=1");

        let refused: SignedUrlResponse = serde_json::from_str(r#"{"failure":"Not authenticated"}"#).unwrap();
        assert!(refused.success.is_none());
        assert_eq!(refused.failure.as_deref(), Some("Not authenticated"));
    }
}
