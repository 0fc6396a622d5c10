//! Blob storage for receipt images.
//!
//! [`HttpBlobStore`] talks to a Supabase-compatible storage API:
//!
//! - `POST   {base}/storage/v1/object/{bucket}/{key}` uploads (no upsert)
//! - `DELETE {base}/storage/v1/object/{bucket}/{key}` removes
//! - `{base}/storage/v1/object/public/{bucket}/{key}` is the public URL

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const DEFAULT_BUCKET: &str = "expense-receipts";
const CACHE_CONTROL_SECS: u32 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`. Fails if the key already exists.
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<(), BlobError>;

    /// Publicly readable URL of `key`, if the store exposes one.
    fn public_url(&self, key: &str) -> Option<String>;

    async fn delete_object(&self, key: &str) -> Result<(), BlobError>;
}

#[derive(Clone, Debug)]
pub struct HttpBlobStore {
    http: Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

impl HttpBlobStore {
    pub fn new(http: Client, base_url: String, bucket: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url,
            bucket,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => req.bearer_auth(key).header("apikey", key),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<(), BlobError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => "storage error".to_string(),
        };
        Err(BlobError::Server { status, message })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let req = self
            .http
            .post(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={CACHE_CONTROL_SECS}"),
            )
            .header("x-upsert", "false")
            .body(bytes);
        let resp = self.authorize(req).send().await?;
        Self::check(resp).await
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        let req = self.http.delete(self.object_url(key));
        let resp = self.authorize(req).send().await?;
        Self::check(resp).await
    }
}
