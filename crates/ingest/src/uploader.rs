//! Receipt uploader: validates an image and stores it under a fresh key.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use uuid::Uuid;

use crate::storage::BlobStore;

/// 5 MiB.
pub const MAX_RECEIPT_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported receipt type {0:?}, expected JPEG, PNG, GIF or WebP")]
    UnsupportedType(String),
    #[error("receipt is {size} bytes, the limit is {max}")]
    TooLarge { size: u64, max: u64 },
    #[error("storage failed: {0}")]
    Upstream(String),
    #[error("storage returned no public url")]
    MissingUrl,
}

/// A receipt stored by [`ReceiptUploader::upload`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredReceipt {
    pub key: String,
    pub url: String,
}

#[derive(Clone)]
pub struct ReceiptUploader {
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

/// Returns the file extension for an accepted MIME type.
pub fn validate(mime_type: &str, size_bytes: u64) -> Result<&'static str, UploadError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    let Some((_, ext)) = ALLOWED_TYPES.iter().find(|(mime, _)| *mime == normalized) else {
        return Err(UploadError::UnsupportedType(mime_type.to_string()));
    };
    if size_bytes > MAX_RECEIPT_BYTES {
        return Err(UploadError::TooLarge {
            size: size_bytes,
            max: MAX_RECEIPT_BYTES,
        });
    }
    Ok(*ext)
}

impl ReceiptUploader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates and stores a receipt image under `receipts/{uuid}.{ext}`.
    ///
    /// Nothing is sent to the store when validation fails.
    pub async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<StoredReceipt, UploadError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let ext = validate(mime_type, size)?;
        let key = format!("receipts/{}.{ext}", Uuid::new_v4());
        let content_type = mime_type.trim().to_ascii_lowercase();

        tokio::time::timeout(self.timeout, self.store.put_object(&key, bytes, &content_type))
            .await
            .map_err(|_| {
                UploadError::Upstream(format!(
                    "no reply within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| UploadError::Upstream(err.to_string()))?;

        let Some(url) = self
            .store
            .public_url(&key)
            .filter(|url| !url.trim().is_empty())
        else {
            if let Err(err) = self.store.delete_object(&key).await {
                tracing::warn!(key = %key, "could not remove unreachable receipt: {err}");
            }
            return Err(UploadError::MissingUrl);
        };

        tracing::debug!(key = %key, size, "receipt stored");
        Ok(StoredReceipt { key, url })
    }

    /// Removes a receipt stored by [`upload`](Self::upload).
    pub async fn discard(&self, receipt: &StoredReceipt) -> Result<(), UploadError> {
        tokio::time::timeout(self.timeout, self.store.delete_object(&receipt.key))
            .await
            .map_err(|_| UploadError::Upstream("delete timed out".to_string()))?
            .map_err(|err| UploadError::Upstream(err.to_string()))
    }
}
