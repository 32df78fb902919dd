//! Storage backend capability used by the facade

mod s3;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::time::Duration;

pub use s3::S3Backend;

use crate::error::BackendResult;

/// Object-storage operations the facade delegates to
///
/// One method per request kind; implementations perform exactly one
/// request per call and never retry on their own.
#[async_trait::async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Deletes `keys` from `bucket` in a single batch request
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<DeleteOutcome>;

    /// Uploads `body` to `bucket/key` in a single request with the given canned ACL
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        acl: &str,
        body: Vec<u8>,
    ) -> BackendResult<UploadOutcome>;

    /// Presigns a GET for `bucket/key` that stays valid for `expires_in`
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BackendResult<String>;

    /// Fetches `bucket/key` with its body fully read
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectPayload>;
}

/// Result of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Keys the service reported as deleted
    pub deleted: Vec<String>,
    /// Per-key failures reported inside an otherwise successful response
    pub errors: Vec<DeleteFailure>,
}

/// A single key the service refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// Object key
    pub key: Option<String>,
    /// Service error code, e.g. `AccessDenied`
    pub code: Option<String>,
    /// Service error message
    pub message: Option<String>,
}

/// Result of a single-part upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Bucket written to
    pub bucket: String,
    /// Key written to
    pub key: String,
    /// Entity tag of the stored object
    pub e_tag: Option<String>,
    /// Version id when bucket versioning is enabled
    pub version_id: Option<String>,
}

/// A downloaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPayload {
    /// Object bytes
    pub body: Vec<u8>,
    /// `Content-Type` stored with the object
    pub content_type: Option<String>,
    /// `Content-Length` reported by the service
    pub content_length: Option<i64>,
    /// Entity tag of the object
    pub e_tag: Option<String>,
}
