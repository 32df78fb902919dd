//! Error types for object storage operations

use aws_sdk_s3::{
    error::{BuildError, SdkError},
    operation::{
        delete_objects::DeleteObjectsError, get_object::GetObjectError,
        put_object::PutObjectError,
    },
    presigning::PresigningConfigError,
    primitives::ByteStreamError,
};
use thiserror::Error;

/// Result type for facade operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors returned by the storage facade
#[derive(Error, Debug)]
pub enum StorageError {
    /// A required argument was missing or empty; the backend was not contacted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No bucket was passed and no default bucket is configured
    #[error("No bucket given and no default bucket configured")]
    MissingBucket,

    /// A credential needed for signing is not configured
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The HMAC could not be initialised with the configured key
    #[error("Failed to sign upload policy: {0}")]
    Signing(String),

    /// The upload policy could not be serialized
    #[error("Failed to serialize upload policy: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend rejected the request
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised by an [`ObjectBackend`](crate::backend::ObjectBackend)
#[derive(Error, Debug)]
pub enum BackendError {
    /// Batch delete failed
    #[error("Failed to delete objects from S3: {0}")]
    DeleteObjects(#[from] SdkError<DeleteObjectsError>),

    /// Single-part upload failed
    #[error("Failed to upload object to S3: {0}")]
    PutObject(#[from] SdkError<PutObjectError>),

    /// Object retrieval failed
    #[error("Failed to get object from S3: {0}")]
    GetObject(SdkError<GetObjectError>),

    /// Presigned URL generation failed
    #[error("Failed to generate presigned URL: {0}")]
    Presign(SdkError<GetObjectError>),

    /// Presigning config was rejected (e.g. expiry longer than one week)
    #[error("Invalid presigning config: {0}")]
    PresignConfig(#[from] PresigningConfigError),

    /// The object body could not be read to the end
    #[error("Failed to read object body: {0}")]
    ReadBody(#[from] ByteStreamError),

    /// A request input could not be built
    #[error("Failed to build S3 request: {0}")]
    Build(#[from] BuildError),

    /// Error from a non-S3 backend
    #[error("Backend error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}
