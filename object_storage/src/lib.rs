//! Object storage facade
//!
//! Upload, download, delete and presign objects through one client that
//! remembers a default bucket, and sign browser upload policies with the
//! configured credentials.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Storage backend capability and its S3 implementation
pub mod backend;

/// Storage client configuration
pub mod config;

/// Deployment environment
pub mod environment;

/// Error types
pub mod error;

/// Browser upload policies
pub mod policy;

mod client;

pub use backend::{ObjectBackend, S3Backend};
pub use client::{ObjectStorage, DEFAULT_SIGNED_URL_EXPIRY_MINUTES};
pub use config::StorageConfig;
pub use environment::Environment;
pub use error::{BackendError, StorageError, StorageResult};
pub use policy::{ExpiryFormat, SignedPolicy};
