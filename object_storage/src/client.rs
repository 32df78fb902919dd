//! Storage facade: bucket defaulting over an [`ObjectBackend`]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::{
    backend::{DeleteOutcome, ObjectBackend, ObjectPayload, UploadOutcome},
    config::StorageConfig,
    error::{StorageError, StorageResult},
    policy::{self, PolicyDocument, SignedPolicy, DEFAULT_ACL},
};

/// Validity of a signed download URL when the caller gives none
pub const DEFAULT_SIGNED_URL_EXPIRY_MINUTES: u64 = 20;

/// Object storage client
///
/// Holds an immutable [`StorageConfig`] and a shared backend. Every
/// operation takes an optional bucket that overrides the configured
/// default for that call only.
#[derive(Clone)]
pub struct ObjectStorage {
    config: StorageConfig,
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectStorage {
    /// Creates a new storage client
    ///
    /// # Arguments
    ///
    /// * `config` - Default bucket and signing credentials
    /// * `backend` - Backend every request is delegated to
    #[must_use]
    pub fn new(config: StorageConfig, backend: Arc<dyn ObjectBackend>) -> Self {
        Self { config, backend }
    }

    /// Creates a storage client configured from `AWS_BUCKET`,
    /// `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
    #[must_use]
    pub fn from_env(backend: Arc<dyn ObjectBackend>) -> Self {
        Self::new(StorageConfig::from_env(), backend)
    }

    /// Configuration captured at construction
    #[must_use]
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Bucket used when a call passes none
    #[must_use]
    pub fn default_bucket(&self) -> Option<&str> {
        self.config.default_bucket.as_deref()
    }

    fn bucket<'a>(&'a self, bucket: Option<&'a str>) -> StorageResult<&'a str> {
        self.config
            .resolve_bucket(bucket)
            .ok_or(StorageError::MissingBucket)
    }

    fn secret(&self) -> StorageResult<&str> {
        self.config
            .secret_access_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(StorageError::MissingCredential("secret access key"))
    }

    /// Expiration timestamp for a policy issued now
    #[must_use]
    pub fn compute_expiry(&self) -> String {
        policy::expiry_at(Utc::now(), self.config.expiry_format)
    }

    /// Signs a browser upload policy
    ///
    /// # Arguments
    ///
    /// * `content_type` - Required `Content-Type` prefix, defaults to any
    /// * `acl` - Canned ACL for the uploaded object, defaults to `private`
    /// * `bucket` - Bucket override
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingBucket` if no bucket is known
    /// Returns `StorageError::MissingCredential` if no secret key is configured
    #[allow(clippy::unused_async)]
    pub async fn create_upload_policy(
        &self,
        content_type: Option<&str>,
        acl: Option<&str>,
        bucket: Option<&str>,
    ) -> StorageResult<SignedPolicy> {
        self.upload_policy_at(Utc::now(), content_type, acl, bucket)
    }

    /// [`create_upload_policy`](Self::create_upload_policy) with an explicit clock
    ///
    /// # Errors
    ///
    /// Same as [`create_upload_policy`](Self::create_upload_policy)
    pub fn upload_policy_at(
        &self,
        now: DateTime<Utc>,
        content_type: Option<&str>,
        acl: Option<&str>,
        bucket: Option<&str>,
    ) -> StorageResult<SignedPolicy> {
        let bucket = self.bucket(bucket)?;
        let acl = acl.filter(|a| !a.is_empty()).unwrap_or(DEFAULT_ACL);
        let content_type = content_type.unwrap_or_default();

        let secret = self.secret()?;

        let document = PolicyDocument::new(
            policy::expiry_at(now, self.config.expiry_format),
            bucket,
            acl,
            content_type,
        );
        let encoded = document.encode()?;
        let signature = policy::sign_policy(&encoded, secret)?;

        debug!(
            "Signed upload policy for bucket: {} expiring at: {}",
            bucket, document.expiration
        );

        Ok(SignedPolicy {
            policy: encoded,
            signature,
            access_key_id: self.config.access_key_id.clone(),
        })
    }

    /// Checks that `signature` was produced by the configured secret over `encoded_policy`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingCredential` if no secret key is configured
    pub fn verify_upload_policy(
        &self,
        encoded_policy: &str,
        signature: &str,
    ) -> StorageResult<bool> {
        policy::verify_policy_signature(encoded_policy, signature, self.secret()?)
    }

    /// Deletes a single object
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidArgument` if `key` is empty, before any request
    /// Returns `StorageError::MissingBucket` if no bucket is known
    /// Returns `StorageError::Backend` with the backend's error if the request fails
    pub async fn delete_object(
        &self,
        key: &str,
        bucket: Option<&str>,
    ) -> StorageResult<DeleteOutcome> {
        if key.is_empty() {
            return Err(StorageError::InvalidArgument("no key given".to_string()));
        }
        let bucket = self.bucket(bucket)?;

        self.backend
            .delete_objects(bucket, &[key.to_string()])
            .await
            .map_err(|e| {
                error!("Failed to delete {}/{}: {}", bucket, key, e);
                e.into()
            })
    }

    /// Uploads `body` to `key` in a single request
    ///
    /// # Arguments
    ///
    /// * `body` - Object bytes
    /// * `key` - Destination key
    /// * `bucket` - Bucket override
    /// * `acl` - Canned ACL, defaults to `private`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidArgument` if `key` is empty
    /// Returns `StorageError::MissingBucket` if no bucket is known
    /// Returns `StorageError::Backend` with the backend's error if the request fails
    pub async fn upload(
        &self,
        body: impl Into<Vec<u8>> + Send,
        key: &str,
        bucket: Option<&str>,
        acl: Option<&str>,
    ) -> StorageResult<UploadOutcome> {
        if key.is_empty() {
            return Err(StorageError::InvalidArgument("no key given".to_string()));
        }
        let bucket = self.bucket(bucket)?;
        let acl = acl.filter(|a| !a.is_empty()).unwrap_or(DEFAULT_ACL);

        self.backend
            .put_object(bucket, key, acl, body.into())
            .await
            .map_err(|e| {
                error!("Failed to upload {}/{}: {}", bucket, key, e);
                e.into()
            })
    }

    /// Presigned GET URL for `key`
    ///
    /// `expiration_minutes` of `None` or `0` means
    /// [`DEFAULT_SIGNED_URL_EXPIRY_MINUTES`]. The key is not validated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingBucket` if no bucket is known
    /// Returns `StorageError::Backend` if the backend cannot presign the request
    pub async fn get_signed_url(
        &self,
        key: &str,
        expiration_minutes: Option<u64>,
        bucket: Option<&str>,
    ) -> StorageResult<String> {
        let bucket = self.bucket(bucket)?;
        let minutes = expiration_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_MINUTES);
        let expires_in = Duration::from_secs(minutes.saturating_mul(60));

        Ok(self.backend.presign_get(bucket, key, expires_in).await?)
    }

    /// Downloads `key` with its body fully read
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingBucket` if no bucket is known
    /// Returns `StorageError::Backend` with the backend's error if the request fails
    pub async fn download(&self, key: &str, bucket: Option<&str>) -> StorageResult<ObjectPayload> {
        let bucket = self.bucket(bucket)?;

        self.backend.get_object(bucket, key).await.map_err(|e| {
            error!("Failed to download {}/{}: {}", bucket, key, e);
            e.into()
        })
    }
}
