//! Facade configuration: default bucket and policy-signing credentials

use std::{env, fmt};

use crate::policy::ExpiryFormat;

/// Environment variable holding the default bucket name
pub const BUCKET_ENV_VAR: &str = "AWS_BUCKET";
/// Environment variable holding the access key id put into signed policies
pub const ACCESS_KEY_ID_ENV_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret used to sign policies
pub const SECRET_ACCESS_KEY_ENV_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Configuration captured by [`ObjectStorage`](crate::ObjectStorage) at construction
///
/// Nothing in here is read from the environment unless [`StorageConfig::from_env`]
/// or [`StorageConfig::with_env_fallback`] is called explicitly.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Bucket used when an operation gets no bucket override
    pub default_bucket: Option<String>,
    /// Access key id returned alongside signed upload policies
    pub access_key_id: Option<String>,
    /// Secret key used to HMAC-sign upload policies
    pub secret_access_key: Option<String>,
    /// Rendering of the policy expiration timestamp
    pub expiry_format: ExpiryFormat,
}

impl StorageConfig {
    /// Empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every field from `AWS_BUCKET`, `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY`
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_fallback()
    }

    /// Fills fields that are still unset from the environment
    ///
    /// Explicit values always win; empty strings count as unset.
    #[must_use]
    pub fn with_env_fallback(self) -> Self {
        Self {
            default_bucket: non_empty(self.default_bucket).or_else(|| read_env(BUCKET_ENV_VAR)),
            access_key_id: non_empty(self.access_key_id)
                .or_else(|| read_env(ACCESS_KEY_ID_ENV_VAR)),
            secret_access_key: non_empty(self.secret_access_key)
                .or_else(|| read_env(SECRET_ACCESS_KEY_ENV_VAR)),
            expiry_format: self.expiry_format,
        }
    }

    /// Sets the default bucket
    #[must_use]
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    /// Sets the signing credentials
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets the policy expiration format
    #[must_use]
    pub fn with_expiry_format(mut self, expiry_format: ExpiryFormat) -> Self {
        self.expiry_format = expiry_format;
        self
    }

    /// Resolves the bucket for a single call: override, then default
    ///
    /// Empty strings are ignored on both sides.
    #[must_use]
    pub fn resolve_bucket<'a>(&'a self, bucket: Option<&'a str>) -> Option<&'a str> {
        bucket
            .filter(|b| !b.is_empty())
            .or_else(|| self.default_bucket.as_deref().filter(|b| !b.is_empty()))
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("default_bucket", &self.default_bucket)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry_format", &self.expiry_format)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn read_env(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}
