//! In-memory backend that records every call, for tests

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{DeleteFailure, DeleteOutcome, ObjectBackend, ObjectPayload, UploadOutcome};
use crate::error::{BackendError, BackendResult};

/// A request the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `delete_objects`
    DeleteObjects {
        /// Bucket
        bucket: String,
        /// Keys in the batch
        keys: Vec<String>,
    },
    /// `put_object`
    PutObject {
        /// Bucket
        bucket: String,
        /// Key
        key: String,
        /// Canned ACL
        acl: String,
        /// Body length in bytes
        len: usize,
    },
    /// `presign_get`
    PresignGet {
        /// Bucket
        bucket: String,
        /// Key
        key: String,
        /// Requested validity in seconds
        expires_in_secs: u64,
    },
    /// `get_object`
    GetObject {
        /// Bucket
        bucket: String,
        /// Key
        key: String,
    },
}

/// Recording backend with an in-memory object map
///
/// Uploaded objects can be downloaded and deleted again. When built with
/// [`MockBackend::failing`] every call is recorded and then fails. Keys added
/// with [`MockBackend::with_rejected_key`] come back as per-key errors from a
/// batch delete that otherwise succeeds.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failure: Option<String>,
    rejected_keys: HashSet<String>,
}

impl MockBackend {
    /// Backend that accepts every call
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose every call fails with `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Makes batch deletes refuse `key` with an `AccessDenied` error
    ///
    /// The object is kept and the delete call itself still succeeds.
    #[must_use]
    pub fn with_rejected_key(mut self, key: impl Into<String>) -> Self {
        self.rejected_keys.insert(key.into());
        self
    }

    /// Stores an object directly, without recording a call
    pub fn insert_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Whether `bucket/key` is currently stored
    #[must_use]
    pub fn contains_object(&self, bucket: &str, key: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Every call received so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: BackendCall) -> BackendResult<()> {
        lock(&self.calls).push(call);
        match &self.failure {
            Some(message) => Err(BackendError::Other(message.clone().into())),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait::async_trait]
impl ObjectBackend for MockBackend {
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<DeleteOutcome> {
        self.record(BackendCall::DeleteObjects {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        })?;

        let mut objects = lock(&self.objects);
        let mut outcome = DeleteOutcome::default();
        for key in keys {
            if self.rejected_keys.contains(key) {
                outcome.errors.push(DeleteFailure {
                    key: Some(key.clone()),
                    code: Some("AccessDenied".to_string()),
                    message: Some("Access Denied".to_string()),
                });
            } else if objects.remove(&(bucket.to_string(), key.clone())).is_some() {
                outcome.deleted.push(key.clone());
            }
        }

        Ok(outcome)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        acl: &str,
        body: Vec<u8>,
    ) -> BackendResult<UploadOutcome> {
        self.record(BackendCall::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            acl: acl.to_string(),
            len: body.len(),
        })?;

        let e_tag = format!("\"{:016x}\"", body.len());
        self.insert_object(bucket, key, body);

        Ok(UploadOutcome {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: Some(e_tag),
            version_id: None,
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BackendResult<String> {
        self.record(BackendCall::PresignGet {
            bucket: bucket.to_string(),
            key: key.to_string(),
            expires_in_secs: expires_in.as_secs(),
        })?;

        Ok(format!(
            "https://{bucket}.s3.mock.local/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectPayload> {
        self.record(BackendCall::GetObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;

        let body = lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BackendError::Other(format!("NoSuchKey: {bucket}/{key}").into()))?;

        Ok(ObjectPayload {
            content_length: i64::try_from(body.len()).ok(),
            body,
            content_type: None,
            e_tag: None,
        })
    }
}
