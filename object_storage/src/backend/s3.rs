//! `aws-sdk-s3` implementation of [`ObjectBackend`]

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::{
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{Delete, ObjectCannedAcl, ObjectIdentifier},
    Client as S3Client,
};
use tracing::debug;

use super::{DeleteFailure, DeleteOutcome, ObjectBackend, ObjectPayload, UploadOutcome};
use crate::{
    environment::Environment,
    error::{BackendError, BackendResult},
};

/// S3 backend over a shared SDK client
#[derive(Clone)]
pub struct S3Backend {
    s3_client: Arc<S3Client>,
}

impl S3Backend {
    /// Wraps a pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }

    /// Builds an S3 client from the environment's SDK configuration
    pub async fn from_environment(environment: &Environment) -> Self {
        let config = environment.s3_client_config().await;
        Self::new(Arc::new(S3Client::from_conf(config)))
    }
}

#[async_trait::async_trait]
impl ObjectBackend for S3Backend {
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<DeleteOutcome> {
        debug!("Deleting {} object(s) from bucket: {}", keys.len(), bucket);

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder().set_objects(Some(objects)).build()?;

        let output = self
            .s3_client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await?;

        Ok(DeleteOutcome {
            deleted: output
                .deleted()
                .iter()
                .filter_map(|object| object.key().map(ToString::to_string))
                .collect(),
            errors: output
                .errors()
                .iter()
                .map(|err| DeleteFailure {
                    key: err.key().map(ToString::to_string),
                    code: err.code().map(ToString::to_string),
                    message: err.message().map(ToString::to_string),
                })
                .collect(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        acl: &str,
        body: Vec<u8>,
    ) -> BackendResult<UploadOutcome> {
        debug!(
            "Uploading {} bytes to {}/{} with acl {}",
            body.len(),
            bucket,
            key,
            acl
        );

        let output = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl))
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(UploadOutcome {
            bucket: bucket.to_string(),
            key: key.to_string(),
            e_tag: output.e_tag().map(ToString::to_string),
            version_id: output.version_id().map(ToString::to_string),
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BackendResult<String> {
        debug!(
            "Presigning GET for {}/{} valid for {}s",
            bucket,
            key,
            expires_in.as_secs()
        );

        let presigned_config = PresigningConfig::expires_in(expires_in)?;

        let presigned = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigned_config)
            .await
            .map_err(BackendError::Presign)?;

        Ok(presigned.uri().to_string())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectPayload> {
        debug!("Getting object {}/{}", bucket, key);

        let output = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(BackendError::GetObject)?;

        let content_type = output.content_type().map(ToString::to_string);
        let content_length = output.content_length();
        let e_tag = output.e_tag().map(ToString::to_string);
        let body = output.body.collect().await?.into_bytes().to_vec();

        Ok(ObjectPayload {
            body,
            content_type,
            content_length,
            e_tag,
        })
    }
}
