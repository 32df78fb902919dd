//! `S3Backend` against LocalStack
//!
//! Run with LocalStack listening on `localhost:4566`:
//! `cargo test -p object_storage --test s3_backend_tests -- --ignored`

mod common;

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use object_storage::{
    environment::LOCALSTACK_ENDPOINT, ObjectStorage, S3Backend, StorageConfig, StorageError,
};
use uuid::Uuid;

const TEST_REGION: &str = "us-east-1";

/// Test context that removes the bucket on drop
struct S3TestContext {
    storage: ObjectStorage,
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl Drop for S3TestContext {
    fn drop(&mut self) {
        let client = self.s3_client.clone();
        let bucket = self.bucket_name.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Ok(listing) = client.list_objects_v2().bucket(&bucket).send().await {
                    for object in listing.contents() {
                        if let Some(key) = object.key() {
                            let _ = client.delete_object().bucket(&bucket).key(key).send().await;
                        }
                    }
                }
                let _ = client.delete_bucket().bucket(&bucket).send().await;
            });
        }
    }
}

async fn setup_test() -> S3TestContext {
    common::setup_test_env();

    let bucket_name = format!("test-object-storage-{}", Uuid::new_v4());

    let credentials = Credentials::from_keys("test", "test", None);
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .force_path_style(true)
        .build();
    let s3_client = Arc::new(S3Client::from_conf(s3_config));

    s3_client
        .create_bucket()
        .bucket(&bucket_name)
        .send()
        .await
        .expect("Failed to create test bucket");

    let storage = ObjectStorage::new(
        StorageConfig::new()
            .with_default_bucket(&bucket_name)
            .with_credentials("test", "test"),
        Arc::new(S3Backend::new(s3_client.clone())),
    );

    S3TestContext {
        storage,
        s3_client,
        bucket_name,
    }
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_upload_download_delete() {
    let context = setup_test().await;

    let uploaded = context
        .storage
        .upload(b"hello localstack".to_vec(), "docs/hello.txt", None, None)
        .await
        .expect("upload failed");
    assert_eq!(uploaded.bucket, context.bucket_name);
    assert!(uploaded.e_tag.is_some());

    let payload = context
        .storage
        .download("docs/hello.txt", None)
        .await
        .expect("download failed");
    assert_eq!(payload.body, b"hello localstack");
    assert_eq!(payload.content_length, Some(16));

    let deleted = context
        .storage
        .delete_object("docs/hello.txt", None)
        .await
        .expect("delete failed");
    assert_eq!(deleted.deleted, vec!["docs/hello.txt".to_string()]);

    let result = context.storage.download("docs/hello.txt", None).await;
    assert!(matches!(result, Err(StorageError::Backend(_))));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_signed_url_fetches_object() {
    let context = setup_test().await;

    context
        .storage
        .upload(b"signed".to_vec(), "processed/kitty.png", None, None)
        .await
        .expect("upload failed");

    let url = context
        .storage
        .get_signed_url("processed/kitty.png", Some(5), None)
        .await
        .expect("presign failed");
    assert!(url.contains("X-Amz-Expires=300"));

    let response = reqwest::get(&url).await.expect("GET failed");
    assert!(response.status().is_success());
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"signed");
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_download_missing_bucket_is_error() {
    let context = setup_test().await;

    let result = context
        .storage
        .download("anything", Some("bucket-that-does-not-exist"))
        .await;

    assert!(matches!(result, Err(StorageError::Backend(_))));
}
