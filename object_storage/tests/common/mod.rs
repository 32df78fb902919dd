// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::sync::Arc;

use object_storage::{backend::mock::MockBackend, Environment, ObjectStorage, StorageConfig};
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_BUCKET: &str = "default-bucket";
pub const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
pub const SECRET_ACCESS_KEY: &str = "test-secret";

/// Load test environment variables and initialise tracing once
pub fn setup_test_env() {
    dotenvy::from_path(".env.example").ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(Environment::from_env().tracing_level().as_str().to_lowercase())
        }))
        .with_test_writer()
        .try_init()
        .ok();
}

/// Facade over a fresh mock backend
pub struct TestContext {
    pub storage: ObjectStorage,
    pub backend: Arc<MockBackend>,
}

impl TestContext {
    /// Context with default bucket and signing credentials configured
    pub fn new() -> Self {
        Self::with_config(
            StorageConfig::new()
                .with_default_bucket(DEFAULT_BUCKET)
                .with_credentials(ACCESS_KEY_ID, SECRET_ACCESS_KEY),
        )
    }

    pub fn with_config(config: StorageConfig) -> Self {
        Self::with_backend(config, MockBackend::new())
    }

    pub fn with_backend(config: StorageConfig, backend: MockBackend) -> Self {
        setup_test_env();
        let backend = Arc::new(backend);
        let storage = ObjectStorage::new(config, backend.clone());
        Self { storage, backend }
    }
}
