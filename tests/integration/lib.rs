//! Shared support for the keyjar integration tests.

use std::sync::Arc;

use base64::Engine;
use keyjar::{BackendSelector, Job, JobOutcome, MemoryBackend};
use keyjar_core::env::vars;
use rand::RngCore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Capacity shared by the size-boundary tests. Matches the Windows
/// Credential Manager adapter: nineteen 945-byte segments.
pub const CAPACITY: usize = 19 * 945;

/// Install a test-friendly subscriber once; `KEYJAR_LOG` sets the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(vars::KEYJAR_LOG)
                .unwrap_or_else(|_| "keyjar=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// A fresh selector over an unlimited memory store.
pub fn memory_selector() -> BackendSelector {
    init_tracing();
    BackendSelector::with_backend(Arc::new(MemoryBackend::new()))
}

/// A fresh selector over a memory store capped at [`CAPACITY`].
pub fn capped_selector() -> BackendSelector {
    init_tracing();
    BackendSelector::with_backend(Arc::new(MemoryBackend::with_max_payload_len(CAPACITY)))
}

/// Random URL-safe text of exactly `size` bytes.
pub fn random_password(size: usize) -> Vec<u8> {
    let mut raw = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut raw);
    let mut encoded = base64::engine::general_purpose::URL_SAFE.encode(raw).into_bytes();
    encoded.truncate(size);
    encoded
}

pub async fn write(selector: &BackendSelector, service: &str, key: &str, data: &[u8]) -> Arc<JobOutcome> {
    let mut job = Job::write(selector, service);
    job.set_key(key);
    job.set_binary_data(data);
    job.start().finished().await
}

pub async fn read(selector: &BackendSelector, service: &str, key: &str) -> Arc<JobOutcome> {
    let mut job = Job::read(selector, service);
    job.set_key(key);
    job.start().finished().await
}

pub async fn delete(selector: &BackendSelector, service: &str, key: &str) -> Arc<JobOutcome> {
    let mut job = Job::delete(selector, service);
    job.set_key(key);
    job.start().finished().await
}
