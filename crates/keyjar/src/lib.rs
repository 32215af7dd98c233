//! # keyjar
//!
//! Asynchronous jobs for storing, retrieving and deleting secrets in the
//! operating system's credential store.
//!
//! Secrets are addressed by `(service, key)`. Each operation is a [`Job`]
//! bound to a [`BackendSelector`]; starting it returns a [`JobHandle`] whose
//! [`JobHandle::finished`] future yields the [`JobOutcome`]: an [`ErrorKind`],
//! a message, and for reads the stored bytes.
//!
//! ```no_run
//! use keyjar::{BackendSelector, ErrorKind, Job};
//!
//! # async fn demo() {
//! let selector = BackendSelector::platform();
//!
//! let mut write = Job::write(&selector, "my-app");
//! write.set_key("alice");
//! write.set_text_data("correct horse battery staple");
//! assert_eq!(write.start().finished().await.error(), ErrorKind::NoError);
//!
//! let mut read = Job::read(&selector, "my-app");
//! read.set_key("alice");
//! let outcome = read.start().finished().await;
//! println!("{:?}", outcome.text_data());
//! # }
//! ```

pub mod job;
pub mod selector;

pub use job::{Job, JobHandle, JobKind, JobOutcome, JobState, Operation};
pub use selector::{BackendSelector, SelectorState};

// Re-exports for convenience
pub use keyjar_backends::MemoryBackend;
pub use keyjar_core::{
    Backend, BackendPreference, ErrorKind, Identity, KeychainConfig, KeychainError, SecretBytes,
};
