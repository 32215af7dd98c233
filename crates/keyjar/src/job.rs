//! Asynchronous write, read and delete jobs.
//!
//! A [`Job`] is configured, then consumed by [`Job::start`], which spawns it
//! on the Tokio runtime and returns a [`JobHandle`]. Because `start` takes the
//! job by value, a job can only ever be started once.
//!
//! Lifecycle:
//!
//! - **Created**: a `Job` value; identity, payload and callback may be set.
//! - **Running**: the handle reports [`JobState::Running`].
//! - **Completed**: the [`JobOutcome`] is published once and never changes.
//!   The `on_finished` callback then runs exactly once, and every
//!   [`JobHandle::finished`] caller observes the same outcome.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use keyjar_core::{Backend, ErrorKind, Identity, KeychainError, Result, SecretBytes};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::selector::BackendSelector;

/// The three job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Write,
    Read,
    Delete,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Write => "write",
            JobKind::Read => "read",
            JobKind::Delete => "delete",
        })
    }
}

/// What a job does, with the data specific to its kind.
#[derive(Debug, Clone)]
pub enum Operation {
    Write { payload: SecretBytes },
    Read,
    Delete,
}

impl Operation {
    pub fn kind(&self) -> JobKind {
        match self {
            Operation::Write { .. } => JobKind::Write,
            Operation::Read => JobKind::Read,
            Operation::Delete => JobKind::Delete,
        }
    }
}

/// State of a started job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
}

/// The immutable result of a completed job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    kind: JobKind,
    identity: Identity,
    error: ErrorKind,
    message: String,
    payload: Option<SecretBytes>,
}

impl JobOutcome {
    fn success(kind: JobKind, identity: Identity, payload: Option<SecretBytes>) -> Self {
        Self {
            kind,
            identity,
            error: ErrorKind::NoError,
            message: String::new(),
            payload,
        }
    }

    fn failure(kind: JobKind, identity: Identity, err: &KeychainError) -> Self {
        Self {
            kind,
            identity,
            error: err.kind(),
            message: err.to_string(),
            payload: None,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn error(&self) -> ErrorKind {
        self.error
    }

    /// Human-readable detail; empty on success.
    pub fn error_string(&self) -> &str {
        &self.message
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }

    /// The retrieved value. Only a successful read carries one.
    pub fn binary_data(&self) -> Option<&[u8]> {
        self.payload.as_ref().map(SecretBytes::expose)
    }

    /// The retrieved value as text, if it is valid UTF-8.
    pub fn text_data(&self) -> Option<String> {
        self.payload.as_ref().and_then(SecretBytes::to_text)
    }
}

type FinishedCallback = Box<dyn FnOnce(&JobOutcome) + Send + 'static>;

/// A single-use secret-store operation.
pub struct Job {
    selector: BackendSelector,
    identity: Identity,
    operation: Operation,
    on_finished: Option<FinishedCallback>,
}

impl Job {
    fn new(selector: &BackendSelector, service: impl Into<String>, operation: Operation) -> Self {
        Self {
            selector: selector.clone(),
            identity: Identity::new(service, ""),
            operation,
            on_finished: None,
        }
    }

    /// A job storing a value under `(service, key)`.
    pub fn write(selector: &BackendSelector, service: impl Into<String>) -> Self {
        Self::new(
            selector,
            service,
            Operation::Write {
                payload: SecretBytes::default(),
            },
        )
    }

    /// A job retrieving the value stored under `(service, key)`.
    pub fn read(selector: &BackendSelector, service: impl Into<String>) -> Self {
        Self::new(selector, service, Operation::Read)
    }

    /// A job removing the value stored under `(service, key)`.
    pub fn delete(selector: &BackendSelector, service: impl Into<String>) -> Self {
        Self::new(selector, service, Operation::Delete)
    }

    pub fn kind(&self) -> JobKind {
        self.operation.kind()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn service(&self) -> &str {
        self.identity.service()
    }

    pub fn key(&self) -> &str {
        self.identity.key()
    }

    /// Set the account name within the service.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.identity.set_key(key);
    }

    /// Set the value a write job stores. Ignored for other kinds.
    pub fn set_binary_data(&mut self, data: impl Into<Vec<u8>>) {
        match &mut self.operation {
            Operation::Write { payload } => *payload = SecretBytes::new(data),
            other => debug!(kind = %other.kind(), "payload ignored: not a write job"),
        }
    }

    /// Set the value a write job stores, as UTF-8 text.
    pub fn set_text_data(&mut self, text: &str) {
        self.set_binary_data(text.as_bytes());
    }

    /// Register a callback run exactly once, after the job has completed.
    pub fn on_finished<F>(&mut self, callback: F)
    where
        F: FnOnce(&JobOutcome) + Send + 'static,
    {
        self.on_finished = Some(Box::new(callback));
    }

    /// Spawn the job and return a handle to observe it.
    ///
    /// Returns immediately; the work runs on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(self) -> JobHandle {
        let Job {
            selector,
            identity,
            operation,
            on_finished,
        } = self;
        let kind = operation.kind();
        let (tx, rx) = watch::channel(None);

        debug!(
            %kind,
            service = identity.service(),
            key = identity.key(),
            "job started"
        );

        let task_identity = identity.clone();
        tokio::spawn(async move {
            let outcome = Arc::new(execute(&selector, task_identity, operation).await);
            debug!(
                kind = %outcome.kind(),
                service = outcome.identity().service(),
                key = outcome.identity().key(),
                error = %outcome.error(),
                "job finished"
            );

            // Published once; observers that went away do not matter.
            tx.send_replace(Some(Arc::clone(&outcome)));
            if let Some(callback) = on_finished {
                callback(&outcome);
            }
        });

        JobHandle { kind, identity, rx }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind())
            .field("identity", &self.identity)
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}

/// Observer for a started job. Clone it to observe from several places.
#[derive(Debug, Clone)]
pub struct JobHandle {
    kind: JobKind,
    identity: Identity,
    rx: watch::Receiver<Option<Arc<JobOutcome>>>,
}

impl JobHandle {
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> JobState {
        if self.rx.borrow().is_some() {
            JobState::Completed
        } else {
            JobState::Running
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state() == JobState::Completed
    }

    /// The outcome, if the job has completed.
    pub fn outcome(&self) -> Option<Arc<JobOutcome>> {
        self.rx.borrow().clone()
    }

    /// Wait for completion and return the outcome.
    pub async fn finished(&self) -> Arc<JobOutcome> {
        let mut rx = self.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // The runtime dropped the job task before it published.
                let last = rx.borrow().clone();
                return last.unwrap_or_else(|| {
                    Arc::new(JobOutcome::failure(
                        self.kind,
                        self.identity.clone(),
                        &KeychainError::Internal("job was dropped before completing".to_string()),
                    ))
                });
            }
        }
    }
}

async fn execute(selector: &BackendSelector, identity: Identity, operation: Operation) -> JobOutcome {
    let kind = operation.kind();
    match run(selector, &identity, operation).await {
        Ok(payload) => JobOutcome::success(kind, identity, payload),
        Err(err) => JobOutcome::failure(kind, identity, &err),
    }
}

/// Validate, resolve the backend and dispatch. Returns the read value, if any.
async fn run(
    selector: &BackendSelector,
    identity: &Identity,
    operation: Operation,
) -> Result<Option<SecretBytes>> {
    // Identity problems are reported before any backend is consulted.
    identity.check()?;

    let deadline = Deadline::new(selector.timeout());
    let backend = deadline
        .bound(selector.backend())
        .await?
        .ok_or(KeychainError::NoBackendAvailable)?;

    if let Operation::Write { payload } = &operation {
        if let Some(max) = backend.max_payload_len() {
            if payload.len() > max {
                return Err(KeychainError::PayloadTooLarge {
                    len: payload.len(),
                    max,
                });
            }
        }
    }

    deadline.bound(selector.settle(identity)).await?;

    // A separate task turns a panicking backend into an error outcome.
    let mut task = tokio::spawn(dispatch(backend, identity.clone(), operation));
    let joined = deadline.bound(&mut task).await;
    match joined {
        Ok(joined) => {
            joined.map_err(|e| KeychainError::Internal(format!("backend task failed: {e}")))?
        }
        Err(err) => {
            // Native calls cannot be interrupted; later jobs on this identity wait for it.
            selector.track_abandoned(identity.clone(), task);
            Err(err)
        }
    }
}

/// Optional deadline shared by every step of one job.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    limit: Option<(Duration, Instant)>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            limit: limit.map(|limit| (limit, Instant::now() + limit)),
        }
    }

    async fn bound<F: Future>(&self, fut: F) -> Result<F::Output> {
        match self.limit {
            None => Ok(fut.await),
            Some((limit, at)) => tokio::time::timeout_at(at, fut).await.map_err(|_| {
                KeychainError::Timeout {
                    millis: limit.as_millis() as u64,
                }
            }),
        }
    }
}

async fn dispatch(
    backend: Arc<dyn Backend>,
    identity: Identity,
    operation: Operation,
) -> Result<Option<SecretBytes>> {
    match operation {
        Operation::Write { payload } => backend
            .write(&identity, payload.expose())
            .await
            .map(|()| None),
        Operation::Read => backend.read(&identity).await.map(Some),
        Operation::Delete => backend.delete(&identity).await.map(|()| None),
    }
}
