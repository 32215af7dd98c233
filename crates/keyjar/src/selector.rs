//! Resolve-once choice of the active backend.
//!
//! A [`BackendSelector`] is built once at startup and handed to every job.
//! It starts `Unresolved`; the first job start (or an explicit
//! [`BackendSelector::is_available`] call) probes the candidate backend and
//! fixes the result for the lifetime of the selector. Concurrent first uses
//! share a single probe.
//!
//! The selector also remembers backend calls that outlived their job's
//! timeout, so later jobs on the same identity start only once those calls
//! have finished.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use keyjar_backends::{platform_backend, MemoryBackend};
use keyjar_core::{Backend, BackendPreference, Identity, KeychainConfig};
use parking_lot::Mutex;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable selector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// No job has started yet.
    Unresolved,
    /// Resolution happened; `None` means no usable backend.
    Resolved(Option<&'static str>),
}

struct Inner {
    candidate: Option<Arc<dyn Backend>>,
    resolved: OnceCell<Option<Arc<dyn Backend>>>,
    timeout: Option<Duration>,
    // Closed once the abandoned call finishes.
    abandoned: Mutex<HashMap<Identity, Vec<watch::Receiver<()>>>>,
}

/// Shared handle to the process's backend choice. Cheap to clone.
#[derive(Clone)]
pub struct BackendSelector {
    inner: Arc<Inner>,
}

impl BackendSelector {
    /// Create a selector for an explicit candidate.
    ///
    /// `None` resolves to "no backend available". `timeout` bounds every
    /// backend call made through this selector.
    pub fn new(candidate: Option<Arc<dyn Backend>>, timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                candidate,
                resolved: OnceCell::new(),
                timeout,
                abandoned: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build the selector described by `config`.
    pub fn from_config(config: &KeychainConfig) -> Self {
        let candidate: Option<Arc<dyn Backend>> = match config.backend {
            BackendPreference::Auto => platform_backend(config),
            BackendPreference::Memory => Some(Arc::new(match config.memory.max_payload_len {
                Some(max) => MemoryBackend::with_max_payload_len(max),
                None => MemoryBackend::new(),
            })),
            BackendPreference::None => None,
        };
        let timeout = config.operation_timeout_ms.map(Duration::from_millis);
        Self::new(candidate, timeout)
    }

    /// The platform's native backend with default settings.
    pub fn platform() -> Self {
        Self::from_config(&KeychainConfig::default())
    }

    /// A selector that always uses `backend` (subject to its probe).
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self::new(Some(backend), None)
    }

    /// A selector with no backend; every job reports `NoBackendAvailable`.
    pub fn unavailable() -> Self {
        Self::new(None, None)
    }

    /// Deadline applied to each job, from backend resolution to completion.
    ///
    /// An expired write or delete is indeterminate: the native call may still
    /// take effect afterwards. Later jobs on the same identity through this
    /// selector wait for it before dispatching.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn state(&self) -> SelectorState {
        match self.inner.resolved.get() {
            None => SelectorState::Unresolved,
            Some(resolved) => SelectorState::Resolved(resolved.as_ref().map(|b| b.name())),
        }
    }

    /// Resolve on first use and return the active backend, if any.
    pub async fn backend(&self) -> Option<Arc<dyn Backend>> {
        self.inner
            .resolved
            .get_or_init(|| async {
                let resolved = match &self.inner.candidate {
                    Some(backend) => {
                        if backend.is_available().await {
                            Some(Arc::clone(backend))
                        } else {
                            warn!(
                                backend = backend.name(),
                                "secret store is not usable on this system"
                            );
                            None
                        }
                    }
                    None => None,
                };
                info!(
                    backend = resolved.as_ref().map(|b| b.name()).unwrap_or("none"),
                    "keychain backend resolved"
                );
                resolved
            })
            .await
            .clone()
    }

    /// Whether a usable backend exists, resolving if necessary.
    pub async fn is_available(&self) -> bool {
        self.backend().await.is_some()
    }

    /// Keep track of a backend call whose job gave up waiting for it.
    pub(crate) fn track_abandoned<T>(&self, identity: Identity, task: JoinHandle<T>)
    where
        T: Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(());
        self.inner
            .abandoned
            .lock()
            .entry(identity)
            .or_default()
            .push(done_rx);
        tokio::spawn(async move {
            let _ = task.await;
            drop(done_tx);
        });
    }

    /// Wait for abandoned calls on `identity` to finish.
    pub(crate) async fn settle(&self, identity: &Identity) {
        let pending = {
            let mut abandoned = self.inner.abandoned.lock();
            let Some(calls) = abandoned.get_mut(identity) else {
                return;
            };
            calls.retain(|done| done.has_changed().is_ok());
            let pending = calls.clone();
            if calls.is_empty() {
                abandoned.remove(identity);
            }
            pending
        };

        if !pending.is_empty() {
            debug!(
                service = identity.service(),
                key = identity.key(),
                calls = pending.len(),
                "waiting for abandoned backend calls"
            );
        }
        for mut done in pending {
            while done.changed().await.is_ok() {}
        }
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("state", &self.state())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}
