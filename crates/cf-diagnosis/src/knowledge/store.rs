use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::snapshot::{KnowledgeBase, KnowledgeBaseError, KnowledgeRecords};

/// Read-only source of knowledge base rows (database, CSV export, fixtures).
pub trait KnowledgeStore: Send + Sync {
    fn load(&self) -> Result<KnowledgeRecords, KnowledgeStoreError>;
}

/// Error enumeration for knowledge store failures.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeStoreError {
    #[error("knowledge store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid knowledge base: {0}")]
    Schema(#[from] KnowledgeBaseError),
    #[error("knowledge store still failing after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl KnowledgeStoreError {
    /// Whether the failure may succeed when the same load is attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            KnowledgeStoreError::Unavailable(_) | KnowledgeStoreError::RetriesExhausted { .. } => {
                true
            }
            KnowledgeStoreError::Io { source, .. } => matches!(
                source.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::TimedOut
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
            ),
            KnowledgeStoreError::Csv { .. } | KnowledgeStoreError::Schema(_) => false,
        }
    }
}

/// Exponential backoff applied to transient failures of an outbound collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Total number of attempts, counting the first one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Run `attempt` until it succeeds, fails with an error `is_transient`
    /// rejects, or the retry budget is spent. `operation` names the call in logs.
    pub fn run<T, E>(
        &self,
        operation: &str,
        mut attempt: impl FnMut() -> Result<T, E>,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, RetryError<E>> {
        let mut retry = 0u32;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if !is_transient(&err) => return Err(RetryError::Permanent(err)),
                Err(err) if retry >= self.max_retries => {
                    return Err(RetryError::Exhausted {
                        attempts: self.attempts(),
                        last: err,
                    });
                }
                Err(_) => {}
            }

            retry += 1;
            let backoff = self.backoff_for(retry);
            warn!(
                operation,
                attempt = retry,
                backoff_ms = backoff.as_millis() as u64,
                "retrying after backoff"
            );
            std::thread::sleep(backoff);
        }
    }
}

/// Failure of an operation run under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was not worth retrying.
    Permanent(E),
    /// Every attempt failed transiently; `last` is the final error.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent(err) | RetryError::Exhausted { last: err, .. } => err,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Takes one consistent snapshot per scoring run, retrying transient store failures.
pub struct SnapshotLoader<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S> SnapshotLoader<S>
where
    S: KnowledgeStore,
{
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn load(&self) -> Result<Arc<KnowledgeBase>, KnowledgeStoreError> {
        let records = self
            .retry
            .run(
                "knowledge base load",
                || self.store.load(),
                KnowledgeStoreError::is_transient,
            )
            .map_err(|err| match err {
                RetryError::Permanent(err) => err,
                RetryError::Exhausted { attempts, last } => {
                    KnowledgeStoreError::RetriesExhausted {
                        attempts,
                        last_error: last.to_string(),
                    }
                }
            })?;

        let snapshot = KnowledgeBase::from_records(records)?;
        debug!(
            diseases = snapshot.diseases().count(),
            symptoms = snapshot.symptoms().len(),
            rules = snapshot.rules().len(),
            "knowledge base snapshot loaded"
        );
        Ok(Arc::new(snapshot))
    }
}
