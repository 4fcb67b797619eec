// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative cancellation primitives.
//!
//! Every suspension point in the acquisition layer — network calls, cache
//! reads and writes, long parses — observes a token and returns promptly
//! with a `Cancelled` error once it is signalled. Partial results are
//! discarded by the caller.
//!
//! The token records *why* it was signalled: the first
//! [`CancellationReason`] wins and is what the orchestrator persists in
//! the job's failure record. Operator interrupts, the job deadline, and
//! failure wind-down each stamp their own reason.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A cloneable, cheaply-shareable token used to signal cancellation.
///
/// All clones share the same underlying state; cancelling one immediately
/// makes every clone observe `is_cancelled() == true` and the same
/// recorded reason.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<CancellationReason>>,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new token that is **not** cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation as an operator request. Idempotent.
    pub fn cancel(&self) {
        self.cancel_with(CancellationReason::UserRequested);
    }

    /// Signal cancellation with an explicit reason.
    ///
    /// Only the **first** reason is recorded; later calls still signal
    /// the token but do not overwrite it.
    pub fn cancel_with(&self, reason: CancellationReason) {
        {
            let mut slot = self.inner.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns `true` once any `cancel*` call has happened.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The recorded reason, once cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<CancellationReason> {
        *self.inner.reason.lock()
    }

    /// Returns a future that completes when the token is cancelled.
    ///
    /// If the token is already cancelled the future resolves immediately.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            self.inner.notify.notified().await;
            if self.is_cancelled() {
                return;
            }
        }
    }

    /// Error out if the token has been signalled.
    ///
    /// # Errors
    ///
    /// Returns [`atlas_core::AtlasError::Cancelled`] naming the operation.
    pub fn check(&self, operation: &str) -> Result<(), atlas_core::AtlasError> {
        if self.is_cancelled() {
            Err(atlas_core::AtlasError::Cancelled {
                operation: operation.to_owned(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

/// Why a job was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    /// The operator explicitly requested cancellation (ctrl-c).
    UserRequested,
    /// The overall job deadline expired.
    JobTimeout,
    /// The job failed and remaining work is winding down.
    JobFailed,
}

impl CancellationReason {
    /// Human-readable description, persisted in job failure records.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::UserRequested => "cancelled by operator request",
            Self::JobTimeout => "cancelled because the job deadline expired",
            Self::JobFailed => "cancelled because the job failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn cancel_defaults_to_user_requested() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancellationReason::UserRequested));
    }

    #[test]
    fn first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel_with(CancellationReason::JobTimeout);
        token.cancel_with(CancellationReason::UserRequested);
        assert_eq!(token.reason(), Some(CancellationReason::JobTimeout));
    }

    #[test]
    fn clones_share_state_and_reason() {
        let a = CancellationToken::new();
        let b = a.clone();
        a.cancel_with(CancellationReason::JobFailed);
        assert!(b.is_cancelled());
        assert_eq!(b.reason(), Some(CancellationReason::JobFailed));
    }

    #[test]
    fn multiple_cancels_are_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn check_maps_to_cancelled_error() {
        let token = CancellationToken::new();
        assert!(token.check("download").is_ok());
        token.cancel_with(CancellationReason::JobTimeout);
        let err = token.check("download").unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::Cancelled);
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_signal() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn all_reasons_have_descriptions() {
        for reason in [
            CancellationReason::UserRequested,
            CancellationReason::JobTimeout,
            CancellationReason::JobFailed,
        ] {
            assert!(!reason.description().is_empty());
        }
    }
}
