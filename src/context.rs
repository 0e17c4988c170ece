//! Cancellation context passed to every operation.
//!
//! Carries a cancellation token and an optional deadline. Batch operations
//! check it before each chunk or element they dispatch.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::DalError;

/// Cancellation and deadline scope for one or more operations.
///
/// Cloning shares the cancellation state; [`Context::child`] derives a scope
/// that is cancelled with its parent but can also be cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child context that also expires after `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` never expires; the
    /// parent's deadline, if any, still applies.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Child context that expires at `deadline` or at the parent's deadline,
    /// whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token to hand to code that cancels from elsewhere (another thread).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// `Cancelled` wins over `DeadlineExceeded` when both apply.
    pub fn err(&self) -> Option<DalError> {
        if self.token.is_cancelled() {
            return Some(DalError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DalError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn check(&self) -> Result<(), DalError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
