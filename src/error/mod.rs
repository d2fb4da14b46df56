//! Error definitions
//!
//! Both failures are bookkeeping bugs in the caller: a token begun twice, or a
//! token ended that was never begun. They are returned immediately and never
//! repaired by the waiter.

use thiserror::Error;

/// Main error type for test-waiters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `begin_async` was called for a token that is still pending.
    #[error("beginAsync called for {token} but it is already pending (waiter `{waiter}`).")]
    AlreadyPending {
        /// Name of the waiter that rejected the token.
        waiter: String,
        /// Rendered token.
        token: String,
    },

    /// `end_async` was called for a token that was never begun.
    #[error("endAsync called with no preceding beginAsync call for {token} (waiter `{waiter}`).")]
    MissingBegin {
        /// Name of the waiter that rejected the token.
        waiter: String,
        /// Rendered token.
        token: String,
    },
}

impl Error {
    /// Create an already-pending error.
    #[must_use]
    pub fn already_pending(waiter: impl Into<String>, token: impl ToString) -> Self {
        Self::AlreadyPending {
            waiter: waiter.into(),
            token: token.to_string(),
        }
    }

    /// Create a missing-begin error.
    #[must_use]
    pub fn missing_begin(waiter: impl Into<String>, token: impl ToString) -> Self {
        Self::MissingBegin {
            waiter: waiter.into(),
            token: token.to_string(),
        }
    }

    /// Returns `true` for a double `begin_async`.
    #[must_use]
    pub fn is_already_pending(&self) -> bool {
        matches!(self, Self::AlreadyPending { .. })
    }

    /// Returns `true` for an unmatched `end_async`.
    #[must_use]
    pub fn is_missing_begin(&self) -> bool {
        matches!(self, Self::MissingBegin { .. })
    }

    /// Name of the waiter that raised the error.
    #[must_use]
    pub fn waiter(&self) -> &str {
        match self {
            Self::AlreadyPending { waiter, .. } | Self::MissingBegin { waiter, .. } => waiter,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
