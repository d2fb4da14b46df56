//! Diagnostics recorded for each pending token.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::Arc;

use super::token::Token;

/// A token that has been begun but not yet ended.
///
/// The backtrace is captured when `begin_async` runs and only rendered when
/// [`stack`](PendingItem::stack) is called. Capture follows the usual
/// `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` switches.
#[derive(Clone)]
pub struct PendingItem {
    /// The pending token.
    pub token: Token,
    /// Optional human-readable label passed to `begin_async`.
    pub label: Option<String>,
    backtrace: Arc<Backtrace>,
}

impl PendingItem {
    pub(crate) fn capture(token: Token, label: Option<&str>) -> Self {
        Self {
            token,
            label: label.map(str::to_owned),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// The call stack at the time `begin_async` was called.
    ///
    /// Empty when backtraces are disabled.
    #[must_use]
    pub fn stack(&self) -> String {
        match self.backtrace.status() {
            BacktraceStatus::Captured => self.backtrace.to_string(),
            _ => String::new(),
        }
    }

    /// Whether a backtrace was captured.
    #[must_use]
    pub fn has_stack(&self) -> bool {
        self.backtrace.status() == BacktraceStatus::Captured
    }
}

impl fmt::Display for PendingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} ({})", self.token),
            None => write!(f, "{}", self.token),
        }
    }
}

impl fmt::Debug for PendingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingItem")
            .field("token", &self.token)
            .field("label", &self.label)
            .field("has_stack", &self.has_stack())
            .finish()
    }
}
