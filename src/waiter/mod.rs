//! Waiters track outstanding async operations for one named concern.
//!
//! - [`TestWaiter`] - records every begun token until it is ended
//! - [`NoopWaiter`] - records nothing, always idle
//! - [`build_waiter`] - picks one of the two from the process configuration
//!
//! # Example
//!
//! ```rust
//! use test_waiters::Waiter;
//!
//! let waiter = test_waiters::build_waiter("friend-waiter");
//!
//! let token = waiter.begin_async(None, Some("load friends")).unwrap();
//! // ... later, from the completion callback:
//! waiter.end_async(&token).unwrap();
//! assert!(waiter.wait_until());
//! ```

mod future;
mod item;
mod noop;
mod token;
mod tracking;

use std::fmt::Debug;
use std::sync::Arc;

pub use future::{wait_for_future, WaitForFuture};
pub use item::PendingItem;
pub use noop::NoopWaiter;
pub use token::{GeneratedToken, ObjectToken, Token, TokenKind};
pub use tracking::TestWaiter;

use crate::config::WaiterConfig;
use crate::error::Result;
use crate::registry::WaiterRegistry;

/// Capability shared by every waiter.
///
/// The registry polls [`wait_until`](Waiter::wait_until) and
/// [`debug_info`](Waiter::debug_info); application code brackets its async
/// work with [`begin_async`](Waiter::begin_async) and
/// [`end_async`](Waiter::end_async).
pub trait Waiter: Send + Sync + Debug {
    /// Unique name; the registry key.
    fn name(&self) -> &str;

    /// Marks an operation as in flight and returns its token.
    ///
    /// A fresh token is generated when `token` is `None`.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyPending`](crate::Error::AlreadyPending) if `token` is
    /// already pending on this waiter.
    fn begin_async(&self, token: Option<Token>, label: Option<&str>) -> Result<Token>;

    /// Marks the operation identified by `token` as finished.
    ///
    /// Ending a token a second time succeeds and changes nothing.
    ///
    /// # Errors
    ///
    /// [`Error::MissingBegin`](crate::Error::MissingBegin) if `token` was
    /// never begun on this waiter.
    fn end_async(&self, token: &Token) -> Result<()>;

    /// `true` when no operation is outstanding.
    fn wait_until(&self) -> bool;

    /// Snapshot of every pending operation.
    fn debug_info(&self) -> Vec<PendingItem>;

    /// Forgets every pending operation.
    fn reset(&self);

    /// Whether this waiter has added itself to a registry.
    fn is_registered(&self) -> bool {
        false
    }

    /// Called by [`WaiterRegistry::reset`] for every waiter it drops.
    fn mark_unregistered(&self) {}

    /// Begins an operation under a generated token.
    ///
    /// # Errors
    ///
    /// See [`begin_async`](Waiter::begin_async).
    fn begin(&self) -> Result<Token> {
        self.begin_async(None, None)
    }

    /// Begins a labelled operation under a generated token.
    ///
    /// # Errors
    ///
    /// See [`begin_async`](Waiter::begin_async).
    fn begin_labeled(&self, label: &str) -> Result<Token> {
        self.begin_async(None, Some(label))
    }
}

impl<W: Waiter + ?Sized> Waiter for Arc<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn begin_async(&self, token: Option<Token>, label: Option<&str>) -> Result<Token> {
        (**self).begin_async(token, label)
    }

    fn end_async(&self, token: &Token) -> Result<()> {
        (**self).end_async(token)
    }

    fn wait_until(&self) -> bool {
        (**self).wait_until()
    }

    fn debug_info(&self) -> Vec<PendingItem> {
        (**self).debug_info()
    }

    fn reset(&self) {
        (**self).reset();
    }

    fn is_registered(&self) -> bool {
        (**self).is_registered()
    }

    fn mark_unregistered(&self) {
        (**self).mark_unregistered();
    }
}

/// Builds a waiter reporting to the global registry.
///
/// Whether it tracks is decided by [`WaiterConfig::global`]; with the `noop`
/// feature this always returns a [`NoopWaiter`].
pub fn build_waiter(name: impl Into<String>) -> Arc<dyn Waiter> {
    build_waiter_with(WaiterConfig::global(), WaiterRegistry::global(), name)
}

/// Builds a waiter with an explicit configuration and registry.
///
/// ```rust
/// use test_waiters::config::WaiterConfig;
/// use test_waiters::{build_waiter_with, Waiter, WaiterRegistry};
///
/// let registry = WaiterRegistry::new();
/// let waiter = build_waiter_with(&WaiterConfig::new().noop(), &registry, "quiet");
/// waiter.begin().unwrap();
/// assert!(registry.is_empty());
/// ```
pub fn build_waiter_with(
    config: &WaiterConfig,
    registry: &WaiterRegistry,
    name: impl Into<String>,
) -> Arc<dyn Waiter> {
    if cfg!(feature = "noop") || !config.is_tracking() {
        Arc::new(NoopWaiter::new(name))
    } else {
        Arc::new(TestWaiter::new(name, registry))
    }
}
