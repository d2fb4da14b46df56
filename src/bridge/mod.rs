//! Bridge to test runners that poll plain callbacks.
//!
//! Older harnesses don't know about registries; they keep a list of
//! `Fn() -> bool` callbacks and wait until every callback returns `true`.
//! [`install_legacy_bridge`] hands such a runner one callback that reports
//! whether a registry has settled.
//!
//! # Example
//!
//! ```rust
//! use parking_lot::Mutex;
//! use test_waiters::bridge::{install_legacy_bridge, LegacyTestRunner, SettledCallback};
//! use test_waiters::{TestWaiter, Waiter, WaiterRegistry};
//!
//! #[derive(Default)]
//! struct Runner {
//!     callbacks: Mutex<Vec<SettledCallback>>,
//! }
//!
//! impl LegacyTestRunner for Runner {
//!     fn is_test_mode(&self) -> bool {
//!         true
//!     }
//!
//!     fn register_waiter(&self, callback: SettledCallback) {
//!         self.callbacks.lock().push(callback);
//!     }
//! }
//!
//! let runner = Runner::default();
//! let registry = WaiterRegistry::new();
//! assert!(install_legacy_bridge(&runner, &registry));
//!
//! let waiter = TestWaiter::new("save", &registry);
//! let token = waiter.begin().unwrap();
//! assert!(!(runner.callbacks.lock()[0])());
//!
//! waiter.end_async(&token).unwrap();
//! assert!((runner.callbacks.lock()[0])());
//! ```

use crate::registry::WaiterRegistry;

/// Callback handed to a legacy runner; returns `true` once settled.
pub type SettledCallback = Box<dyn Fn() -> bool + Send + Sync>;

/// A test runner with its own callback-based waiter list.
pub trait LegacyTestRunner {
    /// Whether the runner is active in this process.
    fn is_test_mode(&self) -> bool;

    /// Adds a callback the runner polls until it returns `true`.
    fn register_waiter(&self, callback: SettledCallback);
}

/// Registers a single settled-check for `registry` with `runner`.
///
/// Does nothing when the runner is not in test mode, or when a bridge was
/// already installed for this registry. Returns `true` if a callback was
/// registered.
pub fn install_legacy_bridge(runner: &dyn LegacyTestRunner, registry: &WaiterRegistry) -> bool {
    if !runner.is_test_mode() {
        tracing::debug!("legacy test runner inactive, bridge not installed");
        return false;
    }
    if !registry.claim_bridge() {
        return false;
    }

    let registry = registry.clone();
    runner.register_waiter(Box::new(move || !registry.has_pending_waiters()));
    tracing::debug!("installed legacy test runner bridge");
    true
}
