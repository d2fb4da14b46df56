//! The waiter registry.
//!
//! A [`WaiterRegistry`] maps waiter names to waiters and answers the one
//! question a test harness asks: is anything still pending?
//!
//! Most code uses the process-wide instance from [`WaiterRegistry::global`],
//! either directly or through the free functions in this module. Tests that
//! want isolation create their own with [`WaiterRegistry::new`] and hand it to
//! [`TestWaiter::new`](crate::TestWaiter::new).
//!
//! # Example
//!
//! ```rust
//! use test_waiters::{TestWaiter, Waiter, WaiterRegistry};
//!
//! let registry = WaiterRegistry::new();
//! let idle = TestWaiter::new("A", &registry);
//! let busy = TestWaiter::new("B", &registry);
//!
//! idle.register_now();
//! let token = busy.begin_labeled("saving").unwrap();
//!
//! let state = registry.pending_waiter_state();
//! assert_eq!(state.pending, 1);
//! assert_eq!(state.waiters["B"].items().len(), 1);
//!
//! busy.end_async(&token).unwrap();
//! assert!(!registry.has_pending_waiters());
//! ```

mod state;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::Mutex;

pub use state::{PendingWaiterState, WaiterDebugInfo};

use crate::waiter::Waiter;

/// Named collection of waiters.
///
/// Cloning is cheap; clones share the same map.
#[derive(Clone, Default)]
pub struct WaiterRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// Registered waiters in registration order.
    waiters: Mutex<IndexMap<String, Arc<dyn Waiter>>>,
    /// Set once a legacy runner callback has been installed.
    bridged: AtomicBool,
}

impl WaiterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static WaiterRegistry {
        static GLOBAL: OnceLock<WaiterRegistry> = OnceLock::new();
        GLOBAL.get_or_init(WaiterRegistry::new)
    }

    /// Adds `waiter` under its name, replacing any waiter already there.
    ///
    /// A replaced waiter keeps its slot in the registration order.
    pub fn register(&self, waiter: Arc<dyn Waiter>) {
        let name = waiter.name().to_owned();
        let replaced = self.inner.waiters.lock().insert(name.clone(), waiter);
        tracing::debug!(waiter = %name, replaced = replaced.is_some(), "registered waiter");
    }

    /// Removes the waiter registered under `waiter`'s name.
    ///
    /// Returns the removed waiter, if any.
    pub fn unregister(&self, waiter: &dyn Waiter) -> Option<Arc<dyn Waiter>> {
        self.unregister_name(waiter.name())
    }

    /// Removes the waiter registered under `name`.
    pub fn unregister_name(&self, name: &str) -> Option<Arc<dyn Waiter>> {
        let removed = self.inner.waiters.lock().shift_remove(name);
        if removed.is_some() {
            tracing::debug!(waiter = %name, "unregistered waiter");
        }
        removed
    }

    /// Snapshot of every registered waiter, in registration order.
    #[must_use]
    pub fn waiters(&self) -> Vec<Arc<dyn Waiter>> {
        self.inner.waiters.lock().values().cloned().collect()
    }

    /// The waiter registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Waiter>> {
        self.inner.waiters.lock().get(name).cloned()
    }

    /// Number of registered waiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.waiters.lock().len()
    }

    /// `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.waiters.lock().is_empty()
    }

    /// Polls every registered waiter.
    ///
    /// Waiters are polled from a snapshot, so a waiter may register or
    /// unregister while being polled.
    #[must_use]
    pub fn pending_waiter_state(&self) -> PendingWaiterState {
        let mut state = PendingWaiterState::default();
        for waiter in self.waiters() {
            if !waiter.wait_until() {
                state.record(waiter.name(), waiter.debug_info());
            }
        }
        state
    }

    /// `true` if any registered waiter has outstanding work.
    #[must_use]
    pub fn has_pending_waiters(&self) -> bool {
        self.pending_waiter_state().pending > 0
    }

    /// Drops every waiter, marking each one unregistered.
    ///
    /// A dropped [`TestWaiter`](crate::TestWaiter) registers again on its next
    /// `begin_async`.
    pub fn reset(&self) {
        let drained: Vec<Arc<dyn Waiter>> = {
            let mut waiters = self.inner.waiters.lock();
            waiters.drain(..).map(|(_, waiter)| waiter).collect()
        };
        for waiter in &drained {
            waiter.mark_unregistered();
        }
        tracing::debug!(count = drained.len(), "reset waiter registry");
    }

    /// Whether this handle and `other` share the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &WaiterRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Claims the one legacy-runner bridge slot. Returns `false` if taken.
    pub(crate) fn claim_bridge(&self) -> bool {
        self.inner
            .bridged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for WaiterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let waiters = self.inner.waiters.lock();
        f.debug_struct("WaiterRegistry")
            .field("waiters", &waiters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registers `waiter` with the global registry.
pub fn register(waiter: Arc<dyn Waiter>) {
    WaiterRegistry::global().register(waiter);
}

/// Unregisters `waiter` from the global registry.
pub fn unregister(waiter: &dyn Waiter) {
    WaiterRegistry::global().unregister(waiter);
}

/// Every waiter in the global registry.
#[must_use]
pub fn get_waiters() -> Vec<Arc<dyn Waiter>> {
    WaiterRegistry::global().waiters()
}

/// Pending state of the global registry.
#[must_use]
pub fn get_pending_waiter_state() -> PendingWaiterState {
    WaiterRegistry::global().pending_waiter_state()
}

/// `true` if any waiter in the global registry is pending.
#[must_use]
pub fn has_pending_waiters() -> bool {
    WaiterRegistry::global().has_pending_waiters()
}

/// Clears the global registry between test runs.
#[doc(hidden)]
pub fn reset() {
    WaiterRegistry::global().reset();
}
