//! Aggregated pending state.

use std::fmt;

use indexmap::IndexMap;

use crate::waiter::PendingItem;

/// What the registry knows about one pending waiter.
#[derive(Clone, Debug)]
pub enum WaiterDebugInfo {
    /// The waiter's pending operations.
    Items(Vec<PendingItem>),
    /// The waiter is pending but reported no details.
    Pending,
}

impl WaiterDebugInfo {
    /// The reported items; empty for [`WaiterDebugInfo::Pending`].
    #[must_use]
    pub fn items(&self) -> &[PendingItem] {
        match self {
            WaiterDebugInfo::Items(items) => items,
            WaiterDebugInfo::Pending => &[],
        }
    }
}

/// Result of polling every registered waiter.
#[derive(Clone, Debug, Default)]
pub struct PendingWaiterState {
    /// Number of waiters whose `wait_until` returned `false`.
    pub pending: usize,
    /// Pending waiters by name, in registration order.
    pub waiters: IndexMap<String, WaiterDebugInfo>,
}

impl PendingWaiterState {
    /// `true` if any waiter is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    pub(crate) fn record(&mut self, name: &str, items: Vec<PendingItem>) {
        self.pending += 1;
        let info = if items.is_empty() {
            WaiterDebugInfo::Pending
        } else {
            WaiterDebugInfo::Items(items)
        };
        self.waiters.insert(name.to_owned(), info);
    }
}

impl fmt::Display for PendingWaiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_pending() {
            return write!(f, "no pending waiters");
        }

        write!(f, "{} pending waiter(s)", self.pending)?;
        for (name, info) in &self.waiters {
            write!(f, "\n  {name}:")?;
            match info {
                WaiterDebugInfo::Pending => write!(f, " pending")?,
                WaiterDebugInfo::Items(items) => {
                    for item in items {
                        write!(f, "\n    - {item}")?;
                        let stack = item.stack();
                        for line in stack.lines() {
                            write!(f, "\n        {line}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
