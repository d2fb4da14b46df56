//! The tracking waiter.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::item::PendingItem;
use super::token::{CompletedTokens, Token, TokenKey};
use super::Waiter;
use crate::error::{Error, Result};
use crate::registry::WaiterRegistry;

/// A waiter that records every begun token until it is ended.
///
/// `TestWaiter` is a cheap handle: clones share the same pending set, so a
/// clone can be moved into the callback that finishes the work.
///
/// # Example
///
/// ```rust
/// use test_waiters::{TestWaiter, Waiter, WaiterRegistry};
///
/// let registry = WaiterRegistry::new();
/// let waiter = TestWaiter::new("friend-waiter", &registry);
///
/// let token = waiter.begin_labeled("load friends").unwrap();
/// assert!(!waiter.wait_until());
/// assert!(registry.has_pending_waiters());
///
/// waiter.end_async(&token).unwrap();
/// assert!(waiter.wait_until());
/// assert!(!registry.has_pending_waiters());
/// ```
#[derive(Clone)]
pub struct TestWaiter {
    inner: Arc<WaiterInner>,
}

struct WaiterInner {
    name: String,
    registry: WaiterRegistry,
    registered: AtomicBool,
    state: Mutex<WaiterState>,
}

#[derive(Default)]
struct WaiterState {
    /// Live tokens, in the order they were begun.
    items: IndexMap<TokenKey, PendingItem>,
    /// Tokens that have already been ended.
    completed: CompletedTokens,
}

impl TestWaiter {
    /// Creates a waiter that registers with `registry` on first use.
    pub fn new(name: impl Into<String>, registry: &WaiterRegistry) -> Self {
        Self {
            inner: Arc::new(WaiterInner {
                name: name.into(),
                registry: registry.clone(),
                registered: AtomicBool::new(false),
                state: Mutex::new(WaiterState::default()),
            }),
        }
    }

    /// Creates a waiter bound to the global registry.
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, WaiterRegistry::global())
    }

    /// The registry this waiter reports to.
    #[must_use]
    pub fn registry(&self) -> &WaiterRegistry {
        &self.inner.registry
    }

    /// Number of tokens currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    /// Registers the waiter now instead of on the first `begin_async`.
    pub fn register_now(&self) {
        if self
            .inner
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.inner.registry.register(Arc::new(self.clone()));
        }
    }

    /// Whether `other` is a handle to the same waiter.
    #[must_use]
    pub fn ptr_eq(&self, other: &TestWaiter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Waiter for TestWaiter {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn begin_async(&self, token: Option<Token>, label: Option<&str>) -> Result<Token> {
        self.register_now();

        let token = token.unwrap_or_else(Token::generate);
        let key = token.key();

        let mut state = self.inner.state.lock();
        if state.items.contains_key(&key) {
            return Err(Error::already_pending(self.name(), &token));
        }
        state
            .items
            .insert(key, PendingItem::capture(token.clone(), label));
        drop(state);

        tracing::trace!(waiter = %self.name(), %token, label = ?label, "begin async");
        Ok(token)
    }

    fn end_async(&self, token: &Token) -> Result<()> {
        let key = token.key();

        let mut state = self.inner.state.lock();
        if !state.items.contains_key(&key) && !state.completed.contains(token) {
            return Err(Error::missing_begin(self.name(), token));
        }
        state.items.shift_remove(&key);
        state.completed.insert(token);
        drop(state);

        tracing::trace!(waiter = %self.name(), %token, "end async");
        Ok(())
    }

    fn wait_until(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }

    fn debug_info(&self) -> Vec<PendingItem> {
        self.inner.state.lock().items.values().cloned().collect()
    }

    fn reset(&self) {
        self.inner.state.lock().items.clear();
    }

    fn is_registered(&self) -> bool {
        self.inner.registered.load(Ordering::Acquire)
    }

    fn mark_unregistered(&self) {
        self.inner.registered.store(false, Ordering::Release);
    }
}

impl fmt::Debug for TestWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWaiter")
            .field("name", &self.inner.name)
            .field("registered", &self.is_registered())
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiter() -> (WaiterRegistry, TestWaiter) {
        let registry = WaiterRegistry::new();
        let waiter = TestWaiter::new("test", &registry);
        (registry, waiter)
    }

    #[test]
    fn test_new_waiter_is_idle() {
        let (registry, waiter) = waiter();
        assert!(waiter.wait_until());
        assert!(waiter.debug_info().is_empty());
        assert!(!waiter.is_registered());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_begin_registers_lazily() {
        let (registry, waiter) = waiter();
        waiter.begin().unwrap();

        assert!(waiter.is_registered());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("test").map(|w| w.name().to_owned()), Some("test".into()));

        waiter.begin().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_begin_records_label() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin_async(Some(Token::from(1)), Some("fetch")).unwrap();

        assert_eq!(token, Token::from(1));
        assert!(!waiter.wait_until());
        let info = waiter.debug_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].label.as_deref(), Some("fetch"));
        assert_eq!(info[0].token, token);
    }

    #[test]
    fn test_begin_generates_distinct_tokens() {
        let (_registry, waiter) = waiter();
        let a = waiter.begin().unwrap();
        let b = waiter.begin().unwrap();
        assert_ne!(a, b);
        assert_eq!(waiter.pending_count(), 2);
    }

    #[test]
    fn test_double_begin_fails() {
        let (_registry, waiter) = waiter();
        waiter.begin_async(Some(Token::from("k")), None).unwrap();

        let err = waiter.begin_async(Some(Token::from("k")), None).unwrap_err();
        assert!(err.is_already_pending());
        assert_eq!(waiter.pending_count(), 1);
    }

    #[test]
    fn test_double_begin_object_fails() {
        let (_registry, waiter) = waiter();
        let object = Arc::new(String::from("component"));
        waiter.begin_async(Some(Token::object(object.clone())), None).unwrap();

        let err = waiter
            .begin_async(Some(Token::object(object)), None)
            .unwrap_err();
        assert!(err.is_already_pending());
    }

    #[test]
    fn test_end_without_begin_fails() {
        let (_registry, waiter) = waiter();
        let err = waiter.end_async(&Token::from(9)).unwrap_err();
        assert!(err.is_missing_begin());
        assert_eq!(err.waiter(), "test");

        let err = waiter.end_async(&Token::generate()).unwrap_err();
        assert!(err.is_missing_begin());
    }

    #[test]
    fn test_duplicate_end_is_accepted() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin_async(Some(Token::from(5)), None).unwrap();

        waiter.end_async(&token).unwrap();
        waiter.end_async(&token).unwrap();
        assert!(waiter.wait_until());
    }

    #[test]
    fn test_duplicate_end_generated_token() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin().unwrap();

        waiter.end_async(&token).unwrap();
        waiter.end_async(&token).unwrap();
        assert!(waiter.debug_info().is_empty());
    }

    #[test]
    fn test_token_can_begin_again_after_end() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin_async(Some(Token::from("reuse")), None).unwrap();
        waiter.end_async(&token).unwrap();

        waiter.begin_async(Some(token.clone()), None).unwrap();
        assert!(!waiter.wait_until());
        waiter.end_async(&token).unwrap();
        assert!(waiter.wait_until());
    }

    #[test]
    fn test_reset_clears_pending() {
        let (registry, waiter) = waiter();
        waiter.begin().unwrap();
        waiter.begin().unwrap();

        waiter.reset();
        assert!(waiter.wait_until());
        assert!(waiter.is_registered());
        assert!(!registry.has_pending_waiters());
    }

    #[test]
    fn test_reset_keeps_completed_history() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin_async(Some(Token::from(1)), None).unwrap();
        waiter.end_async(&token).unwrap();

        waiter.reset();
        assert!(waiter.end_async(&token).is_ok());
    }

    #[test]
    fn test_end_after_reset_without_history_fails() {
        let (_registry, waiter) = waiter();
        let token = waiter.begin().unwrap();
        waiter.reset();

        assert!(waiter.end_async(&token).unwrap_err().is_missing_begin());
    }

    #[test]
    fn test_clones_share_state() {
        let (_registry, waiter) = waiter();
        let other = waiter.clone();
        let token = waiter.begin().unwrap();

        assert!(!other.wait_until());
        other.end_async(&token).unwrap();
        assert!(waiter.wait_until());
        assert!(waiter.ptr_eq(&other));
    }

    #[test]
    fn test_debug_info_keeps_begin_order() {
        let (_registry, waiter) = waiter();
        for i in 0..4 {
            waiter.begin_async(Some(Token::from(i)), None).unwrap();
        }
        waiter.end_async(&Token::from(1)).unwrap();

        let tokens: Vec<Token> = waiter.debug_info().into_iter().map(|i| i.token).collect();
        assert_eq!(tokens, vec![Token::from(0), Token::from(2), Token::from(3)]);
    }
}
