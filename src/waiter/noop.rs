//! The no-op waiter.

use super::item::PendingItem;
use super::token::Token;
use super::Waiter;
use crate::error::Result;

/// A waiter that tracks nothing and is always idle.
///
/// Handed out by [`build_waiter`](crate::build_waiter) when tracking is
/// disabled. It never registers with a registry and never fails.
///
/// ```rust
/// use test_waiters::{NoopWaiter, Token, Waiter};
///
/// let waiter = NoopWaiter::new("friend-waiter");
/// let token = waiter.begin_async(Some(Token::from(1)), Some("ignored")).unwrap();
/// assert_eq!(token, Token::Noop);
/// assert!(waiter.end_async(&Token::from(99)).is_ok());
/// assert!(waiter.wait_until());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoopWaiter {
    name: String,
}

impl NoopWaiter {
    /// Creates a no-op waiter.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Waiter for NoopWaiter {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn begin_async(&self, _token: Option<Token>, _label: Option<&str>) -> Result<Token> {
        Ok(Token::Noop)
    }

    #[inline]
    fn end_async(&self, _token: &Token) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn wait_until(&self) -> bool {
        true
    }

    #[inline]
    fn debug_info(&self) -> Vec<PendingItem> {
        Vec::new()
    }

    #[inline]
    fn reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_never_fails() {
        let waiter = NoopWaiter::new("noop");
        let token = Token::from("t");

        assert!(waiter.begin_async(Some(token.clone()), None).is_ok());
        assert!(waiter.begin_async(Some(token.clone()), None).is_ok());
        assert!(waiter.end_async(&token).is_ok());
        assert!(waiter.end_async(&Token::generate()).is_ok());
        assert!(waiter.wait_until());
        assert!(waiter.debug_info().is_empty());
    }

    #[test]
    fn test_noop_is_never_registered() {
        let waiter = NoopWaiter::new("noop");
        waiter.begin().unwrap();
        waiter.reset();
        assert!(!waiter.is_registered());
        assert_eq!(waiter.name(), "noop");
    }
}
