//! Tokens identifying one in-flight operation.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Whether a token is compared by identity or by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Compared by allocation; bookkeeping is held weakly.
    Identity,
    /// Compared by value.
    Value,
}

/// A token handed out by [`Token::generate`].
///
/// Every generated token owns its own allocation, so two generated tokens are
/// never equal even if the counter were to wrap.
#[derive(Clone)]
pub struct GeneratedToken(Arc<u64>);

impl GeneratedToken {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(Arc::new(COUNTER.fetch_add(1, Ordering::Relaxed)))
    }

    /// Returns the sequence number.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        *self.0
    }
}

/// A caller-supplied object used as a token, compared by identity.
#[derive(Clone)]
pub struct ObjectToken(Arc<dyn Any + Send + Sync>);

impl ObjectToken {
    /// Returns the wrapped object if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

/// Opaque handle for one in-flight async operation.
///
/// Generated and object tokens are compared by identity; every other token is
/// compared by value.
///
/// ```rust
/// use std::sync::Arc;
/// use test_waiters::{Token, TokenKind};
///
/// let request = Arc::new(String::from("GET /users"));
/// let a = Token::object(request.clone());
/// let b = Token::object(request);
/// assert_eq!(a, b);
/// assert_eq!(a.kind(), TokenKind::Identity);
///
/// assert_eq!(Token::from("key"), Token::from(String::from("key")));
/// assert_ne!(Token::generate(), Token::generate());
/// ```
#[derive(Clone)]
pub enum Token {
    /// Produced when `begin_async` is called without a token.
    Generated(GeneratedToken),
    /// An application object.
    Object(ObjectToken),
    /// Integer key.
    Int(i64),
    /// String key.
    Str(Arc<str>),
    /// Boolean key.
    Bool(bool),
    /// Handle returned by the no-op waiter.
    Noop,
}

impl Token {
    /// A fresh token, unequal to every other token.
    #[must_use]
    pub fn generate() -> Self {
        Self::Generated(GeneratedToken::next())
    }

    /// Use an application object as a token.
    #[must_use]
    pub fn object<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Self::Object(ObjectToken(object))
    }

    /// How this token is compared.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Generated(_) | Token::Object(_) => TokenKind::Identity,
            Token::Int(_) | Token::Str(_) | Token::Bool(_) | Token::Noop => TokenKind::Value,
        }
    }

    pub(crate) fn key(&self) -> TokenKey {
        match self {
            Token::Generated(g) => TokenKey::Identity(Arc::as_ptr(&g.0) as usize),
            Token::Object(o) => TokenKey::Identity(o.addr()),
            Token::Int(i) => TokenKey::Value(ValueKey::Int(*i)),
            Token::Str(s) => TokenKey::Value(ValueKey::Str(s.clone())),
            Token::Bool(b) => TokenKey::Value(ValueKey::Bool(*b)),
            Token::Noop => TokenKey::Value(ValueKey::Noop),
        }
    }

    fn downgrade(&self) -> Option<WeakToken> {
        match self {
            Token::Generated(g) => Some(WeakToken::Generated(Arc::downgrade(&g.0))),
            Token::Object(o) => Some(WeakToken::Object(Arc::downgrade(&o.0))),
            _ => None,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Generated(g) => write!(f, "Token({})", g.as_u64()),
            Token::Object(o) => write!(f, "Object({:#x})", o.addr()),
            Token::Int(i) => write!(f, "{i}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Noop => write!(f, "Noop"),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::Int(value)
    }
}

impl From<i32> for Token {
    fn from(value: i32) -> Self {
        Token::Int(i64::from(value))
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token::Int(i64::from(value))
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Str(Arc::from(value))
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Str(Arc::from(value))
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

/// Key under which a live token is stored.
///
/// Identity keys are allocation addresses; the live map owns a clone of the
/// token, so the address cannot be reused while the entry exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TokenKey {
    Identity(usize),
    Value(ValueKey),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Int(i64),
    Str(Arc<str>),
    Bool(bool),
    Noop,
}

enum WeakToken {
    Generated(Weak<u64>),
    Object(Weak<dyn Any + Send + Sync>),
}

impl WeakToken {
    fn is_alive(&self) -> bool {
        match self {
            WeakToken::Generated(w) => w.strong_count() > 0,
            WeakToken::Object(w) => w.strong_count() > 0,
        }
    }
}

/// Tokens whose `end_async` already ran.
///
/// Identity tokens are held weakly: an entry only counts while its token is
/// still alive, and dead entries are pruned on insert. A live allocation
/// can't share an address with a dead one, so a live weak entry at an address
/// always belongs to the token being asked about.
#[derive(Default)]
pub(crate) struct CompletedTokens {
    identity: HashMap<usize, WeakToken>,
    values: HashSet<ValueKey>,
}

impl CompletedTokens {
    pub(crate) fn contains(&self, token: &Token) -> bool {
        match token.key() {
            TokenKey::Identity(addr) => self.identity.get(&addr).is_some_and(WeakToken::is_alive),
            TokenKey::Value(key) => self.values.contains(&key),
        }
    }

    pub(crate) fn insert(&mut self, token: &Token) {
        match (token.key(), token.downgrade()) {
            (TokenKey::Identity(addr), Some(weak)) => {
                self.identity.retain(|_, w| w.is_alive());
                self.identity.insert(addr, weak);
            }
            (TokenKey::Value(key), _) => {
                self.values.insert(key);
            }
            (TokenKey::Identity(_), None) => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn identity_len(&self) -> usize {
        self.identity.len()
    }
}
