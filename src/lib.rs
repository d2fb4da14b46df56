//! # test-waiters
//!
//! > Know when async work has settled before you assert
//!
//! **test-waiters** lets application code mark async operations as in flight
//! so a test harness can wait until nothing is pending. Each concern gets a
//! named [`Waiter`]; every waiter reports to a [`WaiterRegistry`] that
//! aggregates their state.
//!
//! ## Quick Start
//!
//! ```rust
//! use test_waiters::prelude::*;
//!
//! let waiter = build_waiter("friend-waiter");
//!
//! let token = waiter.begin_async(None, Some("load friends")).unwrap();
//! // Start the async work; from its completion callback:
//! waiter.end_async(&token).unwrap();
//!
//! assert!(waiter.wait_until());
//! ```
//!
//! ## Features
//!
//! - **Tracking waiters** - strict begin/end bookkeeping with diagnostics
//! - **No-op waiters** - zero bookkeeping for release builds (`noop` feature)
//! - **Registry** - one call answers "is anything pending?"
//! - **Legacy bridge** - expose the registry to callback-polling runners
//! - **Test attribute** - `#[test_waiters::test]` fails tests that leave work pending (`macros` feature)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod registry;
pub mod waiter;

/// Prelude for convenient imports
///
/// ```rust
/// use test_waiters::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{WaiterConfig, WaiterMode};
    pub use crate::error::{Error, Result};
    pub use crate::registry::{PendingWaiterState, WaiterDebugInfo, WaiterRegistry};
    pub use crate::waiter::{
        build_waiter, build_waiter_with, wait_for_future, NoopWaiter, PendingItem, TestWaiter,
        Token, TokenKind, Waiter,
    };
}

// Re-exports
pub use error::{Error, Result};
pub use registry::{
    get_pending_waiter_state, get_waiters, has_pending_waiters, PendingWaiterState,
    WaiterDebugInfo, WaiterRegistry,
};
pub use waiter::{
    build_waiter, build_waiter_with, wait_for_future, NoopWaiter, PendingItem, TestWaiter, Token,
    TokenKind, WaitForFuture, Waiter,
};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use test_waiters_macros::test;
