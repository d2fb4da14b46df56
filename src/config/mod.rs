//! Selection between tracking and no-op waiters.
//!
//! The mode is resolved once per process and cached:
//!
//! 1. With the `noop` cargo feature every waiter is a [`NoopWaiter`].
//! 2. Otherwise `TEST_WAITERS_MODE` (`tracking`, `debug`, `1`, `true` or
//!    `noop`, `production`, `0`, `false`) decides.
//! 3. Otherwise debug builds track and release builds don't.
//!
//! [`NoopWaiter`]: crate::waiter::NoopWaiter
//!
//! # Example
//!
//! ```rust
//! use test_waiters::config::{WaiterConfig, WaiterMode};
//!
//! let config = WaiterConfig::new().noop();
//! assert_eq!(config.mode, WaiterMode::Noop);
//! assert!(!config.is_tracking());
//! ```

use std::fmt;
use std::sync::OnceLock;

/// Environment variable consulted by [`WaiterConfig::from_env`].
pub const MODE_ENV_VAR: &str = "TEST_WAITERS_MODE";

/// Which waiter implementation [`build_waiter`](crate::build_waiter) hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaiterMode {
    /// Real bookkeeping; waiters register with a registry.
    Tracking,
    /// No bookkeeping; waiters always report idle.
    Noop,
}

impl WaiterMode {
    /// Parses an environment value. Returns `None` for unrecognised input.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tracking" | "debug" | "1" | "true" => Some(Self::Tracking),
            "noop" | "production" | "0" | "false" => Some(Self::Noop),
            _ => None,
        }
    }

    /// The mode implied by the build profile.
    #[must_use]
    pub fn for_build() -> Self {
        if cfg!(feature = "noop") || !cfg!(debug_assertions) {
            Self::Noop
        } else {
            Self::Tracking
        }
    }
}

impl fmt::Display for WaiterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaiterMode::Tracking => write!(f, "tracking"),
            WaiterMode::Noop => write!(f, "noop"),
        }
    }
}

/// Waiter construction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterConfig {
    /// Selected implementation.
    pub mode: WaiterMode,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            mode: WaiterMode::for_build(),
        }
    }
}

impl WaiterConfig {
    /// Create a configuration for the current build profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out tracking waiters.
    ///
    /// Has no effect when the crate is compiled with the `noop` feature.
    #[must_use]
    pub fn tracking(mut self) -> Self {
        if !cfg!(feature = "noop") {
            self.mode = WaiterMode::Tracking;
        }
        self
    }

    /// Hand out no-op waiters.
    #[must_use]
    pub fn noop(mut self) -> Self {
        self.mode = WaiterMode::Noop;
        self
    }

    /// Resolve the configuration from the build profile and
    /// [`MODE_ENV_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::new();
        if cfg!(feature = "noop") {
            return config;
        }

        match std::env::var(MODE_ENV_VAR) {
            Ok(value) => match WaiterMode::parse(&value) {
                Some(WaiterMode::Tracking) => config.tracking(),
                Some(WaiterMode::Noop) => config.noop(),
                None => {
                    tracing::warn!(
                        var = MODE_ENV_VAR,
                        value = %value,
                        "ignoring unrecognised waiter mode"
                    );
                    config
                }
            },
            Err(_) => config,
        }
    }

    /// The process-wide configuration, resolved on first use.
    pub fn global() -> &'static WaiterConfig {
        static GLOBAL: OnceLock<WaiterConfig> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = Self::from_env();
            tracing::debug!(mode = %config.mode, "resolved waiter mode");
            config
        })
    }

    /// Whether waiters built with this configuration track tokens.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.mode == WaiterMode::Tracking
    }
}
