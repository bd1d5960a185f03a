//! Broker tuning options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use device_session_broker::{BrokerOptions, DisconnectPolicy};
//!
//! let options = BrokerOptions::new()
//!     .with_listen_interval(Duration::from_millis(250))
//!     .with_listen_max_iterations(120)
//!     .with_disconnect_policy(DisconnectPolicy::AutoRelease);
//! ```

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default number of enumerations per `listen` call.
pub const DEFAULT_LISTEN_MAX_ITERATIONS: u32 = 60;

/// Default delay between enumerations in `listen`.
pub const DEFAULT_LISTEN_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// DisconnectPolicy
// ============================================================================

/// What enumerate does with sessions whose device disappeared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// Keep the session registered until it is released or re-acquired.
    #[default]
    Retain,

    /// Release the session in the same critical section.
    ///
    /// The transport disconnect is attempted but its failure is ignored,
    /// since the device is already gone.
    AutoRelease,
}

// ============================================================================
// BrokerOptions
// ============================================================================

/// Broker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerOptions {
    /// Maximum enumerations in one `listen` call before it returns anyway.
    pub listen_max_iterations: u32,

    /// Delay between enumerations in `listen`.
    pub listen_interval: Duration,

    /// Handling of sessions on vanished devices.
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BrokerOptions {
    /// Creates options with default settings.
    ///
    /// `listen` polls every 500 ms for up to 60 rounds (~30 s), and sessions
    /// on vanished devices are retained.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listen_max_iterations: DEFAULT_LISTEN_MAX_ITERATIONS,
            listen_interval: DEFAULT_LISTEN_INTERVAL,
            disconnect_policy: DisconnectPolicy::Retain,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BrokerOptions {
    /// Sets the maximum enumerations per `listen` call.
    #[inline]
    #[must_use]
    pub fn with_listen_max_iterations(mut self, iterations: u32) -> Self {
        self.listen_max_iterations = iterations;
        self
    }

    /// Sets the delay between enumerations in `listen`.
    #[inline]
    #[must_use]
    pub fn with_listen_interval(mut self, interval: Duration) -> Self {
        self.listen_interval = interval;
        self
    }

    /// Sets the handling of sessions on vanished devices.
    #[inline]
    #[must_use]
    pub fn with_disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.disconnect_policy = policy;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl BrokerOptions {
    /// Returns the longest time one `listen` call can take, ignoring
    /// enumeration latency.
    #[inline]
    #[must_use]
    pub fn listen_window(&self) -> Duration {
        self.listen_interval
            .saturating_mul(self.listen_max_iterations.saturating_sub(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
