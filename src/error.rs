//! # Error Types
//!
//! Failure kinds for the simulator core. The library reports errors through
//! a single typed enum so callers can distinguish a driver bug (an address
//! outside the configured range) from resource exhaustion (no free blocks
//! even after garbage collection) from a simulated hardware fault.
//!
//! ## Propagation Policy
//!
//! The core never retries. A failed event is returned to the driver with
//! the matching failure counter incremented in [`crate::Stats`]; any mapping
//! mutation performed before a device failure is rolled back by the FTL
//! engine before the error propagates.

use thiserror::Error;

/// Result alias used throughout the simulator core.
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// The logical address exceeds the addressable range. Driver bug;
    /// fatal to the event.
    #[error("logical page {lpn} outside addressable range of {limit} pages")]
    InvalidLpn { lpn: u64, limit: u64 },

    /// The free-block pool is empty and garbage collection could not
    /// reclaim anything.
    #[error("no free blocks available after garbage collection")]
    OutOfBlocks,

    /// A primitive physical event failed inside the device model.
    #[error("device failure: {0}")]
    DeviceFailure(String),

    /// Malformed or inconsistent configuration.
    #[error("config error: {0}")]
    Config(String),
}
