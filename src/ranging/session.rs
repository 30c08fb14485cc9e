//! Ranging engine capability

use thiserror::Error;

/// Why a configuration blob was rejected.
///
/// Display strings are embedded in the user-facing error status, so they
/// read as plain phrases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("configuration data is empty")]
    EmptyConfiguration,

    #[error("configuration data is truncated ({0} bytes)")]
    TruncatedConfiguration(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Entry point to the platform ranging capability.
///
/// One engine outlives many sessions: a session that has been invalidated
/// cannot be reused, so the manager asks for a fresh one.
pub trait RangingEngine: Send {
    /// Whether device-to-accessory ranging is available at all
    fn is_supported(&self) -> bool;

    /// Construct a fresh, not-yet-started session
    fn create_session(&mut self) -> Box<dyn AccessorySession>;
}

/// One ranging session with a single accessory.
///
/// Engine-side happenings (shareable configuration bytes, measurement
/// updates, suspension, invalidation) are delivered separately as
/// [`SessionEvent`](super::events::SessionEvent)s.
pub trait AccessorySession: Send {
    /// Parse the accessory configuration blob and start ranging
    fn run(&mut self, config: &[u8]) -> Result<(), SessionError>;

    /// Tear the session down; it cannot be run again afterwards
    fn invalidate(&mut self);

    /// True between a successful [`run`](Self::run) and invalidation
    fn is_running(&self) -> bool;
}
