//! Re-export of the shared error type used by every port method.
//!
//! Ports return [`moduly_error::Error`] directly rather than defining a
//! parallel `PortsError`: the engine, the sandbox, and the HTTP layer
//! all need to classify the same failure (retryable? fatal? which
//! status code?) regardless of which port produced it, so one taxonomy
//! threaded through every boundary is simpler than converting between
//! two.
pub use moduly_error::Error;

/// Convenience alias used throughout the port traits.
pub type Result<T> = std::result::Result<T, Error>;
