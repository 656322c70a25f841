//! The frame relay state machine.

/// The relay itself.
pub mod frame_relay;
/// Relay configuration.
pub mod opts;
/// Relay bookkeeping, snapshot and counters.
pub mod state;
