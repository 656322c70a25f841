//! Outbound acknowledgments and the channel that carries them.
//!
//! The channel is fire-and-forget: `send` never blocks, and delivery order per generation is
//! the channel's responsibility.

/// Outbound message types.
pub mod message;
/// Sink trait and the in-memory sink.
pub mod sink;
