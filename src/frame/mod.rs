//! Inbound payloads: buffer descriptors and compositor frames.

/// Per-swap buffer descriptors.
pub mod buffer;
/// Compositor frames (single-plane or delegated).
pub mod compositor_frame;
