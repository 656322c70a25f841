use crate::foundation::core::{Generation, PixelSize};
use crate::frame::compositor_frame::ReturnedResource;
use crate::layer::tree::LayerId;

/// Which content layer, if any, hangs under the root holder.
///
/// Texture-backed and delegated layers are mutually exclusive by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum LayerSlot {
    #[default]
    Empty,
    TextureBacked(LayerId),
    Delegated(LayerId),
}

impl LayerSlot {
    pub(crate) fn layer(self) -> Option<LayerId> {
        match self {
            Self::Empty => None,
            Self::TextureBacked(id) | Self::Delegated(id) => Some(id),
        }
    }

    pub(crate) fn kind(self) -> SlotKind {
        match self {
            Self::Empty => SlotKind::Empty,
            Self::TextureBacked(_) => SlotKind::TextureBacked,
            Self::Delegated(_) => SlotKind::Delegated,
        }
    }
}

/// Public view of the active content layer kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// No content layer yet (or torn down).
    #[default]
    Empty,
    /// A texture layer is attached.
    TextureBacked,
    /// A delegated-frame layer is attached.
    Delegated,
}

/// Protocol bookkeeping.
#[derive(Clone, Debug, Default)]
pub(crate) struct RelayState {
    /// Generation of the last processed swap; `None` before the first one.
    pub(crate) last_generation: Option<Generation>,
    /// The displayed texture names a real resource the producer is still owed.
    pub(crate) last_resource_valid: bool,
    /// One acknowledgment is owed to the producer.
    pub(crate) ack_pending: bool,
    /// Size of the last buffer that set layer bounds.
    pub(crate) buffer_size: PixelSize,
    /// Generation that supplied the delegated layer's current frame.
    pub(crate) frame_generation: Option<Generation>,
    /// Resources reclaimed from a retired delegated layer, returned with the next frame ack.
    pub(crate) parked_returns: Vec<ReturnedResource>,
    pub(crate) parked_generation: Option<Generation>,
}

/// Point-in-time copy of the relay's bookkeeping.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RelaySnapshot {
    /// Generation of the last processed swap.
    pub last_generation: Option<Generation>,
    /// Whether the displayed texture names a real resource.
    pub last_resource_valid: bool,
    /// Whether an acknowledgment is outstanding.
    pub ack_pending: bool,
    /// Size of the last buffer that set layer bounds.
    pub buffer_size: PixelSize,
    /// Active content layer kind.
    pub slot: SlotKind,
    /// Whether the holder is bound to the container.
    pub compositing_enabled: bool,
    /// Whether the container has been destroyed.
    pub torn_down: bool,
}

/// Monotonic counters of protocol events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RelayStats {
    /// Texture-path swaps processed (including single-plane frames).
    pub buffers_swapped: u64,
    /// Delegated frames accepted.
    pub frames_swapped: u64,
    /// Frames rejected as malformed.
    pub malformed_frames: u64,
    /// `ResourceAcknowledged` messages handed to the sink.
    pub resource_acks_sent: u64,
    /// `FrameAcknowledged` messages handed to the sink.
    pub frame_acks_sent: u64,
    /// Empty releases synthesized for a fresh or invalidated generation.
    pub forced_releases: u64,
    /// Releases dropped because their generation was superseded.
    pub stale_releases: u64,
    /// Releases that arrived with no acknowledgment pending.
    pub late_releases: u64,
    /// Releases reporting a lost resource.
    pub lost_resources: u64,
    /// Release callbacks that fired after the container was destroyed.
    pub retired_releases: u64,
    /// Buffers handed back after their texture layer was replaced by a mode switch.
    pub retired_returns: u64,
    /// Messages the sink refused.
    pub failed_sends: u64,
    /// Layer bounds mutations.
    pub bounds_updates: u64,
}
