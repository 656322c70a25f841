//! Cross-process compositor frame relay.
//!
//! A guest producer (renderer) draws into GPU buffers and announces each one with a swap
//! message. The relay, living in the embedder, attaches those buffers to the embedder's layer
//! tree and tells the producer when each buffer may be reused.
//!
//! # Flow
//!
//! 1. **Swap**: `BuffersSwapped` / `CompositorFrameSwapped` arrive from the producer
//!    ([`FrameRelay::on_buffers_swapped`], [`FrameRelay::on_compositor_frame_swapped`])
//! 2. **Attach**: the buffer is installed on a texture layer, or the frame on a delegated layer,
//!    under a root holder bound to the container
//! 3. **Release**: the compositor stops using a texture ([`ReleaseCallback`]) or commits a
//!    delegated frame ([`FrameRelay::did_commit_frame`])
//! 4. **Acknowledge**: exactly one [`RelayMessage`] per swap goes back through the [`AckSink`]
//!
//! The key invariants:
//!
//! - **One outstanding acknowledgment** per relay at any time.
//! - **Generations**: a new `(route id, host id)` pair abandons everything handed out before it;
//!   releases addressed to the old pair are dropped silently.
//! - **Exclusive modes**: the texture and delegated layers never coexist.
//! - **Pixel-exact resize**: layer bounds change only when a buffer of a new size arrives.
//!
//! The transport, the compositor and the host container are collaborators behind the
//! [`AckSink`] and [`LayerTree`] traits. In-memory implementations ship for tests and for the
//! `frame-relay` replay tool.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Inbound buffer and frame payloads.
pub mod frame;
/// Layer-tree collaborator.
pub mod layer;
/// The relay state machine.
pub mod relay;
/// JSON event replay.
pub mod replay;
/// Outbound acknowledgments.
pub mod transport;

pub use crate::foundation::core::{
    DipSize, Generation, HostId, InstanceId, PixelSize, ResourceToken, Rgba8Premul, RouteId,
    RoutingId, SyncToken, sanitize_scale,
};
pub use crate::foundation::error::{RelayError, RelayResult};

pub use crate::frame::buffer::{BufferDescriptor, BufferKind};
pub use crate::frame::compositor_frame::{
    CompositorFrame, DelegatedFrameData, FrameMetadata, FramePayload, PlaneData, RenderPass,
    ResourceId, ReturnedResource, TransferableResource,
};
pub use crate::layer::memory::{InMemoryLayerTree, LayerNode};
pub use crate::layer::tree::{LayerId, LayerKind, LayerTree, ReleaseCallback, TextureMailbox};
pub use crate::relay::frame_relay::FrameRelay;
pub use crate::relay::opts::RelayOpts;
pub use crate::relay::state::{RelaySnapshot, RelayStats, SlotKind};
pub use crate::replay::script::{
    ReplayEvent, ReplayEventError, ReplayReport, ReplayScript, replay,
};
pub use crate::transport::message::{FrameAck, MessageHeader, RelayMessage};
pub use crate::transport::sink::{AckSink, InMemoryAckSink};
