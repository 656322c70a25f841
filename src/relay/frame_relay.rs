use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::foundation::core::{
    Generation, InstanceId, PixelSize, ResourceToken, RoutingId, SyncToken,
};
use crate::foundation::error::RelayResult;
use crate::frame::buffer::{BufferDescriptor, BufferKind};
use crate::frame::compositor_frame::{
    CompositorFrame, DelegatedFrameData, FramePayload, PlaneData, RenderPass, ReturnedResource,
};
use crate::layer::memory::InMemoryLayerTree;
use crate::layer::tree::{LayerId, LayerKind, LayerTree, ReleaseCallback, TextureMailbox};
use crate::relay::opts::RelayOpts;
use crate::relay::state::{LayerSlot, RelaySnapshot, RelayState, RelayStats};
use crate::transport::message::{FrameAck, MessageHeader, RelayMessage};
use crate::transport::sink::AckSink;

/// Relays buffers from a guest producer into the embedder's layer tree and runs the
/// acknowledgment protocol back to the producer.
///
/// The relay owns a root holder layer plus at most one content layer: either a texture layer
/// (texture-backed swaps and single-plane frames) or a delegated layer (multi-resource frames).
/// Switching between them destroys the old one first.
///
/// Protocol:
///
/// - every swap makes one acknowledgment owed (`ack_pending`); it is settled either by the
///   release of the buffer the swap displaced, by a forced empty release when there is nothing to
///   displace, or, for delegated frames, by [`FrameRelay::did_commit_frame`]
/// - a change of producer [`Generation`] abandons everything handed out before it; releases
///   addressed to an old generation are dropped
/// - lost resources are acknowledged as empty and never handed back as reusable
///
/// All state lives on one execution context. Release callbacks installed on the texture layer
/// hold only a weak handle to the relay and the id of the layer they were installed on. They go
/// quiet once the relay is dropped or the container is destroyed; buffers released by a layer
/// retired in a mode switch are handed back without settling the pending acknowledgment.
///
/// Methods borrow the relay's interior mutably. Calling back into the relay from a
/// [`FrameRelay::with_layer_tree`] / [`FrameRelay::with_sink`] closure panics.
pub struct FrameRelay<L: LayerTree + 'static, S: AckSink + 'static> {
    core: Rc<RefCell<RelayCore<L, S>>>,
}

struct RelayCore<L, S> {
    this: Weak<RefCell<RelayCore<L, S>>>,
    instance_id: InstanceId,
    host_routing_id: RoutingId,
    opts: RelayOpts,
    tree: L,
    sink: S,
    holder: Option<LayerId>,
    slot: LayerSlot,
    compositing_enabled: bool,
    torn_down: bool,
    state: RelayState,
    stats: RelayStats,
}

impl<L: LayerTree + 'static, S: AckSink + 'static> FrameRelay<L, S> {
    /// Create a relay for one guest surface. No layers exist until compositing is enabled.
    pub fn new(
        instance_id: InstanceId,
        host_routing_id: RoutingId,
        tree: L,
        sink: S,
        opts: RelayOpts,
    ) -> Self {
        let core = Rc::new_cyclic(|this| {
            RefCell::new(RelayCore {
                this: this.clone(),
                instance_id,
                host_routing_id,
                opts,
                tree,
                sink,
                holder: None,
                slot: LayerSlot::Empty,
                compositing_enabled: false,
                torn_down: false,
                state: RelayState::default(),
                stats: RelayStats::default(),
            })
        });
        Self { core }
    }

    /// Instance id stamped on outbound messages.
    pub fn instance_id(&self) -> InstanceId {
        self.core.borrow().instance_id
    }

    /// Bind (`true`) or unbind (`false`) the root holder to the container.
    ///
    /// The holder is created on the first enable. Disabling leaves existing layers alive.
    #[tracing::instrument(skip(self))]
    pub fn enable_compositing(&self, enable: bool) {
        self.core.borrow_mut().enable_compositing(enable);
    }

    /// `BuffersSwapped`: a texture-backed buffer arrived.
    #[tracing::instrument(skip(self, resource))]
    pub fn on_buffers_swapped(
        &self,
        pixel_size: PixelSize,
        resource: ResourceToken,
        generation: Generation,
        device_scale_factor: f32,
    ) {
        let desc =
            BufferDescriptor::texture(pixel_size, resource, generation, device_scale_factor);
        self.core.borrow_mut().swap_buffer(desc);
    }

    /// `CompositorFrameSwapped`: a single-plane or delegated frame arrived.
    ///
    /// Returns [`crate::RelayError::MalformedFrame`] for a frame carrying neither; nothing is
    /// mutated and nothing is acknowledged in that case.
    #[tracing::instrument(skip(self, frame))]
    pub fn on_compositor_frame_swapped(
        &self,
        frame: CompositorFrame,
        generation: Generation,
    ) -> RelayResult<()> {
        self.core.borrow_mut().swap_frame(frame, generation)
    }

    /// The compositor consumed the attached delegated frame: return the resources it no longer
    /// references in one acknowledgment.
    #[tracing::instrument(skip(self))]
    pub fn did_commit_frame(&self) {
        self.core.borrow_mut().did_commit_frame();
    }

    /// A buffer handed out by the texture path is no longer used by the compositor.
    ///
    /// Release callbacks route here; hosts that track releases themselves may call it directly.
    #[tracing::instrument(skip(self))]
    pub fn on_resource_released(&self, desc: &BufferDescriptor, sync_token: SyncToken, lost: bool) {
        self.core
            .borrow_mut()
            .on_resource_released(desc, sync_token, lost);
    }

    /// The container is going away: unbind and drop every layer. No acknowledgments are sent
    /// for buffers that were in flight.
    #[tracing::instrument(skip(self))]
    pub fn on_container_destroy(&self) {
        self.core.borrow_mut().on_container_destroy();
    }

    /// Visibility hint: toggles whether the content layer draws.
    #[tracing::instrument(skip(self))]
    pub fn update_visibility(&self, visible: bool) {
        let mut core = self.core.borrow_mut();
        let layer = core.slot.layer();
        if let Some(layer) = layer {
            core.tree.set_drawable(layer, visible);
        }
    }

    /// Copy of the protocol bookkeeping.
    pub fn snapshot(&self) -> RelaySnapshot {
        let core = self.core.borrow();
        RelaySnapshot {
            last_generation: core.state.last_generation,
            last_resource_valid: core.state.last_resource_valid,
            ack_pending: core.state.ack_pending,
            buffer_size: core.state.buffer_size,
            slot: core.slot.kind(),
            compositing_enabled: core.compositing_enabled,
            torn_down: core.torn_down,
        }
    }

    /// Event counters.
    pub fn stats(&self) -> RelayStats {
        self.core.borrow().stats
    }

    /// The root holder layer.
    pub fn root_layer(&self) -> Option<LayerId> {
        self.core.borrow().holder
    }

    /// The texture layer, when in texture mode.
    pub fn texture_layer(&self) -> Option<LayerId> {
        match self.core.borrow().slot {
            LayerSlot::TextureBacked(id) => Some(id),
            _ => None,
        }
    }

    /// The delegated layer, when in delegated mode.
    pub fn delegated_layer(&self) -> Option<LayerId> {
        match self.core.borrow().slot {
            LayerSlot::Delegated(id) => Some(id),
            _ => None,
        }
    }

    /// Run `f` against the layer tree.
    pub fn with_layer_tree<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut self.core.borrow_mut().tree)
    }

    /// Run `f` against the outbound sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.core.borrow_mut().sink)
    }
}

impl<S: AckSink + 'static> FrameRelay<InMemoryLayerTree, S> {
    /// Release every mailbox the in-memory tree has queued (displaced or orphaned), as the
    /// compositor does after drawing. Returns how many were released.
    pub fn release_displaced(&self, sync_token: SyncToken, lost: bool) -> usize {
        let mailboxes = self.with_layer_tree(InMemoryLayerTree::take_released);
        let n = mailboxes.len();
        for mailbox in mailboxes {
            mailbox.release(sync_token, lost);
        }
        n
    }

    /// Evict and release the mailbox the texture layer is currently drawing.
    /// Returns `false` when there was none.
    pub fn release_current(&self, sync_token: SyncToken, lost: bool) -> bool {
        let mailbox = {
            let mut core = self.core.borrow_mut();
            let slot = core.slot;
            match slot {
                LayerSlot::TextureBacked(layer) => core.tree.take_mailbox(layer),
                _ => None,
            }
        };
        match mailbox {
            Some(mailbox) => {
                mailbox.release(sync_token, lost);
                true
            }
            None => false,
        }
    }
}

impl<L: LayerTree + 'static, S: AckSink + 'static> RelayCore<L, S> {
    fn header(&self, generation: Generation) -> MessageHeader {
        MessageHeader {
            host_routing_id: self.host_routing_id,
            instance_id: self.instance_id,
            generation,
        }
    }

    fn send(&mut self, msg: RelayMessage) {
        let is_frame_ack = matches!(msg, RelayMessage::FrameAcknowledged { .. });
        match self.sink.send(msg) {
            Ok(()) if is_frame_ack => self.stats.frame_acks_sent += 1,
            Ok(()) => self.stats.resource_acks_sent += 1,
            Err(err) => {
                self.stats.failed_sends += 1;
                tracing::warn!(
                    instance = self.instance_id.0,
                    error = %err,
                    "acknowledgment dropped by transport"
                );
            }
        }
    }

    fn enable_compositing(&mut self, enable: bool) {
        if self.torn_down {
            tracing::debug!(instance = self.instance_id.0, "container destroyed; ignoring");
            return;
        }
        if enable && self.holder.is_none() {
            let holder = self.tree.create_layer(LayerKind::Holder);
            self.tree.set_background(holder, self.opts.background);
            self.tree.set_masks_to_bounds(holder, self.opts.masks_to_bounds);
            self.holder = Some(holder);
        }
        self.compositing_enabled = enable;
        self.tree
            .set_container_layer(if enable { self.holder } else { None });
    }

    fn note_generation(&mut self, generation: Generation) {
        if self.state.last_generation != Some(generation) {
            tracing::debug!(
                instance = self.instance_id.0,
                from = ?self.state.last_generation,
                to = %generation,
                "producer generation changed"
            );
            self.state.last_resource_valid = false;
        }
        self.state.last_generation = Some(generation);
    }

    fn swap_buffer(&mut self, desc: BufferDescriptor) {
        self.stats.buffers_swapped += 1;
        self.note_generation(desc.generation());
        self.state.ack_pending = true;

        let Some(holder) = self.holder else {
            tracing::debug!(
                instance = self.instance_id.0,
                "no root layer; acknowledging swap immediately"
            );
            self.on_resource_released(&desc, desc.sync_token(), false);
            return;
        };

        let layer = self.ensure_texture_layer(holder);
        // Bounds follow the buffer, not the container: while a resize is in flight the old-size
        // buffers are cropped or letterboxed instead of stretched.
        self.adjust_bounds(layer, desc.pixel_size(), desc.device_scale_factor());

        let current_valid = desc.has_resource();
        if !self.state.last_resource_valid {
            // Nothing the producer is owed will be displaced; settle this swap now.
            self.stats.forced_releases += 1;
            self.on_resource_released(&desc.emptied(), SyncToken::NONE, false);
            if !current_valid {
                return;
            }
        }

        let release = current_valid.then(|| self.release_callback(layer, desc.clone()));
        self.tree.set_texture_mailbox(
            layer,
            TextureMailbox {
                resource: desc.resource().clone(),
                sync_token: desc.sync_token(),
                release,
            },
        );
        self.tree.set_needs_display(layer);
        self.state.last_resource_valid = current_valid;
    }

    fn swap_frame(&mut self, frame: CompositorFrame, generation: Generation) -> RelayResult<()> {
        if let Err(err) = frame.validate() {
            self.stats.malformed_frames += 1;
            tracing::warn!(
                instance = self.instance_id.0,
                generation = %generation,
                error = %err,
                "dropping compositor frame"
            );
            return Err(err);
        }

        let scale = frame.metadata.device_scale_factor;
        match frame.payload {
            Some(FramePayload::SinglePlane(plane)) => {
                self.swap_buffer(BufferDescriptor::new(
                    BufferKind::DelegatedFrame,
                    plane.resource,
                    plane.size,
                    generation,
                    plane.sync_token,
                    scale,
                ));
            }
            Some(FramePayload::Delegated(data)) => self.swap_delegated(data, scale, generation),
            // Rejected by `validate`.
            None => {}
        }
        Ok(())
    }

    fn swap_delegated(&mut self, data: DelegatedFrameData, scale: f32, generation: Generation) {
        self.stats.frames_swapped += 1;
        let generation_changed = self.state.last_generation != Some(generation);
        self.note_generation(generation);

        let Some(holder) = self.holder else {
            tracing::debug!(
                instance = self.instance_id.0,
                "no root layer; returning frame resources immediately"
            );
            let resources = data
                .resources
                .iter()
                .map(|r| ReturnedResource::unused(r.id))
                .collect();
            self.state.ack_pending = false;
            self.send(RelayMessage::FrameAcknowledged {
                header: self.header(generation),
                ack: FrameAck {
                    resources,
                    plane: None,
                },
            });
            return;
        };

        if generation_changed && matches!(self.slot, LayerSlot::Delegated(_)) {
            let dropped = self.detach_slot();
            tracing::debug!(
                instance = self.instance_id.0,
                dropped = dropped.len(),
                "discarding delegated resources of a dead generation"
            );
        }
        let layer = self.ensure_delegated_layer(holder);

        let root_size = data
            .root_pass()
            .map(RenderPass::output_size)
            .unwrap_or_default();
        self.adjust_bounds(layer, root_size, scale);
        self.tree.set_frame_data(layer, data);

        self.state.frame_generation = Some(generation);
        self.state.ack_pending = true;
    }

    fn did_commit_frame(&mut self) {
        let LayerSlot::Delegated(layer) = self.slot else {
            return;
        };
        if !self.state.ack_pending {
            return;
        }
        let Some(generation) = self.state.last_generation else {
            return;
        };

        let mut resources = self.take_parked(generation);
        resources.extend(self.tree.take_unused_resources(layer));
        self.state.ack_pending = false;
        self.send(RelayMessage::FrameAcknowledged {
            header: self.header(generation),
            ack: FrameAck {
                resources,
                plane: None,
            },
        });
    }

    fn on_resource_released(&mut self, desc: &BufferDescriptor, sync_token: SyncToken, lost: bool) {
        if lost {
            self.stats.lost_resources += 1;
            tracing::debug!(
                instance = self.instance_id.0,
                generation = %desc.generation(),
                "resource lost; acknowledging as empty"
            );
            self.on_resource_released(&desc.emptied(), SyncToken::NONE, false);
            // A lost buffer can no longer be displaced by the next swap.
            if self.state.last_generation == Some(desc.generation()) {
                self.state.last_resource_valid = false;
            }
            return;
        }

        let generation = desc.generation();
        if self.state.last_generation != Some(generation) {
            self.stats.stale_releases += 1;
            tracing::debug!(
                instance = self.instance_id.0,
                generation = %generation,
                "release for a superseded generation dropped"
            );
            return;
        }

        if !self.state.ack_pending {
            self.stats.late_releases += 1;
            self.state.last_resource_valid = false;
            return;
        }
        self.state.ack_pending = false;

        let resources = match desc.kind() {
            BufferKind::TextureBacked => Vec::new(),
            BufferKind::DelegatedFrame => self.take_parked(generation),
        };
        let msg = self.release_message(desc, sync_token, resources);
        self.send(msg);
    }

    /// Acknowledgment handing `desc` back, tagged by the transport it arrived through.
    fn release_message(
        &self,
        desc: &BufferDescriptor,
        sync_token: SyncToken,
        resources: Vec<ReturnedResource>,
    ) -> RelayMessage {
        let header = self.header(desc.generation());
        match desc.kind() {
            BufferKind::TextureBacked => RelayMessage::ResourceAcknowledged {
                header,
                resource: desc.resource().clone(),
                sync_token,
            },
            BufferKind::DelegatedFrame => RelayMessage::FrameAcknowledged {
                header,
                ack: FrameAck {
                    resources,
                    plane: Some(PlaneData {
                        resource: desc.resource().clone(),
                        size: desc.pixel_size(),
                        sync_token,
                    }),
                },
            },
        }
    }

    /// A texture layer replaced by a mode switch let go of a buffer. Hand it back; the pending
    /// acknowledgment belongs to the delegated frame and is left alone.
    fn return_retired(&mut self, desc: &BufferDescriptor, sync_token: SyncToken, lost: bool) {
        if self.state.last_generation != Some(desc.generation()) {
            self.stats.stale_releases += 1;
            return;
        }
        if lost {
            self.stats.lost_resources += 1;
            return;
        }
        self.stats.retired_returns += 1;
        let msg = self.release_message(desc, sync_token, Vec::new());
        self.send(msg);
    }

    fn release_from_layer(
        &mut self,
        layer: LayerId,
        desc: &BufferDescriptor,
        sync_token: SyncToken,
        lost: bool,
    ) {
        if self.torn_down {
            self.stats.retired_releases += 1;
            tracing::debug!(
                instance = self.instance_id.0,
                layer = layer.0,
                "release after container destroy dropped"
            );
            return;
        }
        if self.slot != LayerSlot::TextureBacked(layer) {
            tracing::debug!(
                instance = self.instance_id.0,
                layer = layer.0,
                "release from a retired texture layer"
            );
            self.return_retired(desc, sync_token, lost);
            return;
        }
        self.on_resource_released(desc, sync_token, lost);
    }

    fn on_container_destroy(&mut self) {
        if self.torn_down {
            return;
        }
        self.tree.set_container_layer(None);
        if let Some(holder) = self.holder.take() {
            self.tree.destroy_layer(holder);
        }
        let dropped = self.detach_slot();
        if !dropped.is_empty() {
            tracing::debug!(
                instance = self.instance_id.0,
                dropped = dropped.len(),
                "delegated resources dropped with the container"
            );
        }

        self.torn_down = true;
        self.compositing_enabled = false;
        self.state.ack_pending = false;
        self.state.last_resource_valid = false;
        self.state.frame_generation = None;
        self.state.parked_returns.clear();
        self.state.parked_generation = None;
    }

    fn release_callback(&self, layer: LayerId, desc: BufferDescriptor) -> ReleaseCallback {
        let relay = self.this.clone();
        ReleaseCallback::new(move |sync_token, lost| {
            let Some(core) = relay.upgrade() else {
                tracing::debug!("relay dropped before release");
                return;
            };
            match core.try_borrow_mut() {
                Ok(mut core) => core.release_from_layer(layer, &desc, sync_token, lost),
                Err(_) => tracing::warn!(
                    layer = layer.0,
                    "release callback ran re-entrantly inside a relay call; dropped"
                ),
            };
        })
    }

    fn ensure_texture_layer(&mut self, holder: LayerId) -> LayerId {
        if let LayerSlot::TextureBacked(layer) = self.slot {
            return layer;
        }
        if matches!(self.slot, LayerSlot::Delegated(_)) {
            tracing::debug!(instance = self.instance_id.0, "switching to texture mode");
            let returned = self.detach_slot();
            let generation = self.state.frame_generation.take();
            self.park_returns(generation, returned);
        }
        let layer = self.attach_content_layer(holder, LayerKind::Texture);
        self.slot = LayerSlot::TextureBacked(layer);
        // A fresh layer displays nothing, so no release will settle the next swap.
        self.state.last_resource_valid = false;
        layer
    }

    fn ensure_delegated_layer(&mut self, holder: LayerId) -> LayerId {
        if let LayerSlot::Delegated(layer) = self.slot {
            return layer;
        }
        if matches!(self.slot, LayerSlot::TextureBacked(_)) {
            tracing::debug!(instance = self.instance_id.0, "switching to delegated mode");
            self.detach_slot();
            self.state.last_resource_valid = false;
        }
        let layer = self.attach_content_layer(holder, LayerKind::Delegated);
        self.slot = LayerSlot::Delegated(layer);
        layer
    }

    fn attach_content_layer(&mut self, holder: LayerId, kind: LayerKind) -> LayerId {
        let layer = self.tree.create_layer(kind);
        self.tree.set_drawable(layer, true);
        self.tree
            .set_contents_opaque(layer, self.opts.contents_opaque);
        self.tree.add_child(holder, layer);
        if self.opts.reset_bounds_on_mode_switch {
            self.state.buffer_size = PixelSize::ZERO;
        }
        layer
    }

    /// Detach and destroy the content layer, returning delegated resources it still held.
    fn detach_slot(&mut self) -> Vec<ReturnedResource> {
        let Some(layer) = std::mem::take(&mut self.slot).layer() else {
            return Vec::new();
        };
        self.tree.remove_from_parent(layer);
        self.tree.destroy_layer(layer)
    }

    fn adjust_bounds(&mut self, layer: LayerId, size: PixelSize, scale: f32) {
        if self.state.buffer_size == size {
            return;
        }
        self.state.buffer_size = size;
        self.tree.set_bounds(layer, size.to_dip_floor(scale));
        self.stats.bounds_updates += 1;
    }

    fn park_returns(&mut self, generation: Option<Generation>, returned: Vec<ReturnedResource>) {
        let Some(generation) = generation else {
            return;
        };
        if returned.is_empty() {
            return;
        }
        if self.state.parked_generation != Some(generation) {
            self.state.parked_returns.clear();
            self.state.parked_generation = Some(generation);
        }
        self.state.parked_returns.extend(returned);
    }

    fn take_parked(&mut self, generation: Generation) -> Vec<ReturnedResource> {
        let parked = std::mem::take(&mut self.state.parked_returns);
        if self.state.parked_generation.take() == Some(generation) {
            parked
        } else {
            if !parked.is_empty() {
                tracing::debug!(
                    instance = self.instance_id.0,
                    dropped = parked.len(),
                    "discarding parked resources of a dead generation"
                );
            }
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/relay/frame_relay.rs"]
mod tests;
