use std::collections::BTreeMap;

use crate::foundation::core::{DipSize, Rgba8Premul};
use crate::frame::compositor_frame::{DelegatedFrameData, ReturnedResource};
use crate::layer::tree::{LayerId, LayerKind, LayerTree, TextureMailbox};

/// Observable state of one in-memory layer.
#[derive(Debug)]
pub struct LayerNode {
    /// Layer kind.
    pub kind: LayerKind,
    /// Parent layer, if attached.
    pub parent: Option<LayerId>,
    /// Children in insertion order.
    pub children: Vec<LayerId>,
    /// Whether the layer draws.
    pub drawable: bool,
    /// Whether contents are declared opaque.
    pub contents_opaque: bool,
    /// Whether descendants are clipped to bounds.
    pub masks_to_bounds: bool,
    /// Solid background colour.
    pub background: Option<Rgba8Premul>,
    /// Logical bounds.
    pub bounds: DipSize,
    /// Number of `set_bounds` calls received.
    pub bounds_updates: u32,
    /// Installed texture (texture layers only).
    pub mailbox: Option<TextureMailbox>,
    /// Redraw requests received.
    pub display_requests: u32,
    /// Current delegated frame (delegated layers only).
    pub frame: Option<DelegatedFrameData>,
    /// Resources dropped by superseded frames, not yet taken.
    pub unused: Vec<ReturnedResource>,
}

impl LayerNode {
    fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            drawable: false,
            contents_opaque: false,
            masks_to_bounds: false,
            background: None,
            bounds: DipSize::default(),
            bounds_updates: 0,
            mailbox: None,
            display_requests: 0,
            frame: None,
            unused: Vec::new(),
        }
    }
}

/// A [`LayerTree`] kept entirely in memory.
///
/// Mailboxes displaced by `set_texture_mailbox` or freed by `destroy_layer` are queued rather than
/// released; drain them with [`InMemoryLayerTree::take_released`] and release them outside any
/// relay call, the way a real compositor releases them after its next draw.
#[derive(Debug, Default)]
pub struct InMemoryLayerTree {
    next_id: u64,
    layers: BTreeMap<LayerId, LayerNode>,
    container: Option<LayerId>,
    released: Vec<TextureMailbox>,
    destroyed: u64,
}

impl InMemoryLayerTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a live layer.
    pub fn layer(&self, id: LayerId) -> Option<&LayerNode> {
        self.layers.get(&id)
    }

    /// Layer currently bound to the container.
    pub fn container_layer(&self) -> Option<LayerId> {
        self.container
    }

    /// Live layers of `kind`, in creation order.
    pub fn layers_of_kind(&self, kind: LayerKind) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Number of live layers.
    pub fn live_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of layers destroyed so far.
    pub fn destroyed_layers(&self) -> u64 {
        self.destroyed
    }

    /// Number of mailboxes waiting to be released.
    pub fn pending_releases(&self) -> usize {
        self.released.len()
    }

    /// Drain displaced and orphaned mailboxes, oldest first.
    pub fn take_released(&mut self) -> Vec<TextureMailbox> {
        std::mem::take(&mut self.released)
    }

    /// Take the mailbox a texture layer is currently drawing, as when the compositor evicts it.
    pub fn take_mailbox(&mut self, layer: LayerId) -> Option<TextureMailbox> {
        self.layers.get_mut(&layer)?.mailbox.take()
    }

    fn node_mut(&mut self, id: LayerId) -> Option<&mut LayerNode> {
        let node = self.layers.get_mut(&id);
        if node.is_none() {
            tracing::debug!(layer = id.0, "layer tree call on unknown layer ignored");
        }
        node
    }
}

impl LayerTree for InMemoryLayerTree {
    fn create_layer(&mut self, kind: LayerKind) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        self.layers.insert(id, LayerNode::new(kind));
        id
    }

    fn add_child(&mut self, parent: LayerId, child: LayerId) {
        if !self.layers.contains_key(&parent) || !self.layers.contains_key(&child) {
            return;
        }
        self.remove_from_parent(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn remove_from_parent(&mut self, layer: LayerId) {
        let Some(parent) = self.layers.get_mut(&layer).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.layers.get_mut(&parent) {
            p.children.retain(|c| *c != layer);
        }
    }

    fn destroy_layer(&mut self, layer: LayerId) -> Vec<ReturnedResource> {
        self.remove_from_parent(layer);
        let Some(node) = self.layers.remove(&layer) else {
            return Vec::new();
        };
        self.destroyed += 1;
        if self.container == Some(layer) {
            self.container = None;
        }
        for child in &node.children {
            if let Some(c) = self.layers.get_mut(child) {
                c.parent = None;
            }
        }
        if let Some(mailbox) = node.mailbox {
            self.released.push(mailbox);
        }

        let mut returned = node.unused;
        if let Some(frame) = node.frame {
            returned.extend(
                frame
                    .resources
                    .iter()
                    .map(|r| ReturnedResource::unused(r.id)),
            );
        }
        returned
    }

    fn set_drawable(&mut self, layer: LayerId, drawable: bool) {
        if let Some(n) = self.node_mut(layer) {
            n.drawable = drawable;
        }
    }

    fn set_contents_opaque(&mut self, layer: LayerId, opaque: bool) {
        if let Some(n) = self.node_mut(layer) {
            n.contents_opaque = opaque;
        }
    }

    fn set_background(&mut self, layer: LayerId, color: Rgba8Premul) {
        if let Some(n) = self.node_mut(layer) {
            n.background = Some(color);
        }
    }

    fn set_masks_to_bounds(&mut self, layer: LayerId, masks: bool) {
        if let Some(n) = self.node_mut(layer) {
            n.masks_to_bounds = masks;
        }
    }

    fn set_bounds(&mut self, layer: LayerId, bounds: DipSize) {
        if let Some(n) = self.node_mut(layer) {
            n.bounds = bounds;
            n.bounds_updates = n.bounds_updates.saturating_add(1);
        }
    }

    fn set_texture_mailbox(&mut self, layer: LayerId, mailbox: TextureMailbox) {
        let Some(n) = self.layers.get_mut(&layer) else {
            // Nobody will draw it; hand it straight back.
            self.released.push(mailbox);
            return;
        };
        if let Some(old) = n.mailbox.replace(mailbox) {
            self.released.push(old);
        }
    }

    fn set_needs_display(&mut self, layer: LayerId) {
        if let Some(n) = self.node_mut(layer) {
            n.display_requests = n.display_requests.saturating_add(1);
        }
    }

    fn set_frame_data(&mut self, layer: LayerId, frame: DelegatedFrameData) {
        let Some(n) = self.node_mut(layer) else {
            return;
        };
        if let Some(old) = n.frame.take() {
            n.unused.extend(
                old.resources
                    .iter()
                    .filter(|r| !frame.references(r.id))
                    .map(|r| ReturnedResource::unused(r.id)),
            );
        }
        n.frame = Some(frame);
    }

    fn take_unused_resources(&mut self, layer: LayerId) -> Vec<ReturnedResource> {
        self.layers
            .get_mut(&layer)
            .map(|n| std::mem::take(&mut n.unused))
            .unwrap_or_default()
    }

    fn set_container_layer(&mut self, layer: Option<LayerId>) {
        self.container = layer;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layer/memory.rs"]
mod tests;
