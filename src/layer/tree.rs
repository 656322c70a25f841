use std::fmt;

use crate::foundation::core::{DipSize, ResourceToken, Rgba8Premul, SyncToken};
use crate::frame::compositor_frame::{DelegatedFrameData, ReturnedResource};

/// Handle to a layer owned by a [`LayerTree`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LayerId(pub u64);

/// Kinds of layers the relay creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Solid-colour root bound to the container.
    Holder,
    /// Draws one texture mailbox.
    Texture,
    /// Draws a retained delegated frame.
    Delegated,
}

/// Runs once when the compositor stops using a texture mailbox.
///
/// Arguments are the consumer-side sync token and whether the resource was lost.
pub struct ReleaseCallback(Box<dyn FnOnce(SyncToken, bool)>);

impl ReleaseCallback {
    /// Wrap a closure.
    pub fn new(f: impl FnOnce(SyncToken, bool) + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Consume the callback.
    pub fn run(self, sync_token: SyncToken, lost: bool) {
        (self.0)(sync_token, lost)
    }
}

impl fmt::Debug for ReleaseCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReleaseCallback(..)")
    }
}

/// A texture installed on a texture layer.
#[derive(Debug)]
pub struct TextureMailbox {
    /// GPU buffer to sample (possibly empty).
    pub resource: ResourceToken,
    /// Producer-side sync token to wait on before sampling.
    pub sync_token: SyncToken,
    /// Present only for non-empty resources.
    pub release: Option<ReleaseCallback>,
}

impl TextureMailbox {
    /// Hand the mailbox back, running its release callback if it has one.
    pub fn release(self, sync_token: SyncToken, lost: bool) {
        if let Some(cb) = self.release {
            cb.run(sync_token, lost);
        }
    }
}

/// The compositor-side layer tree the relay drives.
///
/// Implementations own every layer they create. They must not run [`ReleaseCallback`]s from
/// inside any of these methods: displaced or destroyed mailboxes are released later, once the
/// compositor is done sampling them.
pub trait LayerTree {
    /// Create a detached layer of `kind`.
    fn create_layer(&mut self, kind: LayerKind) -> LayerId;
    /// Append `child` under `parent`.
    fn add_child(&mut self, parent: LayerId, child: LayerId);
    /// Detach `layer` from its parent, if any.
    fn remove_from_parent(&mut self, layer: LayerId);
    /// Destroy `layer`, returning any delegated resources it still referenced.
    fn destroy_layer(&mut self, layer: LayerId) -> Vec<ReturnedResource>;
    /// Toggle whether the layer draws.
    fn set_drawable(&mut self, layer: LayerId, drawable: bool);
    /// Declare the layer's contents fully opaque.
    fn set_contents_opaque(&mut self, layer: LayerId, opaque: bool);
    /// Solid background colour.
    fn set_background(&mut self, layer: LayerId, color: Rgba8Premul);
    /// Clip descendants to the layer's bounds.
    fn set_masks_to_bounds(&mut self, layer: LayerId, masks: bool);
    /// Logical bounds.
    fn set_bounds(&mut self, layer: LayerId, bounds: DipSize);
    /// Replace the texture a texture layer draws.
    fn set_texture_mailbox(&mut self, layer: LayerId, mailbox: TextureMailbox);
    /// Request a redraw of `layer`.
    fn set_needs_display(&mut self, layer: LayerId);
    /// Replace the frame a delegated layer draws. Resource ownership moves to the layer.
    fn set_frame_data(&mut self, layer: LayerId, frame: DelegatedFrameData);
    /// Drain resources the delegated layer no longer references.
    fn take_unused_resources(&mut self, layer: LayerId) -> Vec<ReturnedResource>;
    /// Bind (or unbind, with `None`) the layer the host container draws.
    fn set_container_layer(&mut self, layer: Option<LayerId>);
}
