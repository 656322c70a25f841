use crate::foundation::core::{PixelSize, ResourceToken, SyncToken};
use crate::foundation::error::{RelayError, RelayResult};

/// Producer-assigned id of a resource inside a delegated frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

/// A resource lent to the compositor as part of a delegated frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransferableResource {
    /// Producer-assigned id, stable across frames while the resource lives.
    pub id: ResourceId,
    /// GPU buffer the resource lives in.
    pub token: ResourceToken,
    /// Resource size in physical pixels.
    pub size: PixelSize,
    /// Producer-side sync token.
    #[serde(default)]
    pub sync_token: SyncToken,
}

/// A resource handed back to the producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReturnedResource {
    /// Id the producer lent the resource under.
    pub id: ResourceId,
    /// Consumer-side sync token the producer must wait on before reuse.
    pub sync_token: SyncToken,
    /// Number of references being returned.
    pub count: u32,
    /// Whether the consumer lost the resource (contents undefined).
    pub lost: bool,
}

impl ReturnedResource {
    /// One unlost reference of `id` with no sync constraint.
    pub fn unused(id: ResourceId) -> Self {
        Self {
            id,
            sync_token: SyncToken::NONE,
            count: 1,
            lost: false,
        }
    }
}

/// One render pass of a delegated frame. Geometry is in physical pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderPass {
    /// Pass id, unique within the frame.
    pub id: u32,
    /// Area the pass renders into.
    pub output_rect: kurbo::Rect,
    /// Damaged area since the previous frame.
    #[serde(default)]
    pub damage_rect: kurbo::Rect,
}

impl RenderPass {
    /// Pass covering `size` at the origin, fully damaged.
    pub fn full(id: u32, size: PixelSize) -> Self {
        let rect = kurbo::Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height));
        Self {
            id,
            output_rect: rect,
            damage_rect: rect,
        }
    }

    /// Integer size of the output rect.
    pub fn output_size(&self) -> PixelSize {
        PixelSize::from_kurbo(self.output_rect.size())
    }
}

/// Retained-mode payload: a render-pass list plus the resources it references.
///
/// The last render pass is the root (outermost) pass.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DelegatedFrameData {
    /// Resources referenced by the passes.
    #[serde(default)]
    pub resources: Vec<TransferableResource>,
    /// Render passes, root last.
    #[serde(default)]
    pub render_passes: Vec<RenderPass>,
}

impl DelegatedFrameData {
    /// The outermost render pass, if any.
    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.render_passes.last()
    }

    /// Whether the frame references resource `id`.
    pub fn references(&self, id: ResourceId) -> bool {
        self.resources.iter().any(|r| r.id == id)
    }
}

/// A single GPU plane standing in for a whole frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaneData {
    /// GPU buffer holding the plane.
    pub resource: ResourceToken,
    /// Plane size in physical pixels.
    pub size: PixelSize,
    /// Sync token attached to the plane.
    #[serde(default)]
    pub sync_token: SyncToken,
}

/// Frame payload variants.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramePayload {
    /// One flattened plane; handled exactly like a texture-backed swap.
    SinglePlane(PlaneData),
    /// Multi-resource retained frame.
    Delegated(DelegatedFrameData),
}

/// Per-frame metadata.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameMetadata {
    /// Producer device scale factor.
    #[serde(default = "default_scale")]
    pub device_scale_factor: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            device_scale_factor: default_scale(),
        }
    }
}

/// A frame delivered through `CompositorFrameSwapped`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositorFrame {
    /// Frame metadata.
    #[serde(default)]
    pub metadata: FrameMetadata,
    /// Frame payload. `None` is malformed.
    #[serde(default)]
    pub payload: Option<FramePayload>,
}

impl CompositorFrame {
    /// Frame carrying one GPU plane.
    pub fn single_plane(plane: PlaneData, device_scale_factor: f32) -> Self {
        Self {
            metadata: FrameMetadata {
                device_scale_factor,
            },
            payload: Some(FramePayload::SinglePlane(plane)),
        }
    }

    /// Frame carrying a delegated render-pass list.
    pub fn delegated(data: DelegatedFrameData, device_scale_factor: f32) -> Self {
        Self {
            metadata: FrameMetadata {
                device_scale_factor,
            },
            payload: Some(FramePayload::Delegated(data)),
        }
    }

    /// Reject frames the relay cannot consume.
    ///
    /// A frame must carry either a plane or a non-empty render-pass list.
    pub fn validate(&self) -> RelayResult<()> {
        match &self.payload {
            None => Err(RelayError::malformed_frame(
                "frame carries neither a plane nor delegated data",
            )),
            Some(FramePayload::Delegated(data)) if data.render_passes.is_empty() => Err(
                RelayError::malformed_frame("delegated frame has an empty render-pass list"),
            ),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/compositor_frame.rs"]
mod tests;
