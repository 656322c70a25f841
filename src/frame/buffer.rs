use crate::foundation::core::{Generation, PixelSize, ResourceToken, SyncToken, sanitize_scale};

/// Transport representation a buffer arrived through.
///
/// Acknowledgments are tagged with the same kind so the producer's accounting matches what it
/// sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferKind {
    /// A flattened texture handed over via `BuffersSwapped`.
    TextureBacked,
    /// A single-plane compositor frame handed over via `CompositorFrameSwapped`.
    DelegatedFrame,
}

/// One incoming buffer swap.
///
/// Immutable once constructed. A copy is captured by value in the release callback installed on
/// the texture layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BufferDescriptor {
    kind: BufferKind,
    resource: ResourceToken,
    pixel_size: PixelSize,
    generation: Generation,
    sync_token: SyncToken,
    device_scale_factor: f32,
}

impl BufferDescriptor {
    /// Build a descriptor. A scale factor that is not finite and positive is stored as `1.0`.
    pub fn new(
        kind: BufferKind,
        resource: ResourceToken,
        pixel_size: PixelSize,
        generation: Generation,
        sync_token: SyncToken,
        device_scale_factor: f32,
    ) -> Self {
        Self {
            kind,
            resource,
            pixel_size,
            generation,
            sync_token,
            device_scale_factor: sanitize_scale(device_scale_factor),
        }
    }

    /// Texture-backed descriptor as delivered by `BuffersSwapped` (no sync token).
    pub fn texture(
        pixel_size: PixelSize,
        resource: ResourceToken,
        generation: Generation,
        device_scale_factor: f32,
    ) -> Self {
        Self::new(
            BufferKind::TextureBacked,
            resource,
            pixel_size,
            generation,
            SyncToken::NONE,
            device_scale_factor,
        )
    }

    /// Same kind and generation, but naming no resource.
    ///
    /// Used for forced releases and for acknowledging lost resources.
    pub fn emptied(&self) -> Self {
        Self {
            kind: self.kind,
            resource: ResourceToken::empty(),
            pixel_size: PixelSize::ZERO,
            generation: self.generation,
            sync_token: SyncToken::NONE,
            device_scale_factor: 1.0,
        }
    }

    /// Transport kind.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Resource token (possibly empty).
    pub fn resource(&self) -> &ResourceToken {
        &self.resource
    }

    /// Whether the descriptor names a real resource.
    pub fn has_resource(&self) -> bool {
        !self.resource.is_empty()
    }

    /// Buffer size in physical pixels.
    pub fn pixel_size(&self) -> PixelSize {
        self.pixel_size
    }

    /// Producer generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Producer-side sync token.
    pub fn sync_token(&self) -> SyncToken {
        self.sync_token
    }

    /// Device scale factor (always finite and positive).
    pub fn device_scale_factor(&self) -> f32 {
        self.device_scale_factor
    }
}
