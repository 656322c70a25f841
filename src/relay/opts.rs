use crate::foundation::core::Rgba8Premul;

/// Options controlling how the relay styles the layers it creates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RelayOpts {
    /// Solid colour of the root holder, visible wherever the buffer does not cover the container.
    pub background: Rgba8Premul,
    /// Clip buffer layers to the holder's bounds.
    pub masks_to_bounds: bool,
    /// Declare texture and delegated layers opaque.
    pub contents_opaque: bool,
    /// Forget the recorded buffer size whenever a new content layer is created, so the first
    /// buffer after a mode switch always sets the new layer's bounds.
    pub reset_bounds_on_mode_switch: bool,
}

impl Default for RelayOpts {
    fn default() -> Self {
        Self {
            background: Rgba8Premul::white(),
            masks_to_bounds: true,
            contents_opaque: true,
            reset_bounds_on_mode_switch: true,
        }
    }
}
