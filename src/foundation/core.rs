use std::fmt;

use crate::foundation::error::{RelayError, RelayResult};

/// Identifies one relay instance (one guest surface) to the embedder.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct InstanceId(pub i32);

/// Routing id of the embedder-side host that receives outbound acknowledgments.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RoutingId(pub i32);

/// Producer transport route id.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct RouteId(pub i32);

/// Producer transport host id.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct HostId(pub i32);

/// A producer endpoint instance: `(route id, host id)`.
///
/// Any change in either value means the previous producer endpoint is gone (crash, GPU context
/// loss, restart) and every resource handed out under the old generation is abandoned.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Generation {
    /// Producer route id.
    pub route_id: RouteId,
    /// Producer host id.
    pub host_id: HostId,
}

impl Generation {
    /// Build a generation from raw ids.
    pub fn new(route_id: i32, host_id: i32) -> Self {
        Self {
            route_id: RouteId(route_id),
            host_id: HostId(host_id),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.route_id.0, self.host_id.0)
    }
}

/// Buffer size in physical pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// The zero size.
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    /// Build a pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert to layer bounds: `floor(pixels / device_scale_factor)` per axis.
    ///
    /// The scale is sanitized with [`sanitize_scale`] first.
    pub fn to_dip_floor(self, device_scale_factor: f32) -> DipSize {
        let scale = f64::from(sanitize_scale(device_scale_factor));
        let floor = |v: u32| (f64::from(v) / scale).floor().max(0.0) as u32;
        DipSize {
            width: floor(self.width),
            height: floor(self.height),
        }
    }

    /// Integer pixel size covering a kurbo size (rounded to the nearest pixel, clamped at zero).
    pub fn from_kurbo(size: kurbo::Size) -> Self {
        let px = |v: f64| {
            if v.is_finite() {
                v.round().clamp(0.0, f64::from(u32::MAX)) as u32
            } else {
                0
            }
        };
        Self {
            width: px(size.width),
            height: px(size.height),
        }
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Layer bounds in device-independent pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct DipSize {
    /// Width in DIPs.
    pub width: u32,
    /// Height in DIPs.
    pub height: u32,
}

impl DipSize {
    /// Build a DIP size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Returns `scale` when it is finite and positive, `1.0` otherwise.
pub fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        tracing::debug!(scale, "invalid device scale factor replaced with 1.0");
        1.0
    }
}

/// Opaque identifier for a GPU-shared buffer.
///
/// The relay never interprets these bytes; it only compares them for emptiness and passes them
/// back to the producer. A token with no bytes, or with only zero bytes, is empty.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceToken(Vec<u8>);

impl ResourceToken {
    /// The empty token.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a token from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Build a token from a textual name (its UTF-8 bytes).
    pub fn from_name(name: &str) -> Self {
        Self(name.as_bytes().to_vec())
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the token names no resource.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<&str> for ResourceToken {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Debug for ResourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("ResourceToken(<empty>)");
        }
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "ResourceToken({s:?})"),
            Err(_) => write!(f, "ResourceToken({:02x?})", self.0),
        }
    }
}

// Textual tokens round-trip as JSON strings, anything else as a byte array.
impl serde::Serialize for ResourceToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(&self.0) {
            Ok(s) if !s.contains('\0') => serializer.serialize_str(s),
            _ => serializer.collect_seq(self.0.iter()),
        }
    }
}

impl<'de> serde::Deserialize<'de> for ResourceToken {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Bytes(Vec<u8>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(s) => Self(s.into_bytes()),
            Repr::Bytes(b) => Self(b),
        })
    }
}

/// Opaque GPU ordering marker. `0` means "no synchronization required".
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct SyncToken(pub u64);

impl SyncToken {
    /// No ordering constraint.
    pub const NONE: Self = Self(0);
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Opaque white.
    pub fn white() -> Self {
        Self {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        }
    }

    /// Build from straight (non-premultiplied) RGBA.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let v = u16::from(c) * u16::from(a);
            ((v + 127) / 255) as u8
        }
        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (straight alpha).
    pub fn from_hex(s: &str) -> RelayResult<Self> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| RelayError::validation(format!("colour '{s}' must start with '#'")))?;
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(RelayError::validation(format!(
                "colour '{s}' must be #rrggbb or #rrggbbaa"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| RelayError::validation(format!("colour '{s}' is not hex")))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::from_straight_rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
