use crate::foundation::core::{Generation, InstanceId, ResourceToken, RoutingId, SyncToken};
use crate::frame::compositor_frame::{PlaneData, ReturnedResource};

/// Addressing shared by every outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageHeader {
    /// Embedder-side host routing id.
    pub host_routing_id: RoutingId,
    /// Relay instance the message is about.
    pub instance_id: InstanceId,
    /// Producer generation the message is addressed to.
    pub generation: Generation,
}

/// Acknowledgment payload for compositor frames.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameAck {
    /// Delegated resources the compositor no longer references.
    #[serde(default)]
    pub resources: Vec<ReturnedResource>,
    /// The plane being handed back, for single-plane frames.
    #[serde(default)]
    pub plane: Option<PlaneData>,
}

/// A message from the relay to the producer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Texture path: `resource` may be reused once `sync_token` has passed.
    ResourceAcknowledged {
        /// Addressing.
        header: MessageHeader,
        /// Returned buffer; empty for forced or lost releases.
        resource: ResourceToken,
        /// Consumer-side sync token.
        sync_token: SyncToken,
    },
    /// Compositor-frame path: returned resources and/or plane.
    FrameAcknowledged {
        /// Addressing.
        header: MessageHeader,
        /// Returned resources.
        ack: FrameAck,
    },
}

impl RelayMessage {
    /// Message addressing.
    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::ResourceAcknowledged { header, .. } | Self::FrameAcknowledged { header, .. } => {
                header
            }
        }
    }

    /// The single buffer this message hands back, if it is a texture or plane acknowledgment.
    pub fn returned_token(&self) -> Option<&ResourceToken> {
        match self {
            Self::ResourceAcknowledged { resource, .. } => Some(resource),
            Self::FrameAcknowledged { ack, .. } => ack.plane.as_ref().map(|p| &p.resource),
        }
    }

    /// Whether the message hands back nothing usable (forced, lost, or empty acknowledgment).
    pub fn is_empty_release(&self) -> bool {
        match self {
            Self::ResourceAcknowledged { resource, .. } => resource.is_empty(),
            Self::FrameAcknowledged { ack, .. } => {
                ack.resources.is_empty() && ack.plane.as_ref().is_none_or(|p| p.resource.is_empty())
            }
        }
    }
}
