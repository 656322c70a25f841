use std::path::Path;

use crate::foundation::core::{
    Generation, HostId, InstanceId, PixelSize, ResourceToken, RouteId, RoutingId, SyncToken,
};
use crate::foundation::error::{RelayError, RelayResult};
use crate::frame::compositor_frame::CompositorFrame;
use crate::layer::memory::InMemoryLayerTree;
use crate::relay::frame_relay::FrameRelay;
use crate::relay::opts::RelayOpts;
use crate::relay::state::{RelaySnapshot, RelayStats};
use crate::transport::message::RelayMessage;
use crate::transport::sink::InMemoryAckSink;

/// A recorded conversation for one relay instance.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ReplayScript {
    /// Relay instance id.
    pub instance_id: InstanceId,
    /// Embedder host routing id.
    pub host_routing_id: RoutingId,
    /// Relay options.
    #[serde(default)]
    pub opts: RelayOpts,
    /// Events in arrival order.
    pub events: Vec<ReplayEvent>,
}

impl ReplayScript {
    /// Parse a script from JSON text.
    pub fn from_json(s: &str) -> RelayResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a script file.
    pub fn load(path: &Path) -> RelayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Other(anyhow::Error::new(e).context(format!("read '{}'", path.display())))
        })?;
        Self::from_json(&text)
    }
}

fn default_scale() -> f32 {
    1.0
}

/// One inbound event.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// `CompositingEnabled(bool)`.
    EnableCompositing {
        /// Enable or disable.
        enable: bool,
    },
    /// `BuffersSwapped(..)`.
    BuffersSwapped {
        /// Buffer size in pixels.
        size: PixelSize,
        /// Buffer token.
        resource: ResourceToken,
        /// Producer route id.
        route_id: RouteId,
        /// Producer host id.
        host_id: HostId,
        /// Producer device scale factor.
        #[serde(default = "default_scale")]
        device_scale_factor: f32,
    },
    /// `CompositorFrameSwapped(..)`.
    CompositorFrameSwapped {
        /// The frame.
        frame: CompositorFrame,
        /// Producer route id.
        route_id: RouteId,
        /// Producer host id.
        host_id: HostId,
    },
    /// The compositor releases every displaced mailbox.
    ReleaseDisplaced {
        /// Consumer sync token.
        #[serde(default)]
        sync_token: SyncToken,
        /// Whether the resources were lost.
        #[serde(default)]
        lost: bool,
    },
    /// The compositor evicts the mailbox currently drawn.
    ReleaseCurrent {
        /// Consumer sync token.
        #[serde(default)]
        sync_token: SyncToken,
        /// Whether the resource was lost.
        #[serde(default)]
        lost: bool,
    },
    /// The compositor committed the delegated frame.
    DidCommitFrame,
    /// `VisibilityChanged(bool)`.
    UpdateVisibility {
        /// New visibility.
        visible: bool,
    },
    /// `ContainerDestroyed()`.
    ContainerDestroyed,
}

/// A rejected event. Replay continues past it.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReplayEventError {
    /// Index into `events`.
    pub index: usize,
    /// Rendered error.
    pub message: String,
}

/// Outcome of a replay.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReplayReport {
    /// Outbound messages in send order.
    pub messages: Vec<RelayMessage>,
    /// Counters at the end of the run.
    pub stats: RelayStats,
    /// Bookkeeping at the end of the run.
    pub snapshot: RelaySnapshot,
    /// Events the relay rejected.
    pub errors: Vec<ReplayEventError>,
}

/// Run `script` against a fresh relay backed by in-memory collaborators.
#[tracing::instrument(skip(script), fields(events = script.events.len()))]
pub fn replay(script: &ReplayScript) -> RelayResult<ReplayReport> {
    let relay = FrameRelay::new(
        script.instance_id,
        script.host_routing_id,
        InMemoryLayerTree::new(),
        InMemoryAckSink::new(),
        script.opts.clone(),
    );

    let mut errors = Vec::new();
    for (index, event) in script.events.iter().enumerate() {
        if let Err(err) = apply(&relay, event) {
            errors.push(ReplayEventError {
                index,
                message: err.to_string(),
            });
        }
    }

    Ok(ReplayReport {
        messages: relay.with_sink(InMemoryAckSink::take),
        stats: relay.stats(),
        snapshot: relay.snapshot(),
        errors,
    })
}

fn apply(
    relay: &FrameRelay<InMemoryLayerTree, InMemoryAckSink>,
    event: &ReplayEvent,
) -> RelayResult<()> {
    match event {
        ReplayEvent::EnableCompositing { enable } => relay.enable_compositing(*enable),
        ReplayEvent::BuffersSwapped {
            size,
            resource,
            route_id,
            host_id,
            device_scale_factor,
        } => relay.on_buffers_swapped(
            *size,
            resource.clone(),
            Generation {
                route_id: *route_id,
                host_id: *host_id,
            },
            *device_scale_factor,
        ),
        ReplayEvent::CompositorFrameSwapped {
            frame,
            route_id,
            host_id,
        } => relay.on_compositor_frame_swapped(
            frame.clone(),
            Generation {
                route_id: *route_id,
                host_id: *host_id,
            },
        )?,
        ReplayEvent::ReleaseDisplaced { sync_token, lost } => {
            relay.release_displaced(*sync_token, *lost);
        }
        ReplayEvent::ReleaseCurrent { sync_token, lost } => {
            relay.release_current(*sync_token, *lost);
        }
        ReplayEvent::DidCommitFrame => relay.did_commit_frame(),
        ReplayEvent::UpdateVisibility { visible } => relay.update_visibility(*visible),
        ReplayEvent::ContainerDestroyed => relay.on_container_destroy(),
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/replay/script.rs"]
mod tests;
