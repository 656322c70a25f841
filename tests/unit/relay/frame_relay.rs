use super::*;
use crate::foundation::core::{DipSize, Rgba8Premul};
use crate::foundation::error::RelayError;
use crate::relay::state::SlotKind;
use crate::transport::sink::InMemoryAckSink;

type TestRelay = FrameRelay<InMemoryLayerTree, InMemoryAckSink>;

fn relay() -> TestRelay {
    let r = FrameRelay::new(
        InstanceId(7),
        RoutingId(3),
        InMemoryLayerTree::new(),
        InMemoryAckSink::new(),
        RelayOpts::default(),
    );
    r.enable_compositing(true);
    r
}

fn swap(r: &TestRelay, name: &str, px: u32, generation: Generation) {
    r.on_buffers_swapped(
        PixelSize::new(px, px),
        ResourceToken::from_name(name),
        generation,
        1.0,
    );
}

fn sent(r: &TestRelay) -> Vec<RelayMessage> {
    r.with_sink(InMemoryAckSink::take)
}

fn token(msg: &RelayMessage) -> Option<ResourceToken> {
    msg.returned_token().cloned()
}

#[test]
fn enabling_compositing_creates_and_binds_a_styled_holder() {
    let r = FrameRelay::new(
        InstanceId(1),
        RoutingId(1),
        InMemoryLayerTree::new(),
        InMemoryAckSink::new(),
        RelayOpts::default(),
    );
    assert_eq!(r.root_layer(), None);

    r.enable_compositing(true);
    let root = r.root_layer().unwrap();
    r.with_layer_tree(|t| {
        assert_eq!(t.container_layer(), Some(root));
        let node = t.layer(root).unwrap();
        assert_eq!(node.kind, LayerKind::Holder);
        assert!(node.masks_to_bounds);
        assert_eq!(node.background, Some(Rgba8Premul::white()));
    });

    r.enable_compositing(false);
    r.with_layer_tree(|t| assert_eq!(t.container_layer(), None));
    assert!(!r.snapshot().compositing_enabled);

    r.enable_compositing(true);
    r.enable_compositing(true);
    assert_eq!(r.root_layer(), Some(root));
    r.with_layer_tree(|t| assert_eq!(t.layers_of_kind(LayerKind::Holder), vec![root]));
}

#[test]
fn first_swap_of_a_generation_forces_an_empty_release() {
    let r = relay();
    swap(&r, "a", 100, Generation::new(1, 1));

    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].is_empty_release());
    assert_eq!(msgs[0].header().generation, Generation::new(1, 1));
    assert_eq!(msgs[0].header().instance_id, InstanceId(7));
    assert_eq!(msgs[0].header().host_routing_id, RoutingId(3));

    let snap = r.snapshot();
    assert!(!snap.ack_pending);
    assert!(snap.last_resource_valid);
    assert_eq!(snap.slot, SlotKind::TextureBacked);
    assert_eq!(r.stats().forced_releases, 1);
}

#[test]
fn displaced_buffer_settles_the_next_swap() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 100, g);
    sent(&r);

    swap(&r, "b", 100, g);
    assert!(sent(&r).is_empty());
    assert!(r.snapshot().ack_pending);

    assert_eq!(r.release_displaced(SyncToken(11), false), 1);
    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    match &msgs[0] {
        RelayMessage::ResourceAcknowledged {
            resource,
            sync_token,
            ..
        } => {
            assert_eq!(resource, &ResourceToken::from_name("a"));
            assert_eq!(*sync_token, SyncToken(11));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!r.snapshot().ack_pending);
}

#[test]
fn lost_displayed_resource_is_acknowledged_empty_once() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    swap(&r, "b", 10, g);
    sent(&r);

    let b = BufferDescriptor::texture(PixelSize::new(10, 10), "b".into(), g, 1.0);
    r.on_resource_released(&b, SyncToken(5), true);

    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].is_empty_release());
    assert!(!r.snapshot().last_resource_valid);
    assert!(!r.snapshot().ack_pending);
    assert_eq!(r.stats().lost_resources, 1);

    // "a" was displaced earlier; its release finds nothing owed.
    r.release_displaced(SyncToken::NONE, false);
    assert!(sent(&r).is_empty());
    assert_eq!(r.stats().late_releases, 1);
}

#[test]
fn stale_generation_release_is_dropped() {
    let r = relay();
    swap(&r, "a", 10, Generation::new(1, 1));
    swap(&r, "b", 10, Generation::new(2, 1));
    sent(&r);

    let old = BufferDescriptor::texture(
        PixelSize::new(10, 10),
        "a".into(),
        Generation::new(1, 1),
        1.0,
    );
    let before = r.snapshot();
    r.on_resource_released(&old, SyncToken::NONE, false);
    assert!(sent(&r).is_empty());
    assert_eq!(r.snapshot(), before);
    assert_eq!(r.stats().stale_releases, 1);
}

#[test]
fn late_release_only_invalidates() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    sent(&r);
    assert!(r.snapshot().last_resource_valid);

    assert!(r.release_current(SyncToken::NONE, false));
    assert!(sent(&r).is_empty());
    assert!(!r.snapshot().last_resource_valid);
    assert_eq!(r.stats().late_releases, 1);
}

#[test]
fn swap_without_root_layer_is_acknowledged_immediately() {
    let r = FrameRelay::new(
        InstanceId(1),
        RoutingId(1),
        InMemoryLayerTree::new(),
        InMemoryAckSink::new(),
        RelayOpts::default(),
    );
    swap(&r, "a", 10, Generation::new(4, 2));

    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    assert_eq!(token(&msgs[0]), Some(ResourceToken::from_name("a")));
    assert!(!r.snapshot().ack_pending);
    r.with_layer_tree(|t| assert_eq!(t.live_layers(), 0));
}

#[test]
fn empty_swap_clears_the_texture_and_returns_the_previous_one() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    sent(&r);

    r.on_buffers_swapped(PixelSize::new(10, 10), ResourceToken::empty(), g, 1.0);
    assert!(!r.snapshot().last_resource_valid);
    r.release_displaced(SyncToken::NONE, false);
    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    assert_eq!(token(&msgs[0]), Some(ResourceToken::from_name("a")));

    // Nothing displayed any more: the next swap is settled by a forced release.
    swap(&r, "c", 10, g);
    let msgs = sent(&r);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].is_empty_release());
}

#[test]
fn empty_swap_on_fresh_generation_stops_after_forced_release() {
    let r = relay();
    r.on_buffers_swapped(
        PixelSize::new(10, 10),
        ResourceToken::empty(),
        Generation::new(1, 1),
        1.0,
    );
    assert_eq!(sent(&r).len(), 1);
    let tex = r.texture_layer().unwrap();
    r.with_layer_tree(|t| {
        let node = t.layer(tex).unwrap();
        assert!(node.mailbox.is_none());
        assert_eq!(node.display_requests, 0);
    });
}

#[test]
fn malformed_frame_changes_nothing() {
    let r = relay();
    let before = r.snapshot();
    let err = r
        .on_compositor_frame_swapped(CompositorFrame::default(), Generation::new(1, 1))
        .unwrap_err();
    assert!(matches!(err, RelayError::MalformedFrame(_)));
    assert_eq!(r.snapshot(), before);
    assert!(sent(&r).is_empty());
    assert_eq!(r.stats().malformed_frames, 1);
    r.with_layer_tree(|t| assert_eq!(t.live_layers(), 1));
}

#[test]
fn release_inside_a_relay_borrow_is_dropped_without_panicking() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    swap(&r, "b", 10, g);
    sent(&r);

    r.with_layer_tree(|t| {
        for m in t.take_released() {
            m.release(SyncToken::NONE, false);
        }
    });
    assert!(sent(&r).is_empty());
    assert!(r.snapshot().ack_pending);
}

#[test]
fn callback_outliving_the_relay_is_inert() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    let tex = r.texture_layer().unwrap();
    let mailbox = r.with_layer_tree(|t| t.take_mailbox(tex)).unwrap();
    drop(r);
    mailbox.release(SyncToken::NONE, false);
}

#[test]
fn bounds_use_device_scale() {
    let r = relay();
    r.on_buffers_swapped(
        PixelSize::new(301, 199),
        "a".into(),
        Generation::new(1, 1),
        2.0,
    );
    let tex = r.texture_layer().unwrap();
    r.with_layer_tree(|t| assert_eq!(t.layer(tex).unwrap().bounds, DipSize::new(150, 99)));
}

#[test]
fn failed_sends_are_counted_and_bookkeeping_advances() {
    let r = relay();
    r.with_sink(InMemoryAckSink::close);
    swap(&r, "a", 10, Generation::new(1, 1));
    assert_eq!(r.stats().failed_sends, 1);
    assert!(!r.snapshot().ack_pending);
    assert!(r.snapshot().last_resource_valid);
}

#[test]
fn releases_with_nothing_owed_invalidate_the_displayed_buffer() {
    let r = relay();
    let g = Generation::new(1, 1);
    swap(&r, "a", 10, g);
    swap(&r, "b", 10, g);
    r.release_displaced(SyncToken::NONE, false);
    sent(&r);
    assert!(!r.snapshot().ack_pending);
    assert!(r.snapshot().last_resource_valid);

    let a = BufferDescriptor::texture(PixelSize::new(10, 10), "a".into(), g, 1.0);
    r.on_resource_released(&a, SyncToken::NONE, false);
    assert!(!r.snapshot().last_resource_valid);

    swap(&r, "c", 10, g);
    assert!(r.snapshot().last_resource_valid);
    r.on_resource_released(&a, SyncToken::NONE, true);
    assert!(sent(&r).iter().all(RelayMessage::is_empty_release));
    assert!(!r.snapshot().last_resource_valid);
    assert!(!r.snapshot().ack_pending);
}
