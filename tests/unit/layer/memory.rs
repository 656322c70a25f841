use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::foundation::core::{PixelSize, ResourceToken, SyncToken};
use crate::frame::compositor_frame::{RenderPass, ResourceId, TransferableResource};
use crate::layer::tree::ReleaseCallback;

fn mailbox(name: &str, log: &Rc<RefCell<Vec<(String, u64, bool)>>>) -> TextureMailbox {
    let log = log.clone();
    let owned = name.to_string();
    TextureMailbox {
        resource: ResourceToken::from_name(name),
        sync_token: SyncToken::NONE,
        release: Some(ReleaseCallback::new(move |sync, lost| {
            log.borrow_mut().push((owned, sync.0, lost));
        })),
    }
}

fn frame(ids: &[u32]) -> DelegatedFrameData {
    DelegatedFrameData {
        resources: ids
            .iter()
            .map(|id| TransferableResource {
                id: ResourceId(*id),
                token: ResourceToken::from_name(&format!("res{id}")),
                size: PixelSize::new(4, 4),
                sync_token: SyncToken::NONE,
            })
            .collect(),
        render_passes: vec![RenderPass::full(1, PixelSize::new(4, 4))],
    }
}

#[test]
fn displaced_mailboxes_are_queued_not_released() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tree = InMemoryLayerTree::new();
    let tex = tree.create_layer(LayerKind::Texture);

    tree.set_texture_mailbox(tex, mailbox("a", &log));
    tree.set_texture_mailbox(tex, mailbox("b", &log));
    assert!(log.borrow().is_empty());
    assert_eq!(tree.pending_releases(), 1);

    for m in tree.take_released() {
        m.release(SyncToken(9), false);
    }
    assert_eq!(*log.borrow(), vec![("a".to_string(), 9, false)]);
    assert_eq!(
        tree.layer(tex).unwrap().mailbox.as_ref().unwrap().resource,
        ResourceToken::from_name("b")
    );
}

#[test]
fn destroying_a_texture_layer_queues_its_mailbox() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tree = InMemoryLayerTree::new();
    let root = tree.create_layer(LayerKind::Holder);
    let tex = tree.create_layer(LayerKind::Texture);
    tree.add_child(root, tex);
    tree.set_texture_mailbox(tex, mailbox("a", &log));

    assert!(tree.destroy_layer(tex).is_empty());
    assert!(tree.layer(root).unwrap().children.is_empty());
    assert_eq!(tree.pending_releases(), 1);
    assert_eq!(tree.destroyed_layers(), 1);
}

#[test]
fn superseded_frame_resources_become_unused() {
    let mut tree = InMemoryLayerTree::new();
    let del = tree.create_layer(LayerKind::Delegated);

    tree.set_frame_data(del, frame(&[1, 2]));
    assert!(tree.take_unused_resources(del).is_empty());

    tree.set_frame_data(del, frame(&[2, 3]));
    let unused = tree.take_unused_resources(del);
    assert_eq!(unused, vec![ReturnedResource::unused(ResourceId(1))]);
    assert!(tree.take_unused_resources(del).is_empty());

    let returned = tree.destroy_layer(del);
    let ids: Vec<u32> = returned.iter().map(|r| r.id.0).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn bounds_updates_are_counted() {
    let mut tree = InMemoryLayerTree::new();
    let tex = tree.create_layer(LayerKind::Texture);
    tree.set_bounds(tex, DipSize::new(10, 10));
    tree.set_bounds(tex, DipSize::new(10, 10));
    let node = tree.layer(tex).unwrap();
    assert_eq!(node.bounds, DipSize::new(10, 10));
    assert_eq!(node.bounds_updates, 2);
}

#[test]
fn reparenting_moves_the_child() {
    let mut tree = InMemoryLayerTree::new();
    let a = tree.create_layer(LayerKind::Holder);
    let b = tree.create_layer(LayerKind::Holder);
    let c = tree.create_layer(LayerKind::Texture);
    tree.add_child(a, c);
    tree.add_child(b, c);
    assert!(tree.layer(a).unwrap().children.is_empty());
    assert_eq!(tree.layer(b).unwrap().children, vec![c]);
    assert_eq!(tree.layer(c).unwrap().parent, Some(b));
}

#[test]
fn destroying_the_container_layer_unbinds_it() {
    let mut tree = InMemoryLayerTree::new();
    let root = tree.create_layer(LayerKind::Holder);
    tree.set_container_layer(Some(root));
    tree.destroy_layer(root);
    assert_eq!(tree.container_layer(), None);
    assert_eq!(tree.live_layers(), 0);
}
