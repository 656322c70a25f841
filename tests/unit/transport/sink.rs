use super::*;
use crate::foundation::core::{Generation, InstanceId, ResourceToken, RoutingId, SyncToken};
use crate::transport::message::{FrameAck, MessageHeader};

fn header() -> MessageHeader {
    MessageHeader {
        host_routing_id: RoutingId(3),
        instance_id: InstanceId(4),
        generation: Generation::new(1, 1),
    }
}

#[test]
fn in_memory_sink_records_in_order() {
    let mut sink = InMemoryAckSink::new();
    for name in ["a", "b"] {
        sink.send(RelayMessage::ResourceAcknowledged {
            header: header(),
            resource: ResourceToken::from_name(name),
            sync_token: SyncToken::NONE,
        })
        .unwrap();
    }
    let tokens: Vec<_> = sink
        .messages()
        .iter()
        .filter_map(RelayMessage::returned_token)
        .cloned()
        .collect();
    assert_eq!(tokens, vec![ResourceToken::from("a"), ResourceToken::from("b")]);
    assert_eq!(sink.take().len(), 2);
    assert!(sink.messages().is_empty());
}

#[test]
fn closed_sink_refuses_messages() {
    let mut sink = InMemoryAckSink::new();
    sink.close();
    let err = sink
        .send(RelayMessage::FrameAcknowledged {
            header: header(),
            ack: FrameAck::default(),
        })
        .unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

#[test]
fn empty_release_detection() {
    let empty = RelayMessage::ResourceAcknowledged {
        header: header(),
        resource: ResourceToken::empty(),
        sync_token: SyncToken::NONE,
    };
    assert!(empty.is_empty_release());
    assert_eq!(empty.header().instance_id, InstanceId(4));

    let frame = RelayMessage::FrameAcknowledged {
        header: header(),
        ack: FrameAck::default(),
    };
    assert!(frame.is_empty_release());
    assert_eq!(frame.returned_token(), None);
}

#[test]
fn messages_serialize_with_type_tag() {
    let msg = RelayMessage::ResourceAcknowledged {
        header: header(),
        resource: ResourceToken::from_name("r1"),
        sync_token: SyncToken(5),
    };
    let v = serde_json::to_value(&msg).unwrap();
    assert_eq!(v["type"], "resource_acknowledged");
    assert_eq!(v["resource"], "r1");
    assert_eq!(v["header"]["generation"]["route_id"], 1);
}
