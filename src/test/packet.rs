use crate::net::{NetWorld, NodeId, TcpSegment, Transport};
use crate::sim::SimTime;

#[test]
fn packet_walks_its_static_route() {
    let mut world = NetWorld::default();
    let route = vec![NodeId(1), NodeId(2), NodeId(3)];
    let mut pkt = world.net.make_packet(4, 576, route, SimTime::from_millis(3));
    assert_eq!(pkt.src(), Some(NodeId(1)));
    assert_eq!(pkt.dst(), Some(NodeId(3)));
    assert_eq!(pkt.at(), Some(NodeId(1)));
    assert_eq!(pkt.next(), Some(NodeId(2)));
    assert_eq!(pkt.created_at, SimTime::from_millis(3));

    pkt = pkt.advance();
    assert_eq!(pkt.at(), Some(NodeId(2)));
    assert!(pkt.has_next());

    pkt = pkt.advance();
    assert_eq!(pkt.at(), Some(NodeId(3)));
    assert!(!pkt.has_next());
    assert_eq!(pkt.next(), None);
}

#[test]
fn packet_ids_are_unique_and_transport_defaults_to_none() {
    let mut world = NetWorld::default();
    let a = world.net.make_packet(1, 40, vec![NodeId(0), NodeId(1)], SimTime::ZERO);
    let b = world.net.make_packet(1, 40, vec![NodeId(0), NodeId(1)], SimTime::ZERO);
    assert_ne!(a.id, b.id);
    assert!(matches!(a.transport, Transport::None));

    let mut c = b.clone();
    c.transport = Transport::Tcp(TcpSegment::Ack { ack: 536 });
    assert!(matches!(c.transport, Transport::Tcp(TcpSegment::Ack { ack: 536 })));
}
