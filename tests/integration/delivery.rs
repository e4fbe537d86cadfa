use crate::*;

/// A payload crosses the link intact and is tagged with its sender.
#[test]
fn payload_arrives_with_source() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2], 10_000, 65536);
    cluster.full_mesh(1.0)?;

    assert!(cluster.router(1).add_message(NodeId(2), b"hello from one"));
    cluster.tick();

    let got = cluster.received(2);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].payload, Bytes::from_static(b"hello from one"));
    assert_eq!(got[0].source, NodeId(1));
    assert!(cluster.received(1).is_empty());
    Ok(())
}

/// Per-destination order is preserved end to end.
#[test]
fn order_is_preserved_per_source() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3], 150, 65536);
    cluster.full_mesh(1.0)?;

    for i in 0..10u8 {
        assert!(cluster.router(1).add_message(NodeId(3), &[i; 20]));
        assert!(cluster.router(2).add_message(NodeId(3), &[100 + i; 20]));
    }
    let mut got = Vec::new();
    for _ in 0..10 {
        cluster.tick();
        got.extend(cluster.received(3));
    }
    assert_eq!(got.len(), 20);

    for source in [NodeId(1), NodeId(2)] {
        let tags: Vec<u8> = got
            .iter()
            .filter(|d| d.source == source)
            .map(|d| d.payload[0])
            .collect();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted, "reordered traffic from {source}");
        assert_eq!(tags.len(), 10);
    }
    Ok(())
}

/// Loopback never touches the network or the rate budget.
#[test]
fn loopback_is_immediate() -> Result<()> {
    let cluster = Cluster::new(&[1, 2], 0, 16);
    assert!(cluster.router(1).add_message(NodeId(1), &payload(9, 1000)));
    let got = cluster.router(1).receive().context("loopback missing")?;
    assert_eq!(got.source, NodeId(1));
    assert_eq!(got.payload.len(), 1000);
    assert_eq!(cluster.net.in_flight(NodeId(1)), 0);
    Ok(())
}

/// After removal nothing queued for the peer is ever sent.
#[test]
fn removed_peer_receives_nothing() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3], 100, 65536);
    cluster.full_mesh(1.0)?;

    for _ in 0..5 {
        assert!(cluster.router(1).add_message(NodeId(2), &payload(2, 32)));
        assert!(cluster.router(1).add_message(NodeId(3), &payload(3, 32)));
    }
    cluster.tick();
    let early = cluster.received(2).len();

    assert_eq!(cluster.router(1).remove_server(NodeId(2))?, 5 - early);
    for _ in 0..10 {
        cluster.tick();
    }
    assert!(cluster.received(2).is_empty());
    assert_eq!(cluster.received(3).len(), 5);

    let sent_to_removed = cluster
        .node(1)
        .sent
        .records()
        .iter()
        .filter(|r| r.dest == NodeId(2))
        .count();
    assert_eq!(sent_to_removed, early);
    Ok(())
}
