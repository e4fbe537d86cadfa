use crate::*;

/// Two equal peers, 100 B/s, five 40-byte messages each: two releases per
/// tick, everything out after five ticks, 200 bytes apiece.
#[test]
fn equal_weights_split_evenly() -> Result<()> {
    // 8-byte header + 32-byte payload = 40 bytes on the wire
    let mut cluster = Cluster::new(&[1, 2, 3], 100, 65536);
    cluster.full_mesh(1.0)?;
    for _ in 0..5 {
        assert!(cluster.router(1).add_message(NodeId(2), &payload(2, 32)));
        assert!(cluster.router(1).add_message(NodeId(3), &payload(3, 32)));
    }

    cluster.tick();
    let first = cluster.node(1).sent.records();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].dest, NodeId(2));
    assert_eq!(first[1].dest, NodeId(3));

    for _ in 0..4 {
        cluster.tick();
    }
    let sent = &cluster.node(1).sent;
    assert_eq!(sent.records().len(), 10);
    assert_eq!(sent.total_bytes(NodeId(2)), 200);
    assert_eq!(sent.total_bytes(NodeId(3)), 200);
    assert_eq!(cluster.received(2).len(), 5);
    assert_eq!(cluster.received(3).len(), 5);
    assert_eq!(cluster.router(1).pending_bytes(), 0);
    Ok(())
}

/// Weights 1:3 under a saturated 400 B/s budget give a 1:3 byte split.
#[test]
fn weighted_split_tracks_weights() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3], 400, 1 << 20);
    cluster.router(1).set_server_weight(NodeId(2), 1.0)?;
    cluster.router(1).set_server_weight(NodeId(3), 3.0)?;

    for _ in 0..100 {
        for dest in [NodeId(2), NodeId(3)] {
            // keep both backlogs non-empty
            while cluster
                .router(1)
                .stats()
                .destinations
                .iter()
                .any(|q| q.dest == dest && q.queued_messages < 6)
            {
                assert!(cluster.router(1).add_message(dest, &payload(0, 92)));
            }
        }
        cluster.tick();
    }

    let sent = &cluster.node(1).sent;
    let ratio = sent.total_bytes(NodeId(3)) as f64 / sent.total_bytes(NodeId(2)) as f64;
    assert!((ratio - 3.0).abs() < 0.05, "observed ratio {ratio}");
    Ok(())
}

/// A light peer still gets served next to a heavily weighted one.
#[test]
fn light_peer_is_not_starved() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3], 1000, 1 << 20);
    cluster.router(1).set_server_weight(NodeId(2), 50.0)?;
    cluster.router(1).set_server_weight(NodeId(3), 1.0)?;

    assert!(cluster.router(1).add_message(NodeId(3), &payload(3, 92)));
    let mut served_at = None;
    for tick in 1..=100 {
        for _ in 0..20 {
            cluster.router(1).add_message(NodeId(2), &payload(2, 92));
        }
        cluster.tick();
        if !cluster.received(3).is_empty() {
            served_at = Some(tick);
            break;
        }
    }
    let tick = served_at.context("peer 3 never served")?;
    assert!(tick <= 2, "peer 3 waited {tick} ticks");
    Ok(())
}

/// Reweighting mid-run shifts the split from the following tick on.
#[test]
fn reweighting_shifts_share() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3], 400, 1 << 20);
    cluster.full_mesh(1.0)?;

    let run = |cluster: &mut Cluster, ticks: usize| -> (usize, usize) {
        let before = (
            cluster.node(1).sent.total_bytes(NodeId(2)),
            cluster.node(1).sent.total_bytes(NodeId(3)),
        );
        for _ in 0..ticks {
            for dest in [NodeId(2), NodeId(3)] {
                for _ in 0..4 {
                    cluster.router(1).add_message(dest, &payload(0, 92));
                }
            }
            cluster.tick();
        }
        (
            cluster.node(1).sent.total_bytes(NodeId(2)) - before.0,
            cluster.node(1).sent.total_bytes(NodeId(3)) - before.1,
        )
    };

    let (to_2, to_3) = run(&mut cluster, 20);
    assert_eq!(to_2, to_3);

    cluster.router(1).set_server_weight(NodeId(3), 3.0)?;
    let (to_2, to_3) = run(&mut cluster, 40);
    let ratio = to_3 as f64 / to_2 as f64;
    assert!((ratio - 3.0).abs() < 0.1, "observed ratio {ratio}");
    Ok(())
}

/// A peer provisioned mid-run at the same weight as a busy heavy peer is
/// served on its first tick and splits evenly with it from then on, however
/// far a light neighbour's finish time has run ahead.
#[test]
fn late_peer_competes_from_the_current_service_point() -> Result<()> {
    let mut cluster = Cluster::new(&[1, 2, 3, 4], 1000, 1 << 20);
    cluster.router(1).set_server_weight(NodeId(2), 1.0)?;
    cluster.router(1).set_server_weight(NodeId(3), 100.0)?;

    let keep_backlogged = |cluster: &mut Cluster, dests: &[NodeId]| {
        for &dest in dests {
            while cluster
                .router(1)
                .stats()
                .destinations
                .iter()
                .any(|q| q.dest == dest && q.queued_messages < 20)
            {
                assert!(cluster.router(1).add_message(dest, &payload(0, 92)));
            }
        }
    };

    keep_backlogged(&mut cluster, &[NodeId(2), NodeId(3)]);
    cluster.tick();

    cluster.received(3);

    cluster.router(1).set_server_weight(NodeId(4), 100.0)?;
    let (mut to_heavy, mut to_late) = (0, 0);
    for _ in 0..10 {
        keep_backlogged(&mut cluster, &[NodeId(2), NodeId(3), NodeId(4)]);
        cluster.tick();
        let late = cluster.received(4).len();
        assert!(late > 0, "peer 4 waited a tick");
        to_heavy += cluster.received(3).len();
        to_late += late;
    }
    assert!(to_heavy.abs_diff(to_late) <= 2, "peer 3 {to_heavy}, peer 4 {to_late}");
    Ok(())
}
