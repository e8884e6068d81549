//! Propagation properties of flood routing over whole networks.
//!
//! These tests drive the runner end to end against the in-memory sighting
//! store and check latency, duplicate and termination behavior on known
//! shapes and on seeded random graphs.

use gossipsim_core::EventSink;
use gossipsim_simulation::{BucketedSource, SimulationConfig, SimulationRunner, TickResult};
use gossipsim_storage::{RunSightings, SightingDb};
use gossipsim_test_helpers::{
    grid, line, message, node_key, random_cyclic_graph, random_tree, ring, update,
};
use gossipsim_types::{MessageUuid, NodeKey, Tick, Topology};
use std::collections::BTreeMap;
use tracing_test::traced_test;

/// Run a topology to completion and return the run's sink.
fn simulate(topology: &Topology, source: &BucketedSource, config: SimulationConfig) -> RunSightings {
    let db = SightingDb::new();
    let sink = db.open_run("test").unwrap();
    let mut runner = SimulationRunner::from_topology(topology, config);
    runner.run(source, &sink).unwrap();
    sink
}

fn first_seen_by_node(sink: &RunSightings, uuid: i64) -> BTreeMap<NodeKey, u64> {
    sink.sightings(MessageUuid(uuid))
        .unwrap()
        .into_iter()
        .map(|row| (row.node, row.first_seen.0))
        .collect()
}

/// Line A-B-C; M1 at A and M2 at B on tick 0, M3 at C on tick 1.
#[traced_test]
#[test]
fn test_line_scenario_has_no_duplicates() {
    let topology = line(&["A", "B", "C"]);
    let source: BucketedSource = [
        (Tick(0), message(1, "A")),
        (Tick(0), message(2, "B")),
        (Tick(1), message(3, "C")),
    ]
    .into_iter()
    .collect();

    let sink = simulate(&topology, &source, SimulationConfig::default());

    for uuid in 1..=3 {
        let rows = sink.sightings(MessageUuid(uuid)).unwrap();
        assert_eq!(rows.len(), 3, "message {uuid} should reach every node");
        assert_eq!(sink.duplicate_count(MessageUuid(uuid)).unwrap(), 0);
    }
    assert_eq!(sink.latency(MessageUuid(1)).unwrap(), 2);
    assert_eq!(sink.latency(MessageUuid(2)).unwrap(), 1);
    assert_eq!(sink.latency(MessageUuid(3)).unwrap(), 2);
    assert_eq!(first_seen_by_node(&sink, 3)[&NodeKey::new("A")], 3);
}

/// Square A-B-C-D; C hears M1 from both B and D.
#[traced_test]
#[test]
fn test_four_cycle_scenario_has_one_duplicate() {
    let topology =
        Topology::from_edges([("A", "B"), ("A", "D"), ("B", "C"), ("C", "D")]).unwrap();
    let source: BucketedSource = [(Tick(0), message(1, "A"))].into_iter().collect();

    let sink = simulate(&topology, &source, SimulationConfig::default());

    assert_eq!(sink.duplicate_count(MessageUuid(1)).unwrap(), 1);
    assert_eq!(sink.duplicate_bucket(MessageUuid(1), 0).unwrap(), 4);
    assert_eq!(sink.duplicate_bucket(MessageUuid(1), 1).unwrap(), 1);

    let rows = sink.sightings(MessageUuid(1)).unwrap();
    let opposite = rows.iter().find(|r| r.node.as_str() == "C").unwrap();
    assert_eq!(opposite.seen_count, 2);
    assert_eq!(opposite.first_seen, Tick(2));
    assert_eq!(opposite.last_seen, Tick(2));
}

#[test]
fn test_line_latency_is_one_tick_per_hop() {
    let topology = line(&["A", "B", "C"]);
    let source: BucketedSource = [(Tick(0), message(1, "A"))].into_iter().collect();

    let sink = simulate(&topology, &source, SimulationConfig::default());

    assert_eq!(sink.latency(MessageUuid(1)).unwrap(), 2);
    // Latencies 0, 1, 2 over two non-origin recipients.
    assert_eq!(sink.average_latency(MessageUuid(1)).unwrap(), 1.5);
}

#[test]
fn test_trees_never_produce_duplicates() {
    for seed in 0..20u64 {
        let topology = random_tree(40, seed);
        assert!(topology.is_acyclic());

        let source: BucketedSource = (0..5)
            .map(|i| {
                let origin = node_key((seed as usize * 7 + i * 11) % 40);
                (Tick(i as u64), message(i as i64, origin.as_str()))
            })
            .collect();

        let sink = simulate(&topology, &source, SimulationConfig::default());
        for uuid in sink.distinct_message_ids() {
            assert_eq!(
                sink.duplicate_count(uuid).unwrap(),
                0,
                "seed {seed}: message {uuid} duplicated on a tree"
            );
            assert_eq!(sink.sightings(uuid).unwrap().len(), 40);
        }
    }
}

#[test]
fn test_cycles_produce_at_least_one_duplicate() {
    for seed in 0..20u64 {
        let topology = random_cyclic_graph(30, 1 + seed as usize % 4, seed);
        assert!(!topology.is_acyclic());

        let source: BucketedSource = [(Tick(0), message(1, node_key(0).as_str()))]
            .into_iter()
            .collect();
        let sink = simulate(&topology, &source, SimulationConfig::default());

        assert!(
            sink.duplicate_count(MessageUuid(1)).unwrap() >= 1,
            "seed {seed}: cycle reachable from origin but no duplicate"
        );
    }

    let source: BucketedSource = [(Tick(0), message(1, node_key(0).as_str()))]
        .into_iter()
        .collect();
    // Even ring: the antipode hears it from both sides.
    let sink = simulate(&ring(6), &source, SimulationConfig::default());
    assert_eq!(sink.duplicate_count(MessageUuid(1)).unwrap(), 1);

    // Odd ring: the two farthest nodes swap copies on the last tick.
    let sink = simulate(&ring(7), &source, SimulationConfig::default());
    assert_eq!(sink.duplicate_count(MessageUuid(1)).unwrap(), 2);
    assert_eq!(sink.duplicate_bucket(MessageUuid(1), 1).unwrap(), 2);
}

#[test]
fn test_first_contact_equals_hop_distance() {
    let topologies = [grid(5, 4), random_cyclic_graph(25, 6, 99), random_tree(25, 7)];

    for topology in &topologies {
        let origin = node_key(3);
        let source: BucketedSource = [(Tick(0), message(1, origin.as_str()))]
            .into_iter()
            .collect();
        let sink = simulate(topology, &source, SimulationConfig::default());

        let distances = topology.hop_distances(&origin);
        let first_seen = first_seen_by_node(&sink, 1);
        assert_eq!(first_seen, distances);

        let eccentricity = distances.values().copied().max().unwrap();
        assert_eq!(sink.latency(MessageUuid(1)).unwrap(), eccentricity);
    }
}

#[test]
fn test_latency_grows_with_line_length() {
    let mut previous = 0;
    for len in 2..8usize {
        let keys: Vec<String> = (0..len).map(|i| format!("L{i}")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let source: BucketedSource = [(Tick(0), message(1, "L0"))].into_iter().collect();

        let sink = simulate(&line(&refs), &source, SimulationConfig::default());
        let latency = sink.latency(MessageUuid(1)).unwrap();
        assert_eq!(latency, len as u64 - 1);
        assert!(latency >= previous);
        previous = latency;
    }
}

#[test]
fn test_termination_is_idempotent() {
    let db = SightingDb::new();
    let sink = db.open_run("idempotent").unwrap();
    let mut runner = SimulationRunner::from_topology(&grid(3, 3), SimulationConfig::default());
    let source: BucketedSource = [(Tick(0), message(1, node_key(0).as_str()))]
        .into_iter()
        .collect();

    let mut last = TickResult::default();
    while !last.done {
        last = runner.tick(&source, &sink).unwrap();
    }
    assert_eq!(last.queued, 0);
    let rows_before = sink.rows();

    let again = runner.tick(&source, &sink).unwrap();
    assert!(again.done);
    assert_eq!(again.queued, 0);
    assert_eq!(again.peers_known, 0);
    assert_eq!(sink.rows(), rows_before);
}

#[test]
fn test_message_on_final_bucket_still_propagates() {
    let source: BucketedSource = [(Tick(3), message(1, "A"))].into_iter().collect();
    let sink = simulate(&line(&["A", "B", "C", "D"]), &source, SimulationConfig::default());

    let first_seen = first_seen_by_node(&sink, 1);
    assert_eq!(first_seen[&NodeKey::new("A")], 3);
    assert_eq!(first_seen[&NodeKey::new("D")], 6);
}

#[test]
fn test_no_delivery_echoes_back_to_its_supplier() {
    let db = SightingDb::new();
    let sink = db.open_run("echo").unwrap();
    let topology = random_cyclic_graph(20, 8, 5);
    let mut runner = SimulationRunner::from_topology(&topology, SimulationConfig::default());
    let source: BucketedSource = (0..4)
        .map(|i| (Tick(i), message(i as i64, node_key(i as usize * 4).as_str())))
        .collect();

    loop {
        let (deliveries, _) = runner.plan_deliveries();
        for d in &deliveries {
            assert_ne!(d.from, d.to);
            assert_ne!(
                d.to, d.received_from,
                "{} relayed message {} back to {}",
                d.from, d.message.uuid, d.to
            );
        }
        if runner.tick(&source, &sink).unwrap().done {
            break;
        }
    }
}

#[test]
fn test_superseding_update_floods_again() {
    let topology = line(&["A", "B", "C"]);
    let source: BucketedSource = [
        (Tick(0), update(1, "chan", "A", 100)),
        (Tick(3), update(2, "chan", "A", 200)),
    ]
    .into_iter()
    .collect();

    let sink = simulate(&topology, &source, SimulationConfig::default());

    assert_eq!(sink.sightings(MessageUuid(2)).unwrap().len(), 3);
    assert_eq!(sink.latency(MessageUuid(2)).unwrap(), 2);
    assert_eq!(sink.duplicate_count(MessageUuid(2)).unwrap(), 0);
}

#[test]
fn test_stale_update_is_seen_but_not_relayed() {
    let topology = line(&["A", "B", "C"]);
    let source: BucketedSource = [
        (Tick(0), update(1, "chan", "A", 200)),
        (Tick(3), update(2, "chan", "B", 100)),
    ]
    .into_iter()
    .collect();

    let sink = simulate(&topology, &source, SimulationConfig::default());

    let rows = sink.sightings(MessageUuid(2)).unwrap();
    assert_eq!(rows.len(), 1, "only the origin sees an outdated update");
    assert_eq!(rows[0].node, NodeKey::new("B"));
}

#[test]
fn test_parallel_fanout_matches_serial() {
    let topology = random_cyclic_graph(60, 25, 11);
    let source: BucketedSource = (0..10)
        .map(|i| (Tick(i / 3), message(i as i64, node_key(i as usize * 5).as_str())))
        .collect();

    let serial = simulate(&topology, &source, SimulationConfig::default());
    let parallel = simulate(
        &topology,
        &source,
        SimulationConfig::default().with_parallel_fanout(true),
    );

    assert_eq!(serial.rows(), parallel.rows());
}

#[traced_test]
#[test]
fn test_topology_gaps_do_not_abort() {
    let db = SightingDb::new();
    let sink = db.open_run("gaps").unwrap();
    let mut runner = SimulationRunner::from_topology(&line(&["A", "B"]), SimulationConfig::default());
    let source: BucketedSource = [
        (Tick(0), message(1, "A")),
        (Tick(0), message(2, "missing")),
    ]
    .into_iter()
    .collect();

    let stats = runner.run(&source, &sink).unwrap();

    assert_eq!(stats.nodes_known, 1);
    assert_eq!(stats.nodes_unknown, 1);
    assert_eq!(stats.unknown_node_ratio(), 0.5);
    assert_eq!(stats.node_count, 2);
    assert_eq!(sink.distinct_message_ids(), vec![MessageUuid(1)]);
}

#[test]
fn test_sink_failure_aborts_run() {
    use gossipsim_core::{SightingRecord, SinkError};

    struct FailingSink;

    impl EventSink for FailingSink {
        fn record_sighting(&self, _: MessageUuid, _: &NodeKey, _: Tick) -> Result<(), SinkError> {
            Err(SinkError::Persistence("disk full".to_string()))
        }

        fn sightings(&self, uuid: MessageUuid) -> Result<Vec<SightingRecord>, SinkError> {
            Err(SinkError::UnknownMessage(uuid))
        }

        fn distinct_message_ids(&self) -> Vec<MessageUuid> {
            Vec::new()
        }
    }

    let mut runner = SimulationRunner::from_topology(&line(&["A", "B"]), SimulationConfig::default());
    let source: BucketedSource = [(Tick(0), message(1, "A"))].into_iter().collect();

    let err = runner.run(&source, &FailingSink).unwrap_err();
    assert!(err.to_string().contains("disk full"));
    assert_eq!(runner.current_tick(), Tick(0));
}
