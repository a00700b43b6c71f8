//! Audio graph integration tests
//!
//! Bus bookkeeping, connect/disconnect symmetry, detach, and signal flow through
//! user-defined nodes.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use cadenza::core::Error as CoreError;
use cadenza::prelude::*;
use cadenza::{BusSide, NodeEvent, UNBOUNDED_BUSES};

fn f44() -> Format {
    Format::float32(44100.0, 2)
}

#[test]
fn test_single_bus_scenario() {
    let graph = Graph::new();
    let a = Node::new(NodeArgs::new(1, 1));
    let b = Node::new(NodeArgs::new(1, 1));

    let conn = graph.connect_buses(&a, &b, 0, 0, f44()).unwrap();
    assert_eq!(a.next_available_output_bus(), None);
    assert_eq!(a.output_format(0), Some(f44()));
    assert_eq!(b.input_format(0), Some(f44()));

    graph.disconnect(&conn).unwrap();
    assert!(a.is_available_output_bus(0));
    assert!(b.is_available_input_bus(0));
}

#[test]
fn test_multi_bus_next_available() {
    let graph = Graph::new();
    let a = Node::new(NodeArgs::new(0, 4));
    let b = Node::new(NodeArgs::new(1, 1));

    graph.connect_buses(&a, &b, 0, 0, f44()).unwrap();
    assert_eq!(a.next_available_output_bus(), Some(1));
}

#[test]
fn test_connect_disconnect_is_idempotent() {
    let graph = Graph::new();
    let a = Node::new(NodeArgs::new(2, 3));
    let b = Node::new(NodeArgs::new(3, 2));
    let other = Node::new(NodeArgs::generator());
    let _keep = graph.connect_buses(&other, &b, 0, 0, f44()).unwrap();

    let before = (
        a.next_available_output_bus(),
        a.next_available_input_bus(),
        b.next_available_input_bus(),
        b.next_available_output_bus(),
    );
    let conn = graph.connect(&a, &b, f44()).unwrap();
    assert_eq!(conn.source_bus(), 0);
    assert_eq!(conn.destination_bus(), 1);
    graph.disconnect(&conn).unwrap();
    let after = (
        a.next_available_output_bus(),
        a.next_available_input_bus(),
        b.next_available_input_bus(),
        b.next_available_output_bus(),
    );
    assert_eq!(before, after);
    assert!(graph.contains(&b));
    assert!(!graph.contains(&a));
}

#[test]
fn test_second_connect_to_occupied_bus_keeps_first() {
    let graph = Graph::new();
    let a = Node::new(NodeArgs::new(0, 2));
    let b = Node::new(NodeArgs::new(1, 1));

    let first = graph.connect_buses(&a, &b, 0, 0, f44()).unwrap();
    let err = graph.connect_buses(&a, &b, 1, 0, f44()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::BusOccupied {
            side: BusSide::Input,
            bus: 0
        }
    ));
    assert_eq!(b.input_connections().len(), 1);
    assert_eq!(b.kernel().input_connection(0).unwrap().id(), first.id());
    assert!(a.is_available_output_bus(1));
}

#[test]
fn test_buses_hold_at_most_one_connection() {
    let graph = Graph::new();
    let mixer = Node::new(NodeArgs::new(UNBOUNDED_BUSES, 1));
    let sources: Vec<_> = (0..8).map(|_| Node::new(NodeArgs::new(0, 2))).collect();

    for source in &sources {
        graph.connect(source, &mixer, f44()).unwrap();
        graph.connect(source, &mixer, f44()).unwrap();
    }
    for source in sources.iter().step_by(3) {
        graph.disconnect_output(source, Some(1));
    }
    for source in sources.iter().step_by(3) {
        graph.connect(source, &mixer, f44()).unwrap();
    }

    let mut inputs: Vec<u32> = mixer.input_connections().iter().map(|(bus, _)| *bus).collect();
    let total = inputs.len();
    inputs.dedup();
    assert_eq!(inputs.len(), total);
    assert_eq!(total, 16);
    for source in &sources {
        let mut outputs: Vec<u32> = source
            .output_connections()
            .iter()
            .map(|(bus, _)| *bus)
            .collect();
        outputs.dedup();
        assert_eq!(outputs, vec![0, 1]);
    }
}

#[test]
fn test_detach_removes_every_connection() {
    let graph = Graph::new();
    let hub = Node::new(NodeArgs::new(2, 2));
    let ins: Vec<_> = (0..2).map(|_| Node::new(NodeArgs::generator())).collect();
    let outs: Vec<_> = (0..2).map(|_| Node::new(NodeArgs::new(1, 0))).collect();
    for source in &ins {
        graph.connect(source, &hub, f44()).unwrap();
    }
    for sink in &outs {
        graph.connect(&hub, sink, f44()).unwrap();
    }
    let captured_hub = hub.kernel();
    let captured_sink = outs[0].kernel();

    graph.detach(&hub).unwrap();
    assert!(graph.connections().is_empty());
    assert!(!hub.has_connections());
    for node in ins.iter().chain(&outs) {
        assert!(!node.has_connections());
        assert!(!graph.contains(node));
    }

    for bus in 0..2 {
        let source = captured_hub
            .input_connection(bus)
            .and_then(|conn| conn.source_node());
        assert!(source.is_none());
    }
    let upstream = captured_sink
        .input_connection(0)
        .and_then(|conn| conn.source_node());
    assert!(upstream.is_none());

    let mut buffer = PcmBuffer::new(f44(), 32).unwrap();
    hub.render(&mut buffer, 0, &RenderTime::new(0, 44100.0));
}

#[test]
fn test_reset_keeps_node_reusable() {
    let graph = Graph::new();
    let a = Node::new(NodeArgs::generator());
    let b = Node::new(NodeArgs::new(1, 1));
    let events = b.subscribe();
    let conn = graph.connect(&a, &b, f44()).unwrap();

    graph.disconnect(&conn).unwrap();
    b.reset();
    assert_eq!(events.try_recv(), Ok(NodeEvent::WillReset));
    graph.connect(&a, &b, f44()).unwrap();
    assert_eq!(b.input_connections().len(), 1);
}

#[test]
fn test_signal_flows_through_chain() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let gain = Node::with_render_fn(NodeArgs::new(1, 1), |cx| {
        if cx.render_input(0) {
            for ch in 0..cx.buffer().channel_count() {
                if let Some(samples) = cx.buffer_mut().channel_mut(ch) {
                    samples.iter_mut().for_each(|s| *s *= 0.5);
                }
            }
        }
    });
    let format = engine.output_format();
    engine.graph().connect(&source, &gain, format).unwrap();
    engine.connect_to_output(&gain).unwrap();

    let samples = engine.render_offline(256).unwrap();
    for &s in &channel(&samples, 2, 0) {
        assert_abs_diff_eq!(s, 0.25, epsilon = FLOAT_EPSILON);
    }
    for &s in &channel(&samples, 2, 1) {
        assert_abs_diff_eq!(s, 0.75, epsilon = FLOAT_EPSILON);
    }
    assert!(source.last_render_time().is_some());
}

#[test]
fn test_tap_swaps_processing_between_renders() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let tap = TapNode::new();
    engine
        .graph()
        .connect(&source, tap.node(), engine.output_format())
        .unwrap();
    engine.connect_to_output(tap.node()).unwrap();

    let dry = engine.render_offline(64).unwrap();
    assert_abs_diff_eq!(dry[0], 0.5, epsilon = FLOAT_EPSILON);

    tap.set_render_fn(|cx| {
        cx.buffer_mut().clear();
    });
    let muted = engine.render_offline(64).unwrap();
    assert!(is_silent(&muted));
    assert!(source.last_render_time().is_some());

    tap.clear_render_fn();
    let restored = engine.render_offline(64).unwrap();
    assert_abs_diff_eq!(restored[1], 1.5, epsilon = FLOAT_EPSILON);
}

#[test]
fn test_graph_rejects_released_nodes() {
    let a = Node::new(NodeArgs::generator());
    let weak = Arc::downgrade(&Node::new(NodeArgs::default()));
    let result = Connection::new(&Arc::downgrade(&a), 0, &weak, 0, f44());
    assert!(matches!(result, Err(CoreError::NodeReleased)));
}
