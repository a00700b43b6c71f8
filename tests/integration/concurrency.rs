//! Topology edits racing a render thread
//!
//! The render side only ever sees whole kernel snapshots, so every rendered frame is
//! either silence or a complete signal from one source.

use crate::helpers::*;
use cadenza::prelude::*;
use cadenza::RenderCallback;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const CHANNELS: usize = 2;
const BLOCK: usize = 256;

fn frame_is_whole(left: f32, right: f32, values: &[f32]) -> bool {
    (left == 0.0 && right == 0.0)
        || values.iter().any(|&v| left == v && right == v + 1.0)
}

fn spawn_renderer(
    graph: Arc<Graph>,
    config: cadenza::EngineConfig,
    stop: Arc<AtomicBool>,
    values: Vec<f32>,
) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut callback = RenderCallback::new(graph, &config).unwrap();
        let mut output = vec![0.0f32; BLOCK * CHANNELS];
        let mut blocks = 0;
        while !stop.load(Ordering::Acquire) {
            callback.process_interleaved(&mut output, CHANNELS);
            for frame in output.chunks_exact(CHANNELS) {
                assert!(
                    frame_is_whole(frame[0], frame[1], &values),
                    "torn frame: {frame:?}"
                );
            }
            blocks += 1;
        }
        blocks
    })
}

#[test]
fn test_connect_disconnect_while_rendering() {
    let engine = test_engine();
    let graph = engine.graph().clone();
    graph.start_render().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let values = vec![0.25, 0.5];
    let renderer = spawn_renderer(graph.clone(), engine.config().clone(), stop.clone(), values);

    for i in 0..500 {
        let source = constant_node(if i % 2 == 0 { 0.25 } else { 0.5 });
        let conn = engine.connect_to_output(&source).unwrap();
        thread::yield_now();
        match i % 3 {
            0 => graph.disconnect(&conn).unwrap(),
            1 => graph.detach(&source).unwrap(),
            _ => {
                graph.disconnect_input(engine.output().node(), None);
            }
        }
        drop(conn);
        drop(source);
    }

    stop.store(true, Ordering::Release);
    let blocks = renderer.join().expect("render thread panicked");
    assert!(blocks > 0);
    assert!(graph.connections().is_empty());
    graph.stop_render();
}

#[test]
fn test_route_edits_while_rendering() {
    let engine = test_engine();
    let graph = engine.graph().clone();
    let source = constant_node(0.5);
    let route = RouteNode::new();
    graph.connect(&source, route.node(), stereo()).unwrap();
    engine.connect_to_output(route.node()).unwrap();
    graph.start_render().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let renderer = spawn_renderer(graph.clone(), engine.config().clone(), stop.clone(), vec![0.5]);

    for i in 0..500 {
        if i % 2 == 0 {
            route.set_routes([Route::through(0, 0), Route::through(0, 1)]);
        } else {
            route.clear_routes();
        }
        thread::yield_now();
    }

    stop.store(true, Ordering::Release);
    renderer.join().expect("render thread panicked");
    graph.stop_render();
}

#[test]
fn test_released_nodes_are_skipped() {
    let engine = test_engine();
    let graph = engine.graph().clone();
    graph.start_render().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let renderer = spawn_renderer(graph.clone(), engine.config().clone(), stop.clone(), vec![0.75]);

    for _ in 0..200 {
        let tap = TapNode::new();
        let source = constant_node(0.75);
        graph.connect(&source, tap.node(), stereo()).unwrap();
        engine.connect_to_output(tap.node()).unwrap();
        thread::yield_now();
        graph.detach(&source).unwrap();
        drop(source);
        thread::yield_now();
        graph.detach(tap.node()).unwrap();
    }

    stop.store(true, Ordering::Release);
    renderer.join().expect("render thread panicked");
    assert!(engine.output().input_connections().is_empty());
    graph.stop_render();
    assert_eq!(graph.pending_release(), 0);
}
