//! Route node integration tests
//!
//! Drives route nodes through a headless engine so the whole pull chain is exercised:
//! I/O node -> route node -> sources.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use cadenza::prelude::*;

fn assert_channel(samples: &[f32], index: usize, expected: f32) {
    for &s in &channel(samples, 2, index) {
        assert_abs_diff_eq!(s, expected, epsilon = FLOAT_EPSILON);
    }
}

#[test]
fn test_mono_source_lands_on_right_channel() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let route = RouteNode::new();
    engine.graph().connect(&source, route.node(), mono()).unwrap();
    engine.connect_to_output(route.node()).unwrap();
    route.add_route(Route::between(0, 0, 0, 1));

    let samples = engine.render_offline(128).unwrap();
    assert_channel(&samples, 0, 0.0);
    assert_channel(&samples, 1, 0.5);
}

#[test]
fn test_empty_route_table_is_silent() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let route = RouteNode::new();
    engine.graph().connect(&source, route.node(), stereo()).unwrap();
    engine.connect_to_output(route.node()).unwrap();

    let samples = engine.render_offline(128).unwrap();
    assert!(is_silent(&samples));
    assert!(source.last_render_time().is_none());
}

#[test]
fn test_stereo_swap() {
    let engine = test_engine();
    let source = constant_node(0.25);
    let route = RouteNode::new();
    engine.graph().connect(&source, route.node(), stereo()).unwrap();
    engine.connect_to_output(route.node()).unwrap();
    route.set_routes([Route::between(0, 0, 0, 1), Route::between(0, 1, 0, 0)]);

    let samples = engine.render_offline(64).unwrap();
    assert_channel(&samples, 0, 1.25);
    assert_channel(&samples, 1, 0.25);
}

#[test]
fn test_two_mono_sources_share_output() {
    let engine = test_engine();
    let left = constant_node(0.1);
    let right = constant_node(0.9);
    let route = RouteNode::new();
    let graph = engine.graph();
    graph.connect_buses(&left, route.node(), 0, 0, mono()).unwrap();
    graph.connect_buses(&right, route.node(), 0, 1, mono()).unwrap();
    engine.connect_to_output(route.node()).unwrap();
    route.set_routes([Route::between(0, 0, 0, 0), Route::between(1, 0, 0, 1)]);

    let samples = engine.render_offline(64).unwrap();
    assert_channel(&samples, 0, 0.1);
    assert_channel(&samples, 1, 0.9);
}

#[test]
fn test_route_edits_apply_on_next_render() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let route = RouteNode::new();
    engine.graph().connect(&source, route.node(), mono()).unwrap();
    engine.connect_to_output(route.node()).unwrap();

    route.add_route(Route::through(0, 0));
    let first = engine.render_offline(32).unwrap();
    assert_channel(&first, 0, 0.5);
    assert_channel(&first, 1, 0.0);

    // same source point, new destination
    route.add_route(Route::between(0, 0, 0, 1));
    assert_eq!(route.routes().len(), 1);
    let second = engine.render_offline(32).unwrap();
    assert_channel(&second, 0, 0.0);
    assert_channel(&second, 1, 0.5);

    route.clear_routes();
    assert!(is_silent(&engine.render_offline(32).unwrap()));
}

#[test]
fn test_routes_out_of_channel_range_are_ignored() {
    let engine = test_engine();
    let source = constant_node(0.5);
    let route = RouteNode::new();
    engine.graph().connect(&source, route.node(), mono()).unwrap();
    engine.connect_to_output(route.node()).unwrap();
    route.set_routes([Route::between(0, 3, 0, 0), Route::between(0, 0, 0, 7)]);

    let samples = engine.render_offline(32).unwrap();
    assert!(is_silent(&samples));
}
