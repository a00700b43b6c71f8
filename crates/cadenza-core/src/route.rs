//! Channel routing between buses.
//!
//! A [`RouteNode`] reads its [`RouteSet`] from the kernel on every render and pulls each
//! connected source into a channel-remapped view of the destination buffer:
//!
//! ```text
//!   input bus 0 (2ch) ──┐  (0,0)->(0,1)       output bus 0
//!                       ├─ (0,1)->(0,0) ───►  ch0 <- in0.ch1
//!   input bus 1 (1ch) ──┘  (1,0)->(1,0)       ch1 <- in0.ch0
//!                                             output bus 1
//!                                             ch0 <- in1.ch0
//! ```
//!
//! # RT Safety
//!
//! Rendering walks the routes in place; no channel map is allocated.

use crate::buffer::RemappedBuffer;
use crate::compat::Arc;
use crate::node::{Extension, Node, NodeArgs, NodeKind, RenderContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A (bus, channel) pair on one side of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutePoint {
    pub bus: u32,
    pub channel: u32,
}

impl RoutePoint {
    pub fn new(bus: u32, channel: u32) -> Self {
        Self { bus, channel }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub source: RoutePoint,
    pub destination: RoutePoint,
}

impl Route {
    pub fn new(source: RoutePoint, destination: RoutePoint) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn between(src_bus: u32, src_channel: u32, dst_bus: u32, dst_channel: u32) -> Self {
        Self::new(
            RoutePoint::new(src_bus, src_channel),
            RoutePoint::new(dst_bus, dst_channel),
        )
    }

    /// Same bus and channel on both sides.
    pub fn through(bus: u32, channel: u32) -> Self {
        Self::between(bus, channel, bus, channel)
    }
}

impl Ord for Route {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (
            self.source.bus,
            self.destination.bus,
            self.source.channel,
            self.destination.channel,
        )
            .cmp(&(
                other.source.bus,
                other.destination.bus,
                other.source.channel,
                other.destination.channel,
            ))
    }
}

impl PartialOrd for Route {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Routing table. Each source point and each destination point appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSet {
    routes: BTreeSet<Route>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `route`, replacing any route that shares its source or destination point.
    pub fn insert(&mut self, route: Route) {
        self.routes
            .retain(|r| r.source != route.source && r.destination != route.destination);
        self.routes.insert(route);
    }

    pub fn remove(&mut self, route: &Route) -> bool {
        self.routes.remove(route)
    }

    pub fn remove_source(&mut self, source: RoutePoint) -> bool {
        let before = self.routes.len();
        self.routes.retain(|r| r.source != source);
        before != self.routes.len()
    }

    pub fn remove_destination(&mut self, destination: RoutePoint) -> bool {
        let before = self.routes.len();
        self.routes.retain(|r| r.destination != destination);
        before != self.routes.len()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.routes.contains(route)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> + '_ {
        self.routes.iter()
    }

    /// Destination channel that `src_channel` on `src_bus` feeds on `dst_bus`, if it is
    /// below `dst_channels`.
    pub fn destination_channel(
        &self,
        src_bus: u32,
        src_channel: u32,
        dst_bus: u32,
        dst_channels: u32,
    ) -> Option<u32> {
        self.routes
            .iter()
            .find(|r| {
                r.source.bus == src_bus
                    && r.source.channel == src_channel
                    && r.destination.bus == dst_bus
            })
            .map(|r| r.destination.channel)
            .filter(|&ch| ch < dst_channels)
    }

    /// Whether any route carries a channel of `src_bus` into `dst_bus` within both channel
    /// counts.
    pub fn connects(&self, src_bus: u32, src_channels: u32, dst_bus: u32, dst_channels: u32) -> bool {
        self.routes.iter().any(|r| {
            r.source.bus == src_bus
                && r.destination.bus == dst_bus
                && r.source.channel < src_channels
                && r.destination.channel < dst_channels
        })
    }
}

impl FromIterator<Route> for RouteSet {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        let mut set = RouteSet::new();
        for route in iter {
            set.insert(route);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RouteSet {
    type Item = &'a Route;
    type IntoIter = std::collections::btree_set::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

/// Render destination bus `cx.bus()` from every routed input.
pub(crate) fn render(routes: &RouteSet, cx: &mut RenderContext<'_>) {
    cx.buffer.clear();

    let dst_bus = cx.bus;
    let dst_channels = cx.buffer.channel_count() as u32;
    let kernel = cx.kernel;

    for (src_bus, connection) in kernel.input_connections() {
        let src_channels = connection.format().channel_count();
        if !routes.connects(src_bus, src_channels, dst_bus, dst_channels) {
            continue;
        }
        let Some(source) = connection.source_node() else {
            continue;
        };
        let mut view = RemappedBuffer::new(&mut *cx.buffer, src_channels, |ch| {
            routes
                .destination_channel(src_bus, ch as u32, dst_bus, dst_channels)
                .map(|ch| ch as usize)
        });
        source.render(&mut view, connection.source_bus(), cx.when);
    }
}

/// Node that remaps source (bus, channel) points to destination points.
#[derive(Debug, Clone)]
pub struct RouteNode {
    node: Arc<Node>,
}

impl RouteNode {
    /// Route node with unbounded buses on both sides.
    pub fn new() -> Self {
        Self::with_args(NodeArgs::unbounded())
    }

    pub fn with_args(args: NodeArgs) -> Self {
        Self {
            node: Node::with_extension(NodeKind::Route, args, Extension::Routes(RouteSet::new())),
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn routes(&self) -> RouteSet {
        self.node.read_extension(|ext| match ext {
            Extension::Routes(routes) => routes.clone(),
            _ => RouteSet::new(),
        })
    }

    pub fn add_route(&self, route: Route) {
        self.edit(|routes| routes.insert(route));
    }

    pub fn remove_route(&self, route: &Route) -> bool {
        self.edit(|routes| routes.remove(route))
    }

    pub fn remove_route_for_source(&self, source: RoutePoint) -> bool {
        self.edit(|routes| routes.remove_source(source))
    }

    pub fn remove_route_for_destination(&self, destination: RoutePoint) -> bool {
        self.edit(|routes| routes.remove_destination(destination))
    }

    /// Replace the whole table. Conflicting routes resolve last-write-wins in iteration order.
    pub fn set_routes<I: IntoIterator<Item = Route>>(&self, routes: I) {
        let table: RouteSet = routes.into_iter().collect();
        self.edit(|routes| *routes = table);
    }

    pub fn clear_routes(&self) {
        self.edit(RouteSet::clear);
    }

    fn edit<R: Default>(&self, f: impl FnOnce(&mut RouteSet) -> R) -> R {
        self.node.update_extension(|ext| match ext {
            Extension::Routes(routes) => f(routes),
            _ => R::default(),
        })
    }
}

impl Default for RouteNode {
    fn default() -> Self {
        Self::new()
    }
}

impl core::ops::Deref for RouteNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}
