//! Graph topology management.
//!
//! The [`Graph`] owns every attached node and every connection it created. All mutation runs on
//! the management context under one structural lock; the render context only touches the
//! designated [`IoNode`] through an atomically swapped reference and each node's kernel.
//!
//! Lock order is graph, then node, then connection. Nodes never call back into the graph.

use crate::buffer::AudioBuffer;
use crate::compat::{Arc, HashMap, HashSet, Mutex};
use crate::connection::{Connection, ConnectionId};
use crate::error::BusSide;
use crate::format::Format;
use crate::io::IoNode;
use crate::kernel::KernelPayload;
use crate::lockfree::{AtomicFlag, RetireList};
use crate::node::{Node, NodeId, NodeKind};
use crate::notify::Notifier;
use crate::time::RenderTime;
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use crossbeam_channel::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// Topology changed. Bridges use this to decide whether to renegotiate device formats.
    ConfigurationChanged,
    NodeAttached(NodeId),
    NodeDetached(NodeId),
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<NodeId, Arc<Node>>,
    connections: HashMap<ConnectionId, Arc<Connection>>,
    pinned: HashSet<NodeId>,
    io: Option<IoNode>,
    retired: RetireList<Connection>,
    retired_nodes: RetireList<Node>,
}

#[derive(Default)]
struct Changes {
    disconnected: usize,
    events: Vec<GraphEvent>,
}

pub struct Graph {
    state: Mutex<GraphState>,
    io: ArcSwapOption<Node>,
    running: AtomicFlag,
    events: Notifier<GraphEvent>,
}

impl core::fmt::Debug for Graph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Graph")
            .field("nodes", &state.nodes.len())
            .field("connections", &state.connections.len())
            .field("running", &self.running.get())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState::default()),
            io: ArcSwapOption::empty(),
            running: AtomicFlag::new(false),
            events: Notifier::new(),
        }
    }

    pub fn subscribe(&self) -> Receiver<GraphEvent> {
        self.events.subscribe()
    }

    fn post(&self, events: Vec<GraphEvent>) {
        for event in events {
            self.events.post(event);
        }
    }

    // -- Nodes --

    pub fn attach(&self, node: &Arc<Node>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !Self::attach_locked(&mut state, node) {
                return Err(Error::NodeAlreadyAttached);
            }
        }
        self.events.post(GraphEvent::NodeAttached(node.id()));
        Ok(())
    }

    fn attach_locked(state: &mut GraphState, node: &Arc<Node>) -> bool {
        if state.nodes.contains_key(&node.id()) {
            return false;
        }
        state.nodes.insert(node.id(), node.clone());
        tracing::debug!(node = %node.id(), kind = ?node.kind(), "attached node");
        true
    }

    /// Disconnect everything touching `node` and release the graph's reference to it.
    pub fn detach(&self, node: &Arc<Node>) -> Result<()> {
        let changes = {
            let mut state = self.state.lock();
            if !state.nodes.contains_key(&node.id()) {
                return Err(Error::NodeNotAttached);
            }
            let mut changes = self.disconnect_where(&mut state, |conn| conn.touches(node));
            Self::detach_locked(&mut state, node, &mut changes);
            if state
                .io
                .as_ref()
                .is_some_and(|io| Arc::ptr_eq(io.node(), node))
            {
                state.io = None;
                self.io.store(None);
            }
            Self::collect_locked(&mut state);
            changes
        };
        self.post(changes.events);
        Ok(())
    }

    fn detach_locked(state: &mut GraphState, node: &Arc<Node>, changes: &mut Changes) {
        state.pinned.remove(&node.id());
        if let Some(owned) = state.nodes.remove(&node.id()) {
            // A renderer may still hold the node; its last release happens in `collect_locked`.
            state.retired_nodes.retire(owned);
            tracing::debug!(node = %node.id(), "detached node");
            changes.events.push(GraphEvent::NodeDetached(node.id()));
        }
    }

    /// Free retired kernels, nodes and connections nothing can reach any more.
    ///
    /// Kernels go first since they hold the last weak handles to retired connections.
    fn collect_locked(state: &mut GraphState) -> usize {
        for node in state.nodes.values().chain(state.retired_nodes.iter()) {
            node.collect_retired();
        }
        state.retired_nodes.collect();
        state.retired.collect() + state.retired_nodes.len()
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.state.lock().nodes.contains_key(&node.id())
    }

    /// Attached nodes, ordered by id.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        let mut nodes: Vec<_> = self.state.lock().nodes.values().cloned().collect();
        nodes.sort_by_key(|node| node.id());
        nodes
    }

    // -- Designated I/O node --

    /// The graph's I/O node, created and pinned on first call.
    pub fn add_io(&self) -> IoNode {
        let io = {
            let mut state = self.state.lock();
            if let Some(io) = &state.io {
                return io.clone();
            }
            let io = IoNode::new();
            Self::attach_locked(&mut state, io.node());
            state.pinned.insert(io.id());
            state.io = Some(io.clone());
            self.io.store(Some(io.node().clone()));
            io
        };
        self.events.post(GraphEvent::NodeAttached(io.id()));
        io
    }

    pub fn remove_io(&self) -> Result<()> {
        let io = self.state.lock().io.clone();
        match io {
            Some(io) => self.detach(io.node()),
            None => Ok(()),
        }
    }

    pub fn io(&self) -> Option<IoNode> {
        self.state.lock().io.clone()
    }

    // -- Connections --

    /// Connect on the next free output bus of `source` and input bus of `destination`.
    pub fn connect(
        &self,
        source: &Arc<Node>,
        destination: &Arc<Node>,
        format: Format,
    ) -> Result<Arc<Connection>> {
        let source_bus = source
            .next_available_output_bus()
            .ok_or(Error::BusExhausted {
                side: BusSide::Output,
            })?;
        let destination_bus = destination
            .next_available_input_bus()
            .ok_or(Error::BusExhausted {
                side: BusSide::Input,
            })?;
        self.connect_buses(source, destination, source_bus, destination_bus, format)
    }

    /// Connect output `source_bus` of `source` to input `destination_bus` of `destination`.
    pub fn connect_buses(
        &self,
        source: &Arc<Node>,
        destination: &Arc<Node>,
        source_bus: u32,
        destination_bus: u32,
        format: Format,
    ) -> Result<Arc<Connection>> {
        let source_bus = source.resolve_output_bus(source_bus);
        let mut events = Vec::new();

        let connection = {
            let mut state = self.state.lock();

            if !source.has_output_bus(source_bus) {
                return Err(Error::BusOutOfRange {
                    side: BusSide::Output,
                    bus: source_bus,
                });
            }
            if !destination.has_input_bus(destination_bus) {
                return Err(Error::BusOutOfRange {
                    side: BusSide::Input,
                    bus: destination_bus,
                });
            }
            if !source.is_available_output_bus(source_bus) {
                return Err(Error::BusOccupied {
                    side: BusSide::Output,
                    bus: source_bus,
                });
            }
            if !destination.is_available_input_bus(destination_bus) {
                return Err(Error::BusOccupied {
                    side: BusSide::Input,
                    bus: destination_bus,
                });
            }
            if let Some(expected) = source.declared_output_format(source_bus) {
                if expected != format {
                    return Err(Error::FormatMismatch {
                        side: BusSide::Output,
                        bus: source_bus,
                        expected,
                        actual: format,
                    });
                }
            }
            if let Some(expected) = destination.declared_input_format(destination_bus) {
                if expected != format {
                    return Err(Error::FormatMismatch {
                        side: BusSide::Input,
                        bus: destination_bus,
                        expected,
                        actual: format,
                    });
                }
            }
            if Arc::ptr_eq(source, destination) || Self::reaches(destination, source) {
                return Err(Error::CycleDetected);
            }

            let connection = Connection::new(
                &Arc::downgrade(source),
                source_bus,
                &Arc::downgrade(destination),
                destination_bus,
                format,
            )?;
            source.add_connection(&connection)?;
            if let Err(err) = destination.add_connection(&connection) {
                source.remove_connection(&connection);
                return Err(err);
            }

            for node in [source, destination] {
                if Self::attach_locked(&mut state, node) {
                    events.push(GraphEvent::NodeAttached(node.id()));
                }
            }
            state
                .connections
                .insert(connection.id(), connection.clone());
            Self::collect_locked(&mut state);

            tracing::debug!(
                connection = %connection.id(),
                source = %source.id(),
                source_bus,
                destination = %destination.id(),
                destination_bus,
                channels = format.channel_count(),
                "connected"
            );
            connection
        };

        events.push(GraphEvent::ConfigurationChanged);
        self.post(events);
        Ok(connection)
    }

    /// Whether `to` is downstream of `from` through live output connections.
    fn reaches(from: &Arc<Node>, to: &Arc<Node>) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from.clone()];
        while let Some(node) = stack.pop() {
            if Arc::ptr_eq(&node, to) {
                return true;
            }
            // I/O output replays captured input and never pulls its own input bus.
            if !visited.insert(node.id()) || node.kind() == NodeKind::Io {
                continue;
            }
            stack.extend(
                node.output_connections()
                    .into_iter()
                    .filter_map(|(_, conn)| conn.destination_node()),
            );
        }
        false
    }

    pub fn disconnect(&self, connection: &Arc<Connection>) -> Result<()> {
        let changes = {
            let mut state = self.state.lock();
            if !state.connections.contains_key(&connection.id()) {
                return Err(Error::ConnectionNotFound);
            }
            let id = connection.id();
            self.disconnect_where(&mut state, |conn| conn.id() == id)
        };
        self.post(changes.events);
        Ok(())
    }

    /// Disconnect every connection into `node`, or only the one on `bus`. Returns the count.
    pub fn disconnect_input(&self, node: &Arc<Node>, bus: Option<u32>) -> usize {
        self.disconnect_matching(|conn| {
            conn.destination_is(node) && bus.is_none_or(|bus| conn.destination_bus() == bus)
        })
    }

    /// Disconnect every connection out of `node`, or only the one on `bus`. Returns the count.
    pub fn disconnect_output(&self, node: &Arc<Node>, bus: Option<u32>) -> usize {
        let bus = bus.map(|bus| node.resolve_output_bus(bus));
        self.disconnect_matching(|conn| {
            conn.source_is(node) && bus.is_none_or(|bus| conn.source_bus() == bus)
        })
    }

    fn disconnect_matching(&self, predicate: impl Fn(&Connection) -> bool) -> usize {
        let changes = {
            let mut state = self.state.lock();
            self.disconnect_where(&mut state, predicate)
        };
        let count = changes.disconnected;
        self.post(changes.events);
        count
    }

    /// Tear down every matching connection and detach endpoints left unused.
    fn disconnect_where(
        &self,
        state: &mut GraphState,
        predicate: impl Fn(&Connection) -> bool,
    ) -> Changes {
        let mut changes = Changes::default();
        let matching: Vec<Arc<Connection>> = state
            .connections
            .values()
            .filter(|conn| predicate(conn))
            .cloned()
            .collect();
        if matching.is_empty() {
            return changes;
        }

        let mut touched: Vec<Arc<Node>> = Vec::new();
        for connection in matching {
            let source = connection.source_node();
            let destination = connection.destination_node();
            if let Some(node) = &destination {
                node.remove_connection(&connection);
            }
            if let Some(node) = &source {
                node.remove_connection(&connection);
            }
            connection.remove_nodes();
            state.connections.remove(&connection.id());
            tracing::debug!(connection = %connection.id(), "disconnected");

            touched.extend(source);
            touched.extend(destination);
            state.retired.retire(connection);
            changes.disconnected += 1;
        }

        for node in touched {
            let pinned = state.pinned.contains(&node.id());
            let in_use = state.connections.values().any(|conn| conn.touches(&node));
            if !pinned && !in_use {
                Self::detach_locked(state, &node, &mut changes);
            }
        }
        Self::collect_locked(state);

        changes.events.push(GraphEvent::ConfigurationChanged);
        changes
    }

    /// Connections owned by the graph, ordered by id.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        let mut connections: Vec<_> = self.state.lock().connections.values().cloned().collect();
        connections.sort_by_key(|conn| conn.id());
        connections
    }

    /// Connections touching `node` on either side, ordered by id.
    pub fn connections_for(&self, node: &Node) -> Vec<Arc<Connection>> {
        let mut connections: Vec<_> = self
            .state
            .lock()
            .connections
            .values()
            .filter(|conn| conn.touches(node))
            .cloned()
            .collect();
        connections.sort_by_key(|conn| conn.id());
        connections
    }

    /// Release what no renderer holds any more. Returns how many detached nodes and removed
    /// connections are still pending.
    pub fn pending_release(&self) -> usize {
        Self::collect_locked(&mut self.state.lock())
    }

    // -- Rendering --

    pub fn start_render(&self) -> Result<()> {
        if self.running.swap(true) {
            return Err(Error::AlreadyRunning);
        }
        tracing::debug!("render started");
        Ok(())
    }

    pub fn stop_render(&self) {
        if self.running.swap(false) {
            tracing::debug!("render stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Render entry for the platform bridge: pull input bus 0 of the I/O node into `buffer`.
    ///
    /// Clears `buffer` first. Returns `false`, leaving silence, when not running or no I/O node
    /// is set.
    pub fn render(&self, buffer: &mut dyn AudioBuffer, when: &RenderTime) -> bool {
        buffer.clear();
        if !self.running.get() {
            return false;
        }
        let Some(io) = self.io.load_full() else {
            return false;
        };
        io.render(buffer, 0, when);
        true
    }

    /// Like [`render`](Self::render), first making interleaved device input available on the
    /// I/O node's capture bus.
    pub fn render_duplex(
        &self,
        input: &[f32],
        input_channels: usize,
        buffer: &mut dyn AudioBuffer,
        when: &RenderTime,
    ) -> bool {
        if self.running.get() {
            if let Some(io) = self.io.load_full() {
                if let KernelPayload::Io(capture) = io.kernel().payload() {
                    capture.write_interleaved(input, input_channels, when);
                }
            }
        }
        self.render(buffer, when)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
