//! Render-capable graph vertices.
//!
//! A [`Node`] owns two live connection maps (input and output, keyed by bus) that only the
//! management context mutates, and publishes an immutable [`Kernel`] built from them. The
//! render path never touches the live maps.
//!
//! Node kinds differ only in the payload they publish with their kernel:
//!
//! | kind     | payload                  | render                                   |
//! |----------|--------------------------|------------------------------------------|
//! | `Custom` | none                     | user render fn, or timestamp only        |
//! | `Route`  | [`RouteSet`]             | channel-remapped pull of every input     |
//! | `Tap`    | swappable render fn      | render fn, or pull of the same input bus |
//! | `Io`     | captured device input    | pull input 0, or replay captured input   |

use crate::buffer::AudioBuffer;
use crate::compat::{Arc, AtomicU64, HashMap, Mutex, Ordering, Weak};
use crate::connection::Connection;
use crate::error::BusSide;
use crate::format::Format;
use crate::io::CaptureSlot;
use crate::kernel::{Kernel, KernelPayload};
use crate::lockfree::{RenderClock, RetireList};
use crate::notify::Notifier;
use crate::route::RouteSet;
use crate::time::RenderTime;
use crate::{Error, Result};
use arc_swap::ArcSwap;
use crossbeam_channel::Receiver;

/// Bus count for nodes that accept any number of connections on a side.
pub const UNBOUNDED_BUSES: u32 = u32::MAX;

/// Render callback. Receives the buffer, the requested bus and the captured kernel.
pub type RenderFn = dyn Fn(&mut RenderContext<'_>) + Send + Sync;

/// Stable identifier for a node, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Custom,
    Route,
    Tap,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// Posted before [`Node::reset`] clears the node.
    WillReset,
}

/// Shape of a node's bus spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeArgs {
    pub input_bus_count: u32,
    pub output_bus_count: u32,
    /// Output bus index that requests for bus 0 are redirected to.
    pub override_output_bus: Option<u32>,
}

impl NodeArgs {
    pub fn new(input_bus_count: u32, output_bus_count: u32) -> Self {
        Self {
            input_bus_count,
            output_bus_count,
            ..Default::default()
        }
    }

    /// Leaf node with no inputs and one output.
    pub fn generator() -> Self {
        Self::new(0, 1)
    }

    pub fn unbounded() -> Self {
        Self::new(UNBOUNDED_BUSES, UNBOUNDED_BUSES)
    }
}

impl Default for NodeArgs {
    fn default() -> Self {
        Self {
            input_bus_count: 1,
            output_bus_count: 1,
            override_output_bus: None,
        }
    }
}

/// Management-side state that kinds keep next to the live maps.
pub(crate) enum Extension {
    None,
    Routes(RouteSet),
    Tap(Option<Arc<RenderFn>>),
    Io {
        device_format: Option<Format>,
        capture: Arc<CaptureSlot>,
    },
}

impl Extension {
    fn payload(&self) -> KernelPayload {
        match self {
            Extension::None => KernelPayload::None,
            Extension::Routes(routes) => KernelPayload::Route(routes.clone()),
            Extension::Tap(render) => KernelPayload::Tap(render.clone()),
            Extension::Io { capture, .. } => KernelPayload::Io(capture.clone()),
        }
    }

    fn reset(&mut self) {
        match self {
            Extension::None | Extension::Io { .. } => {}
            Extension::Routes(routes) => routes.clear(),
            Extension::Tap(render) => *render = None,
        }
    }
}

struct NodeState {
    inputs: HashMap<u32, Weak<Connection>>,
    outputs: HashMap<u32, Weak<Connection>>,
    extension: Extension,
    retired: RetireList<Kernel>,
}

pub struct Node {
    id: NodeId,
    kind: NodeKind,
    args: NodeArgs,
    render_fn: Option<Box<RenderFn>>,
    state: Mutex<NodeState>,
    kernel: ArcSwap<Kernel>,
    render_time: RenderClock,
    events: Notifier<NodeEvent>,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Node without render logic. Rendering it only records the timestamp.
    pub fn new(args: NodeArgs) -> Arc<Self> {
        Self::build(NodeKind::Custom, args, None, Extension::None)
    }

    pub fn with_render_fn<F>(args: NodeArgs, render: F) -> Arc<Self>
    where
        F: Fn(&mut RenderContext<'_>) + Send + Sync + 'static,
    {
        Self::build(NodeKind::Custom, args, Some(Box::new(render)), Extension::None)
    }

    pub(crate) fn with_extension(kind: NodeKind, args: NodeArgs, extension: Extension) -> Arc<Self> {
        Self::build(kind, args, None, extension)
    }

    fn build(
        kind: NodeKind,
        args: NodeArgs,
        render_fn: Option<Box<RenderFn>>,
        extension: Extension,
    ) -> Arc<Self> {
        let kernel = Kernel::new(HashMap::new(), HashMap::new(), extension.payload());
        Arc::new(Self {
            id: NodeId::next(),
            kind,
            args,
            render_fn,
            state: Mutex::new(NodeState {
                inputs: HashMap::new(),
                outputs: HashMap::new(),
                extension,
                retired: RetireList::new(),
            }),
            kernel: ArcSwap::from_pointee(kernel),
            render_time: RenderClock::default(),
            events: Notifier::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn input_bus_count(&self) -> u32 {
        self.args.input_bus_count
    }

    pub fn output_bus_count(&self) -> u32 {
        self.args.output_bus_count
    }

    pub fn override_output_bus(&self) -> Option<u32> {
        self.args.override_output_bus
    }

    pub fn subscribe(&self) -> Receiver<NodeEvent> {
        self.events.subscribe()
    }

    // -- Bus queries (live maps) --

    /// Output bus a request for `bus` actually addresses.
    pub fn resolve_output_bus(&self, bus: u32) -> u32 {
        match self.args.override_output_bus {
            Some(target) if bus == 0 => target,
            _ => bus,
        }
    }

    fn output_bus_in_range(&self, bus: u32) -> bool {
        self.args.override_output_bus == Some(bus) || bus < self.args.output_bus_count
    }

    /// Whether `bus` exists on the input side, connected or not.
    pub fn has_input_bus(&self, bus: u32) -> bool {
        bus < self.args.input_bus_count
    }

    /// Whether `bus` exists on the output side, connected or not.
    pub fn has_output_bus(&self, bus: u32) -> bool {
        self.output_bus_in_range(self.resolve_output_bus(bus))
    }

    pub fn input_format(&self, bus: u32) -> Option<Format> {
        let conn = self.state.lock().inputs.get(&bus).cloned();
        conn.and_then(|conn| conn.upgrade()).map(|conn| *conn.format())
    }

    pub fn output_format(&self, bus: u32) -> Option<Format> {
        let bus = self.resolve_output_bus(bus);
        let conn = self.state.lock().outputs.get(&bus).cloned();
        conn.and_then(|conn| conn.upgrade()).map(|conn| *conn.format())
    }

    /// Format the node itself requires on an input bus, independent of any connection.
    pub fn declared_input_format(&self, bus: u32) -> Option<Format> {
        match &self.state.lock().extension {
            Extension::Io { device_format, .. } if bus == 0 => *device_format,
            _ => None,
        }
    }

    /// Format the node itself produces on an output bus, independent of any connection.
    pub fn declared_output_format(&self, bus: u32) -> Option<Format> {
        let bus = self.resolve_output_bus(bus);
        match &self.state.lock().extension {
            Extension::Io { device_format, .. } if Some(bus) == self.args.override_output_bus => {
                *device_format
            }
            _ => None,
        }
    }

    /// A bus whose connection is gone counts as free even before the entry is pruned.
    fn occupied(map: &HashMap<u32, Weak<Connection>>, bus: u32) -> bool {
        map.get(&bus).is_some_and(|conn| conn.strong_count() > 0)
    }

    pub fn is_available_input_bus(&self, bus: u32) -> bool {
        self.has_input_bus(bus) && !Self::occupied(&self.state.lock().inputs, bus)
    }

    pub fn is_available_output_bus(&self, bus: u32) -> bool {
        let bus = self.resolve_output_bus(bus);
        self.output_bus_in_range(bus) && !Self::occupied(&self.state.lock().outputs, bus)
    }

    pub fn next_available_input_bus(&self) -> Option<u32> {
        let state = self.state.lock();
        (0..self.args.input_bus_count)
            .take(state.inputs.len() + 1)
            .find(|&bus| !Self::occupied(&state.inputs, bus))
    }

    pub fn next_available_output_bus(&self) -> Option<u32> {
        let state = self.state.lock();
        (0..self.args.output_bus_count)
            .take(state.outputs.len() + 2)
            .map(|bus| self.resolve_output_bus(bus))
            .find(|&bus| self.output_bus_in_range(bus) && !Self::occupied(&state.outputs, bus))
    }

    /// Live input connections, ordered by bus.
    pub fn input_connections(&self) -> Vec<(u32, Arc<Connection>)> {
        let entries: Vec<_> = self.state.lock().inputs.clone().into_iter().collect();
        Self::live_connections(entries)
    }

    /// Live output connections, ordered by bus.
    pub fn output_connections(&self) -> Vec<(u32, Arc<Connection>)> {
        let entries: Vec<_> = self.state.lock().outputs.clone().into_iter().collect();
        Self::live_connections(entries)
    }

    // Upgrades happen outside the structural lock.
    fn live_connections(entries: Vec<(u32, Weak<Connection>)>) -> Vec<(u32, Arc<Connection>)> {
        let mut connections: Vec<_> = entries
            .into_iter()
            .filter_map(|(bus, conn)| conn.upgrade().map(|conn| (bus, conn)))
            .collect();
        connections.sort_by_key(|(bus, _)| *bus);
        connections
    }

    pub fn has_connections(&self) -> bool {
        let state = self.state.lock();
        state
            .inputs
            .values()
            .chain(state.outputs.values())
            .any(|conn| conn.strong_count() > 0)
    }

    // -- Connection edits --

    /// Register `connection` on whichever side of this node it attaches to.
    ///
    /// # Panics
    ///
    /// If the connection references neither side of this node.
    pub fn add_connection(&self, connection: &Arc<Connection>) -> Result<()> {
        let as_input = connection.destination_is(self);
        let as_output = connection.source_is(self);
        assert!(
            as_input || as_output,
            "{} is not an endpoint of {}",
            self.id,
            connection.id()
        );

        {
            let mut state = self.state.lock();
            if as_input && Self::occupied(&state.inputs, connection.destination_bus()) {
                return Err(Error::BusOccupied {
                    side: BusSide::Input,
                    bus: connection.destination_bus(),
                });
            }
            if as_output && Self::occupied(&state.outputs, connection.source_bus()) {
                return Err(Error::BusOccupied {
                    side: BusSide::Output,
                    bus: connection.source_bus(),
                });
            }
            if as_input {
                state
                    .inputs
                    .insert(connection.destination_bus(), Arc::downgrade(connection));
            }
            if as_output {
                state
                    .outputs
                    .insert(connection.source_bus(), Arc::downgrade(connection));
            }
        }

        self.update_kernel();
        Ok(())
    }

    /// Unregister `connection` from this node.
    ///
    /// # Panics
    ///
    /// If the connection references neither side of this node.
    pub fn remove_connection(&self, connection: &Connection) {
        let as_input = connection.destination_is(self);
        let as_output = connection.source_is(self);
        assert!(
            as_input || as_output,
            "{} is not an endpoint of {}",
            self.id,
            connection.id()
        );

        {
            let mut state = self.state.lock();
            if as_input {
                Self::remove_entry(&mut state.inputs, connection);
            }
            if as_output {
                Self::remove_entry(&mut state.outputs, connection);
            }
        }

        self.update_kernel();
    }

    fn remove_entry(map: &mut HashMap<u32, Weak<Connection>>, connection: &Connection) {
        map.retain(|_, conn| !core::ptr::eq(conn.as_ptr(), connection));
    }

    /// Publish a fresh kernel from the live maps and kind state.
    ///
    /// Entries whose connection has been dropped are pruned here, on the management side.
    pub fn update_kernel(&self) {
        let mut state = self.state.lock();
        state.inputs.retain(|_, conn| conn.strong_count() > 0);
        state.outputs.retain(|_, conn| conn.strong_count() > 0);
        let kernel = Kernel::new(
            state.inputs.clone(),
            state.outputs.clone(),
            state.extension.payload(),
        );
        let previous = self.kernel.swap(Arc::new(kernel));
        state.retired.retire(previous);
        let pending = state.retired.collect();
        tracing::trace!(node = %self.id, pending, "kernel published");
    }

    /// Edit kind state under the structural lock, then publish.
    /// Release kernels no renderer still holds. Returns how many are still pending.
    pub(crate) fn collect_retired(&self) -> usize {
        self.state.lock().retired.collect()
    }

    pub(crate) fn update_extension<R>(&self, f: impl FnOnce(&mut Extension) -> R) -> R {
        let result = f(&mut self.state.lock().extension);
        self.update_kernel();
        result
    }

    pub(crate) fn read_extension<R>(&self, f: impl FnOnce(&Extension) -> R) -> R {
        f(&self.state.lock().extension)
    }

    /// Clear every connection and all kind state without destroying the node.
    pub fn reset(&self) {
        self.events.post(NodeEvent::WillReset);
        {
            let mut state = self.state.lock();
            state.inputs.clear();
            state.outputs.clear();
            state.extension.reset();
        }
        self.render_time.clear();
        self.update_kernel();
        tracing::debug!(node = %self.id, "node reset");
    }

    // -- Render path --

    /// Current kernel. The render path captures this once per call.
    pub fn kernel(&self) -> Arc<Kernel> {
        self.kernel.load_full()
    }

    pub fn last_render_time(&self) -> Option<RenderTime> {
        self.render_time.load()
    }

    /// Produce audio for `bus` into `buffer`.
    ///
    /// Takes one snapshot of the kernel and uses it for the whole call. Buses with nothing
    /// connected, or whose upstream node is gone, are skipped silently.
    pub fn render(&self, buffer: &mut dyn AudioBuffer, bus: u32, when: &RenderTime) {
        self.render_time.store(when);

        let kernel = self.kernel.load_full();
        let mut cx = RenderContext {
            buffer,
            bus,
            when,
            kernel: &kernel,
        };

        match kernel.payload() {
            KernelPayload::None => {
                if let Some(render) = &self.render_fn {
                    render(&mut cx);
                }
            }
            KernelPayload::Route(routes) => crate::route::render(routes, &mut cx),
            KernelPayload::Tap(Some(render)) => render(&mut cx),
            KernelPayload::Tap(None) => {
                cx.render_input(bus);
            }
            KernelPayload::Io(capture) => {
                if Some(bus) == self.args.override_output_bus {
                    capture.read_into(cx.buffer);
                } else {
                    cx.render_input(0);
                }
            }
        }
    }
}

/// What a render callback sees.
pub struct RenderContext<'a> {
    pub(crate) buffer: &'a mut dyn AudioBuffer,
    pub(crate) bus: u32,
    pub(crate) when: &'a RenderTime,
    pub(crate) kernel: &'a Kernel,
}

impl<'a> RenderContext<'a> {
    pub fn buffer(&self) -> &dyn AudioBuffer {
        &*self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut dyn AudioBuffer {
        &mut *self.buffer
    }

    /// Bus being rendered.
    pub fn bus(&self) -> u32 {
        self.bus
    }

    pub fn when(&self) -> &RenderTime {
        self.when
    }

    /// Kernel captured for this call.
    pub fn kernel(&self) -> &'a Kernel {
        self.kernel
    }

    /// Pull the source connected to input `bus` into the context buffer.
    ///
    /// Returns `false` when nothing resolvable is connected.
    pub fn render_input(&mut self, bus: u32) -> bool {
        self.render_input_into(bus, None)
    }

    /// Pull the source connected to input `bus` into `buffer`, or the context buffer if `None`.
    pub fn render_input_into(&mut self, bus: u32, buffer: Option<&mut dyn AudioBuffer>) -> bool {
        let Some(connection) = self.kernel.input_connection(bus) else {
            return false;
        };
        let Some(source) = connection.source_node() else {
            return false;
        };
        let target: &mut dyn AudioBuffer = match buffer {
            Some(buffer) => buffer,
            None => &mut *self.buffer,
        };
        source.render(target, connection.source_bus(), self.when);
        true
    }
}
