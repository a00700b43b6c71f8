//! Immutable per-node topology snapshots for the render path.
//!
//! ```text
//!   management thread                      render thread
//!   ─────────────────                      ─────────────
//!   mutate live maps (structural lock)
//!   build Kernel from copies
//!   ArcSwap::swap ───────────────────────► load_full() once per render call
//!   park old kernel in RetireList          resolve buses through the snapshot
//! ```
//!
//! # RT Safety
//!
//! Reading a kernel takes no locks and never allocates. Resolution upgrades the stored weak
//! references at the moment of use; a miss means "nothing on this bus".

use crate::compat::{Arc, HashMap, Weak};
use crate::connection::Connection;
use crate::io::CaptureSlot;
use crate::node::RenderFn;
use crate::route::RouteSet;

/// Node-kind specific state captured alongside the connection maps.
#[derive(Clone, Default)]
pub enum KernelPayload {
    #[default]
    None,
    Route(RouteSet),
    Tap(Option<Arc<RenderFn>>),
    Io(Arc<CaptureSlot>),
}

impl core::fmt::Debug for KernelPayload {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KernelPayload::None => f.write_str("None"),
            KernelPayload::Route(routes) => f.debug_tuple("Route").field(routes).finish(),
            KernelPayload::Tap(render) => f
                .debug_tuple("Tap")
                .field(&render.as_ref().map(|_| "<render fn>"))
                .finish(),
            KernelPayload::Io(_) => f.write_str("Io"),
        }
    }
}

/// Snapshot of a node's connections at the moment it was generated.
#[derive(Debug, Default)]
pub struct Kernel {
    inputs: HashMap<u32, Weak<Connection>>,
    outputs: HashMap<u32, Weak<Connection>>,
    payload: KernelPayload,
}

impl Kernel {
    pub(crate) fn new(
        inputs: HashMap<u32, Weak<Connection>>,
        outputs: HashMap<u32, Weak<Connection>>,
        payload: KernelPayload,
    ) -> Self {
        Self {
            inputs,
            outputs,
            payload,
        }
    }

    pub fn input_connection(&self, bus: u32) -> Option<Arc<Connection>> {
        self.inputs.get(&bus).and_then(Weak::upgrade)
    }

    pub fn output_connection(&self, bus: u32) -> Option<Arc<Connection>> {
        self.outputs.get(&bus).and_then(Weak::upgrade)
    }

    /// Live input connections keyed by this node's input bus.
    pub fn input_connections(&self) -> impl Iterator<Item = (u32, Arc<Connection>)> + '_ {
        self.inputs
            .iter()
            .filter_map(|(&bus, conn)| conn.upgrade().map(|conn| (bus, conn)))
    }

    /// Live output connections keyed by this node's output bus.
    pub fn output_connections(&self) -> impl Iterator<Item = (u32, Arc<Connection>)> + '_ {
        self.outputs
            .iter()
            .filter_map(|(&bus, conn)| conn.upgrade().map(|conn| (bus, conn)))
    }

    /// Number of buses recorded in the snapshot, resolvable or not.
    pub fn input_bus_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_bus_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn payload(&self) -> &KernelPayload {
        &self.payload
    }

    pub fn routes(&self) -> Option<&RouteSet> {
        match &self.payload {
            KernelPayload::Route(routes) => Some(routes),
            _ => None,
        }
    }
}
