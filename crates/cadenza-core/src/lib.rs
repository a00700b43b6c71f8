//! Pull-rendered audio graph with lock-free topology snapshots.
//!
//! # Primary API
//!
//! - [`Graph`]: attach/detach nodes, connect/disconnect buses, render entry
//! - [`Node`]: bus queries, connection maps, kernel publication, `render`
//! - [`Kernel`]: immutable per-node snapshot read by the render path
//! - [`RouteNode`], [`TapNode`], [`IoNode`]: node kinds
//! - [`RenderCallback`], [`OfflineRenderer`]: drive the graph from a device or in-process
//!
//! # Feature-gated APIs
//!
//! - `"cpal"`: [`AudioOutput`] hardware backend
//!
//! # Example
//!
//! ```ignore
//! use cadenza_core::*;
//!
//! let graph = Graph::new();
//! let io = graph.add_io();
//! let osc = Node::with_render_fn(NodeArgs::generator(), |cx| { /* fill cx.buffer_mut() */ });
//! graph.connect(&osc, io.node(), Format::float32(48000.0, 2))?;
//! graph.start_render()?;
//! ```

pub mod error;
pub use error::{BusSide, Error, Result};

pub mod config;
pub use config::EngineConfig;

/// Shared synchronization and collection types.
pub mod compat;
pub use compat::{Arc, Weak};

pub mod format;
pub use format::{Format, PcmFormat};

pub mod buffer;
pub use buffer::{AudioBuffer, PcmBuffer, RemappedBuffer};

pub mod time;
pub use time::RenderTime;

pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, RenderClock, RetireList};

pub(crate) mod notify;
pub use notify::Notifier;

pub mod connection;
pub use connection::{Connection, ConnectionId};

pub mod kernel;
pub use kernel::{Kernel, KernelPayload};

pub mod node;
pub use node::{
    Node, NodeArgs, NodeEvent, NodeId, NodeKind, RenderContext, RenderFn, UNBOUNDED_BUSES,
};

pub mod route;
pub use route::{Route, RouteNode, RoutePoint, RouteSet};

pub mod tap;
pub use tap::TapNode;

pub mod io;
pub use io::{CaptureSlot, IoNode, CAPTURE_BUS};

pub mod graph;
pub use graph::{Graph, GraphEvent};

pub mod backend;
pub use backend::AudioBackend;

pub mod callback;
pub use callback::RenderCallback;

pub mod offline;
pub use offline::OfflineRenderer;

#[cfg(feature = "cpal")]
pub mod output;

#[cfg(feature = "cpal")]
pub use output::{AudioOutput, AudioOutputConfig};
