//! # Cadenza - Real-time Audio Graph Engine
//!
//! Pull-rendered processing graph whose topology can change while a device callback renders it.
//!
//! ## Architecture
//!
//! - **cadenza-core** - Nodes, connections, kernel snapshots, routing, render bridge
//! - **cadenza** - Engine facade: configuration, backend ownership, offline rendering
//!
//! ## Quick Start
//!
//! ```ignore
//! use cadenza::prelude::*;
//!
//! let engine = CadenzaEngine::builder().headless().build()?;
//!
//! let tone = Node::with_render_fn(NodeArgs::generator(), |cx| {
//!     for ch in 0..cx.buffer().channel_count() {
//!         if let Some(samples) = cx.buffer_mut().channel_mut(ch) {
//!             samples.fill(0.1);
//!         }
//!     }
//! });
//! engine.connect_to_output(&tone)?;
//!
//! let samples = engine.render_offline(512)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cpal` - Hardware output through CPAL

/// Re-export of cadenza-core for direct access
pub use cadenza_core as core;

pub use cadenza_core::{
    Arc, AudioBackend, AudioBuffer, BusSide, Connection, ConnectionId, EngineConfig, Format,
    Graph, GraphEvent, IoNode, Kernel, KernelPayload, Node, NodeArgs, NodeEvent, NodeId,
    NodeKind, OfflineRenderer, PcmBuffer, PcmFormat, RenderCallback, RenderContext, RenderTime,
    Route, RouteNode, RoutePoint, RouteSet, TapNode, CAPTURE_BUS, UNBOUNDED_BUSES,
};

#[cfg(feature = "cpal")]
pub use cadenza_core::{AudioOutput, AudioOutputConfig};

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::CadenzaEngineBuilder;

mod engine;
pub use engine::CadenzaEngine;

pub mod prelude {
    //! Common imports.
    pub use crate::{
        Arc, AudioBuffer, CadenzaEngine, CadenzaEngineBuilder, Connection, Error, Format, Graph,
        GraphEvent, IoNode, Node, NodeArgs, PcmBuffer, RenderContext, RenderTime, Result, Route,
        RouteNode, RoutePoint, TapNode,
    };
}
