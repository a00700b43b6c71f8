//! Nodes whose render logic can be swapped while rendering.

use crate::compat::Arc;
use crate::node::{Extension, Node, NodeArgs, NodeKind, RenderContext, RenderFn};

/// Node with a render function published through its kernel.
///
/// With no function installed it passes the input on the rendered bus straight through.
#[derive(Debug, Clone)]
pub struct TapNode {
    node: Arc<Node>,
}

impl TapNode {
    pub fn new() -> Self {
        Self::with_args(NodeArgs::default())
    }

    pub fn with_args(args: NodeArgs) -> Self {
        Self {
            node: Node::with_extension(NodeKind::Tap, args, Extension::Tap(None)),
        }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn set_render_fn<F>(&self, render: F)
    where
        F: Fn(&mut RenderContext<'_>) + Send + Sync + 'static,
    {
        let render: Arc<RenderFn> = Arc::new(render);
        self.node.update_extension(|ext| {
            if let Extension::Tap(slot) = ext {
                *slot = Some(render);
            }
        });
    }

    pub fn clear_render_fn(&self) {
        self.node.update_extension(|ext| {
            if let Extension::Tap(slot) = ext {
                *slot = None;
            }
        });
    }

    pub fn has_render_fn(&self) -> bool {
        self.node
            .read_extension(|ext| matches!(ext, Extension::Tap(Some(_))))
    }
}

impl Default for TapNode {
    fn default() -> Self {
        Self::new()
    }
}

impl core::ops::Deref for TapNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}
