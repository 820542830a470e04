//! Render tree consumed by the tree viewer.

use serde::{Deserialize, Serialize};

use crate::source::SourceNode;

/// Per-node metadata shown under the node name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// A node of the render tree: `{name, attributes: {author, time}, children}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub children: Vec<RenderNode>,
}

/// Top-level input of the viewer: a list holding the single tree root.
pub type RenderForest = Vec<RenderNode>;

impl RenderNode {
    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::node_count).sum::<usize>()
    }

    /// Number of levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(RenderNode::depth).max().unwrap_or(0)
    }
}

impl From<&SourceNode> for RenderNode {
    fn from(node: &SourceNode) -> Self {
        transform(node)
    }
}

/// Map a source node onto the render shape, preserving structure and order.
pub fn transform(node: &SourceNode) -> RenderNode {
    RenderNode {
        name: node.text.clone(),
        attributes: Attributes {
            author: node.author.clone(),
            time: node.time.clone(),
        },
        children: node.children.iter().map(transform).collect(),
    }
}

/// Wrap a transformed root as the forest root list.
pub fn into_forest(root: RenderNode) -> RenderForest {
    vec![root]
}
