//! WWS Discussion - swarm discussion tree model
//!
//! Converts the externally produced discussion tree document into the
//! render tree consumed by the tree viewer, and formats per-node labels.

pub mod label;
pub mod render;
pub mod source;

pub use label::{date_fragment, NodeLabel};
pub use render::{into_forest, transform, Attributes, RenderForest, RenderNode};
pub use source::{SourceNode, MAX_REPLY_DEPTH};
