//! Source discussion node as published by the swarm.
//!
//! The document is untrusted: every field is optional and unexpected
//! shapes degrade to absent fields instead of failing.
//!
//! Nesting is bounded by `serde_json`'s recursion limit of 128 containers.
//! Each reply level costs two (the node object and its `children` array),
//! so a thread deeper than [`MAX_REPLY_DEPTH`] is reported as a parse error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Deepest reply level (root is level 0) that still parses.
pub const MAX_REPLY_DEPTH: usize = 63;

/// One entry of the external discussion tree document.
///
/// Deserializing goes through [`SourceNode::from_value`], so serde and
/// [`SourceNode::parse_document`] accept exactly the same documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct SourceNode {
    /// Display label of the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISO-8601 timestamp, kept as the raw string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    /// Build a node from an arbitrary JSON value. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let children = obj
            .get("children")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Self::from_value).collect())
            .unwrap_or_default();

        Self {
            text: obj.get("text").and_then(scalar_text),
            author: obj.get("author").and_then(scalar_text),
            time: obj.get("time").and_then(scalar_text),
            children,
        }
    }

    /// Parse a raw document. Only JSON syntax errors are reported.
    pub fn parse_document(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(&value))
    }

    pub fn leaf(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<Value> for SourceNode {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}
