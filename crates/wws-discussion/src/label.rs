//! Per-node label content: bold name, author line, date line.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::render::RenderNode;

/// Label box width in terminal cells, borders included.
pub const LABEL_WIDTH: u16 = 22;
/// Label box height in terminal cells, borders included.
pub const LABEL_HEIGHT: u16 = 5;

pub const AUTHOR_GLYPH: &str = "👤";
pub const DATE_GLYPH: &str = "🕒";

/// Date part of a timestamp: everything before the first `T`.
///
/// Plain string split; the value is not parsed or validated.
pub fn date_fragment(time: Option<&str>) -> Option<&str> {
    time.and_then(|t| t.split('T').next())
}

/// Text lines of a node label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLabel {
    pub name: String,
    pub author_line: String,
    pub date_line: String,
}

impl NodeLabel {
    pub fn for_node(node: &RenderNode) -> Self {
        let author = node.attributes.author.as_deref().unwrap_or("");
        let date = date_fragment(node.attributes.time.as_deref()).unwrap_or("");
        Self {
            name: node.name.clone().unwrap_or_default(),
            author_line: format!("{AUTHOR_GLYPH} {author}"),
            date_line: format!("{DATE_GLYPH} {date}"),
        }
    }
}

/// Shorten `text` to at most `max_width` terminal cells, ending in `…` when
/// cut. Wide characters (CJK, emoji) count as two cells.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}
