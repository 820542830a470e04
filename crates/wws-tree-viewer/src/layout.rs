//! Node placement for the discussion tree diagram.
//!
//! Positions are in terminal cells. Leaves take consecutive breadth slots,
//! parents sit centred over their first and last child, and each level is
//! one node size further along the depth axis.

use wws_discussion::RenderNode;

/// Initial pan offset of the tree root, in cells.
pub const INITIAL_TRANSLATE: (i32, i32) = (40, 3);
/// Logical space reserved per node (breadth, depth) in cells.
pub const NODE_SIZE: (u16, u16) = (30, 8);
pub const SEPARATION: Separation = Separation {
    siblings: 1.0,
    non_siblings: 1.0,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    /// Root on top, children below.
    #[default]
    Vertical,
    /// Root on the left, children to the right.
    Horizontal,
}

/// Gap between neighbouring leaves, in node-size units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub siblings: f32,
    pub non_siblings: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeGeometry {
    pub translate: (i32, i32),
    pub orientation: Orientation,
    /// (x, y) size of the cell block reserved for every node.
    pub node_size: (u16, u16),
    pub separation: Separation,
}

impl Default for TreeGeometry {
    fn default() -> Self {
        Self {
            translate: INITIAL_TRANSLATE,
            orientation: Orientation::Vertical,
            node_size: NODE_SIZE,
            separation: SEPARATION,
        }
    }
}

/// A node with its centre position in canvas cells.
#[derive(Debug, Clone, Copy)]
pub struct PlacedNode<'a> {
    pub node: &'a RenderNode,
    pub x: i32,
    pub y: i32,
    pub depth: usize,
    /// Index of the parent in the layout output.
    pub parent: Option<usize>,
}

struct Slot<'a> {
    node: &'a RenderNode,
    depth: usize,
    parent: Option<usize>,
    breadth: f32,
}

#[derive(Default)]
struct LeafCursor {
    /// Breadth and parent of the most recently placed leaf.
    last: Option<(f32, Option<usize>)>,
}

/// Lay out every tree of the forest, in pre-order.
pub fn layout<'a>(forest: &'a [RenderNode], geometry: &TreeGeometry) -> Vec<PlacedNode<'a>> {
    let mut slots = Vec::new();
    let mut cursor = LeafCursor::default();
    for root in forest {
        place(root, 0, None, &geometry.separation, &mut cursor, &mut slots);
    }

    let (size_x, size_y) = (geometry.node_size.0 as f32, geometry.node_size.1 as f32);
    slots
        .into_iter()
        .map(|slot| {
            let depth = slot.depth as f32;
            let (x, y) = match geometry.orientation {
                Orientation::Vertical => (slot.breadth * size_x, depth * size_y),
                Orientation::Horizontal => (depth * size_x, slot.breadth * size_y),
            };
            PlacedNode {
                node: slot.node,
                x: x.round() as i32 + geometry.translate.0,
                y: y.round() as i32 + geometry.translate.1,
                depth: slot.depth,
                parent: slot.parent,
            }
        })
        .collect()
}

fn place<'a>(
    node: &'a RenderNode,
    depth: usize,
    parent: Option<usize>,
    separation: &Separation,
    cursor: &mut LeafCursor,
    slots: &mut Vec<Slot<'a>>,
) -> f32 {
    let index = slots.len();
    slots.push(Slot {
        node,
        depth,
        parent,
        breadth: 0.0,
    });

    let breadth = if node.children.is_empty() {
        let breadth = match cursor.last {
            None => 0.0,
            Some((prev, prev_parent)) if parent.is_some() && prev_parent == parent => {
                prev + separation.siblings
            }
            Some((prev, _)) => prev + separation.non_siblings,
        };
        cursor.last = Some((breadth, parent));
        breadth
    } else {
        let mut first = None;
        let mut last = 0.0;
        for child in &node.children {
            let b = place(child, depth + 1, Some(index), separation, cursor, slots);
            if first.is_none() {
                first = Some(b);
            }
            last = b;
        }
        (first.unwrap_or(last) + last) / 2.0
    };

    slots[index].breadth = breadth;
    breadth
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, children: Vec<RenderNode>) -> RenderNode {
        RenderNode {
            name: Some(name.to_string()),
            children,
            ..Default::default()
        }
    }

    fn origin_geometry() -> TreeGeometry {
        TreeGeometry {
            translate: (0, 0),
            ..Default::default()
        }
    }

    #[test]
    fn single_root_sits_at_translate() {
        let forest = vec![node("root", vec![])];
        let placed = layout(&forest, &TreeGeometry::default());
        assert_eq!(placed.len(), 1);
        assert_eq!((placed[0].x, placed[0].y), INITIAL_TRANSLATE);
        assert_eq!(placed[0].parent, None);
    }

    #[test]
    fn parent_is_centred_over_children() {
        let forest = vec![node(
            "root",
            vec![node("a", vec![]), node("b", vec![]), node("c", vec![])],
        )];
        let placed = layout(&forest, &origin_geometry());

        let xs: Vec<i32> = placed.iter().map(|p| p.x).collect();
        assert_eq!(xs, [30, 0, 30, 60]);
        assert!(placed[1..].iter().all(|p| p.y == 8 && p.parent == Some(0)));
        assert_eq!(placed[0].y, 0);
    }

    #[test]
    fn non_sibling_gap_applies_across_subtrees() {
        let forest = vec![node(
            "root",
            vec![
                node("a", vec![node("a1", vec![])]),
                node("b", vec![node("b1", vec![])]),
            ],
        )];
        let geometry = TreeGeometry {
            separation: Separation {
                siblings: 1.0,
                non_siblings: 2.0,
            },
            ..origin_geometry()
        };
        let placed = layout(&forest, &geometry);
        let by_name = |name: &str| {
            placed
                .iter()
                .find(|p| p.node.name.as_deref() == Some(name))
                .copied()
                .unwrap()
        };

        assert_eq!(by_name("a1").x, 0);
        assert_eq!(by_name("b1").x, 60);
        assert_eq!(by_name("root").x, 30);
        assert_eq!(by_name("b1").parent, Some(3));
        assert_eq!(by_name("b1").depth, 2);
    }

    #[test]
    fn horizontal_orientation_swaps_axes() {
        let forest = vec![node("root", vec![node("a", vec![]), node("b", vec![])])];
        let geometry = TreeGeometry {
            orientation: Orientation::Horizontal,
            ..origin_geometry()
        };
        let placed = layout(&forest, &geometry);
        assert_eq!((placed[1].x, placed[1].y), (30, 0));
        assert_eq!((placed[2].x, placed[2].y), (30, 8));
        assert_eq!((placed[0].x, placed[0].y), (0, 4));
    }
}
