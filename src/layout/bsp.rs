//! An arena-backed binary space-partitioning tree: one per workspace, mapping
//! an ordered tiled-window sequence onto a monitor's usable rect (spec.md §4.3,
//! §9 "Ownership of the tiling tree").
//!
//! Leaves are window ids. Internal nodes store a split axis and a ratio in
//! `(0.0, 1.0)`. Node identity is a `Vec` index rather than a pointer; removing
//! a leaf collapses its parent's slot in place so the grandparent's existing
//! child index keeps pointing at the promoted sibling without a pointer
//! rewrite, matching the ownership note in spec.md §9.
use crate::geometry::Rect;
use crate::x::Xid;

/// The axis a split divides along. `X` produces a left/right pair (a vertical
/// cut line); `Y` produces a top/bottom pair (a horizontal cut line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        window: Xid,
        parent: Option<usize>,
    },
    Internal {
        axis: Axis,
        ratio: f32,
        left: usize,
        right: usize,
        parent: Option<usize>,
    },
}

impl Node {
    fn parent(&self) -> Option<usize> {
        match self {
            Node::Leaf { parent, .. } => *parent,
            Node::Internal { parent, .. } => *parent,
        }
    }

    fn set_parent(&mut self, p: Option<usize>) {
        match self {
            Node::Leaf { parent, .. } => *parent = p,
            Node::Internal { parent, .. } => *parent = p,
        }
    }
}

/// The tree for a single workspace. Empty until the first window is inserted.
#[derive(Debug, Default, Clone)]
pub struct Bsp {
    nodes: Vec<Option<Node>>,
    root: Option<usize>,
}

impl Bsp {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any window is currently tiled in this tree.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Whether `window` currently occupies a leaf.
    pub fn contains(&self, window: Xid) -> bool {
        self.leaf_index(window).is_some()
    }

    /// Insert `window` as a new leaf, splitting the leaf under `focused` (or
    /// the first leaf in tiling order, if `focused` is absent or not tiled)
    /// along its longer dimension, per spec.md §4.3.
    pub fn insert(&mut self, window: Xid, bounds: Rect, focused: Option<Xid>) {
        let Some(root) = self.root else {
            let idx = self.push(Node::Leaf {
                window,
                parent: None,
            });
            self.root = Some(idx);
            return;
        };
        let _ = root;

        let geoms = self.geometries(bounds);
        let target = focused
            .filter(|f| geoms.iter().any(|(w, _)| w == f))
            .or_else(|| geoms.first().map(|(w, _)| *w))
            .expect("tree is non-empty so it has at least one leaf");
        let target_rect = geoms.iter().find(|(w, _)| *w == target).unwrap().1;
        let axis = if target_rect.is_wider_than_tall() {
            Axis::X
        } else {
            Axis::Y
        };

        let leaf_idx = self.leaf_index(target).expect("target came from geoms");
        let parent = self.nodes[leaf_idx].as_ref().unwrap().parent();

        let left_leaf = self.push(Node::Leaf {
            window: target,
            parent: None,
        });
        let right_leaf = self.push(Node::Leaf {
            window,
            parent: None,
        });
        self.nodes[leaf_idx] = Some(Node::Internal {
            axis,
            ratio: 0.5,
            left: left_leaf,
            right: right_leaf,
            parent,
        });
        self.set_parent(left_leaf, Some(leaf_idx));
        self.set_parent(right_leaf, Some(leaf_idx));
    }

    /// Remove `window`'s leaf, collapsing its parent and promoting the
    /// sibling subtree into the parent's slot. A no-op if `window` is not
    /// currently tiled.
    pub fn remove(&mut self, window: Xid) {
        let Some(leaf_idx) = self.leaf_index(window) else {
            return;
        };

        let Some(parent_idx) = self.nodes[leaf_idx].as_ref().unwrap().parent() else {
            self.nodes[leaf_idx] = None;
            self.root = None;
            return;
        };

        let sibling_idx = match self.nodes[parent_idx].as_ref().unwrap() {
            Node::Internal { left, right, .. } if *left == leaf_idx => *right,
            Node::Internal { left, right, .. } if *right == leaf_idx => *left,
            _ => unreachable!("parent of a leaf is always an internal node"),
        };

        let grandparent = self.nodes[parent_idx].as_ref().unwrap().parent();

        let mut sibling = self.nodes[sibling_idx].take().unwrap();
        if let Node::Internal { left, right, .. } = &sibling {
            self.set_parent(*left, Some(parent_idx));
            self.set_parent(*right, Some(parent_idx));
        }
        sibling.set_parent(grandparent);

        self.nodes[parent_idx] = Some(sibling);
        self.nodes[leaf_idx] = None;

        if grandparent.is_none() {
            self.root = Some(parent_idx);
        }
    }

    /// Resolve a geometry per currently tiled window against `bounds` (the
    /// monitor's usable rect), in tiling order.
    pub fn geometries(&self, bounds: Rect) -> Vec<(Xid, Rect)> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_geometries(root, bounds, &mut out);
        }
        out
    }

    fn collect_geometries(&self, idx: usize, rect: Rect, out: &mut Vec<(Xid, Rect)>) {
        match self.nodes[idx].as_ref() {
            Some(Node::Leaf { window, .. }) => out.push((*window, rect)),
            Some(Node::Internal {
                axis,
                ratio,
                left,
                right,
                ..
            }) => {
                let (a, b) = match axis {
                    Axis::X => rect.split_vertical(*ratio),
                    Axis::Y => rect.split_horizontal(*ratio),
                };
                self.collect_geometries(*left, a, out);
                self.collect_geometries(*right, b, out);
            }
            None => {}
        }
    }

    /// Every tiled window id, in tiling order (left-to-right, top-to-bottom of
    /// the tree). Ties for "first leaf" in [Self::insert] follow this order.
    pub fn leaves_in_order(&self) -> Vec<Xid> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_leaves(root, &mut out);
        }
        out
    }

    fn collect_leaves(&self, idx: usize, out: &mut Vec<Xid>) {
        match self.nodes[idx].as_ref() {
            Some(Node::Leaf { window, .. }) => out.push(*window),
            Some(Node::Internal { left, right, .. }) => {
                self.collect_leaves(*left, out);
                self.collect_leaves(*right, out);
            }
            None => {}
        }
    }

    /// Swap `window` into the root's first leaf slot (spec.md §4.3 `promote`).
    /// A no-op if `window` is already first or not tiled.
    pub fn promote(&mut self, window: Xid) {
        let leaves = self.leaves_in_order();
        if leaves.first() == Some(&window) {
            return;
        }
        let Some(first) = leaves.first().copied() else {
            return;
        };
        self.swap(window, first);
    }

    /// Exchange the tiling positions of `a` and `b` (spec.md §4.3 `swap`). A
    /// no-op if either is not currently tiled.
    pub fn swap(&mut self, a: Xid, b: Xid) {
        let (Some(ia), Some(ib)) = (self.leaf_index(a), self.leaf_index(b)) else {
            return;
        };
        if ia == ib {
            return;
        }
        if let Some(Node::Leaf { window, .. }) = &mut self.nodes[ia] {
            *window = b;
        }
        if let Some(Node::Leaf { window, .. }) = &mut self.nodes[ib] {
            *window = a;
        }
    }

    /// Adjust the ratio of the nearest ancestor split of `window` whose axis
    /// matches a non-zero `dx`/`dy`, clamped to `[0.1, 0.9]` (spec.md §4.5
    /// `resize`).
    pub fn resize(&mut self, window: Xid, dx: f32, dy: f32) {
        if dx != 0.0 {
            self.resize_axis(window, Axis::X, dx);
        }
        if dy != 0.0 {
            self.resize_axis(window, Axis::Y, dy);
        }
    }

    fn resize_axis(&mut self, window: Xid, axis: Axis, delta: f32) {
        let Some(mut idx) = self.leaf_index(window) else {
            return;
        };
        loop {
            let Some(parent) = self.nodes[idx].as_ref().unwrap().parent() else {
                return;
            };
            if let Some(Node::Internal {
                axis: a, ratio, left, ..
            }) = self.nodes[parent].as_mut()
            {
                if *a == axis {
                    let sign = if *left == idx { 1.0 } else { -1.0 };
                    *ratio = (*ratio + sign * delta).clamp(0.1, 0.9);
                    return;
                }
            }
            idx = parent;
        }
    }

    fn leaf_index(&self, window: Xid) -> Option<usize> {
        self.nodes.iter().position(|n| {
            matches!(n, Some(Node::Leaf { window: w, .. }) if *w == window)
        })
    }

    fn set_parent(&mut self, idx: usize, parent: Option<usize>) {
        if let Some(n) = self.nodes[idx].as_mut() {
            n.set_parent(parent);
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> Xid {
        Xid(n)
    }

    #[test]
    fn single_window_fills_bounds() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);

        let geoms = t.geometries(bounds);
        assert_eq!(geoms, vec![(id(1), bounds)]);
    }

    #[test]
    fn second_insert_splits_wider_dimension() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.insert(id(2), bounds, Some(id(1)));

        let geoms = t.geometries(bounds);
        assert_eq!(geoms.len(), 2);
        // bounds is wider than tall, so the split is vertical (left/right)
        let (_, ra) = geoms[0];
        let (_, rb) = geoms[1];
        assert_eq!(ra.h, bounds.h);
        assert_eq!(rb.h, bounds.h);
        assert_eq!(ra.w + rb.w, bounds.w);
    }

    #[test]
    fn remove_collapses_to_single_leaf() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.insert(id(2), bounds, Some(id(1)));

        t.remove(id(1));

        let geoms = t.geometries(bounds);
        assert_eq!(geoms, vec![(id(2), bounds)]);
        assert!(!t.contains(id(1)));
    }

    #[test]
    fn remove_only_window_empties_tree() {
        let mut t = Bsp::new();
        t.insert(id(1), Rect::new(0, 0, 100, 100), None);
        t.remove(id(1));
        assert!(t.is_empty());
    }

    #[test]
    fn promote_swaps_into_first_slot() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.insert(id(2), bounds, Some(id(1)));
        t.insert(id(3), bounds, Some(id(2)));

        assert_eq!(t.leaves_in_order()[0], id(1));
        t.promote(id(3));
        assert_eq!(t.leaves_in_order()[0], id(3));
        assert!(t.contains(id(1)) && t.contains(id(2)));
    }

    #[test]
    fn swap_exchanges_positions() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.insert(id(2), bounds, Some(id(1)));

        let before = t.geometries(bounds);
        t.swap(id(1), id(2));
        let after = t.geometries(bounds);

        assert_eq!(before[0].1, after[1].1);
        assert_eq!(before[1].1, after[0].1);
    }

    #[test]
    fn resize_clamps_ratio() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.insert(id(2), bounds, Some(id(1)));

        for _ in 0..20 {
            t.resize(id(1), 0.1, 0.0);
        }

        let geoms = t.geometries(bounds);
        let left_w = geoms.iter().find(|(w, _)| *w == id(1)).unwrap().1.w;
        // ratio clamped at 0.9 of 1000
        assert_eq!(left_w, 900);
    }

    #[test]
    fn resize_on_lone_window_is_noop() {
        let mut t = Bsp::new();
        let bounds = Rect::new(0, 0, 1000, 800);
        t.insert(id(1), bounds, None);
        t.resize(id(1), 0.2, 0.0);
        assert_eq!(t.geometries(bounds), vec![(id(1), bounds)]);
    }
}
