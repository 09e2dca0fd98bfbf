use ascii_tree::Tree;
use slotmap::SlotMap;
use tracing::trace;

use crate::layout_engine::systems::{LayoutInputs, LayoutSystem, NodeId};
use crate::layout_engine::Orientation;
use crate::model::container::ContainerId;
use crate::sys::geometry::Rect;

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf {
        container: ContainerId,
        enabled: bool,
    },
    Split {
        orientation: Orientation,
        ratio: f64,
        first: NodeId,
        second: NodeId,
    },
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Binary space partition of one workspace. Every leaf holds one container;
/// a new container splits the anchor leaf along its longer side.
#[derive(Debug, Default)]
pub struct BspLayoutSystem {
    nodes: SlotMap<NodeId, Node>,
    root: Option<NodeId>,
    last_inserted: Option<NodeId>,
}

impl BspLayoutSystem {
    fn is_leaf(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node), Some(Node { kind: NodeKind::Leaf { .. }, .. }))
    }

    fn leaf_of(&self, container: ContainerId) -> Option<NodeId> {
        self.nodes.iter().find_map(|(id, node)| match node.kind {
            NodeKind::Leaf { container: c, .. } if c == container => Some(id),
            _ => None,
        })
    }

    fn first_leaf(&self, mut node: NodeId) -> NodeId {
        while let Some(Node { kind: NodeKind::Split { first, .. }, .. }) = self.nodes.get(node) {
            node = *first;
        }
        node
    }

    fn has_enabled(&self, node: NodeId) -> bool {
        match self.nodes.get(node).map(|n| &n.kind) {
            Some(NodeKind::Leaf { enabled, .. }) => *enabled,
            Some(NodeKind::Split { first, second, .. }) => {
                self.has_enabled(*first) || self.has_enabled(*second)
            }
            None => false,
        }
    }

    fn split_rect(rect: Rect, orientation: Orientation, ratio: f64) -> (Rect, Rect) {
        match orientation {
            Orientation::Horizontal => {
                let first = (rect.width as f64 * ratio).round() as i32;
                (
                    rect.with_size(first, rect.height),
                    Rect::new(rect.x + first, rect.y, rect.width - first, rect.height),
                )
            }
            Orientation::Vertical => {
                let first = (rect.height as f64 * ratio).round() as i32;
                (
                    rect.with_size(rect.width, first),
                    Rect::new(rect.x, rect.y + first, rect.width, rect.height - first),
                )
            }
        }
    }

    fn locate(&self, node: NodeId, rect: Rect, target: NodeId) -> Option<Rect> {
        if node == target {
            return Some(rect);
        }
        match self.nodes.get(node)?.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Split { orientation, ratio, first, second } => {
                let (r1, r2) = Self::split_rect(rect, orientation, ratio);
                self.locate(first, r1, target).or_else(|| self.locate(second, r2, target))
            }
        }
    }

    fn arrange(&self, node: NodeId, rect: Rect, out: &mut Vec<(ContainerId, Rect)>) {
        let Some(n) = self.nodes.get(node) else { return };
        match n.kind {
            NodeKind::Leaf { container, enabled } => {
                if enabled {
                    out.push((container, rect));
                }
            }
            NodeKind::Split { orientation, ratio, first, second } => {
                // A suspended subtree hands its share to the sibling.
                match (self.has_enabled(first), self.has_enabled(second)) {
                    (true, true) => {
                        let (r1, r2) = Self::split_rect(rect, orientation, ratio);
                        self.arrange(first, r1, out);
                        self.arrange(second, r2, out);
                    }
                    (true, false) => self.arrange(first, rect, out),
                    (false, true) => self.arrange(second, rect, out),
                    (false, false) => {}
                }
            }
        }
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let Some(Node { kind: NodeKind::Split { first, second, .. }, .. }) =
            self.nodes.get_mut(parent)
        {
            if *first == old {
                *first = new;
            } else if *second == old {
                *second = new;
            }
        }
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = parent;
        }
    }

    fn set_enabled(&mut self, node: NodeId, value: bool) {
        if let Some(Node { kind: NodeKind::Leaf { enabled, .. }, .. }) = self.nodes.get_mut(node) {
            *enabled = value;
        }
    }

    fn container_at(&self, node: NodeId) -> Option<ContainerId> {
        match self.nodes.get(node)?.kind {
            NodeKind::Leaf { container, .. } => Some(container),
            NodeKind::Split { .. } => None,
        }
    }

    fn collect(&self, node: NodeId, out: &mut Vec<ContainerId>) {
        match self.nodes.get(node).map(|n| &n.kind) {
            Some(NodeKind::Leaf { container, .. }) => out.push(*container),
            Some(NodeKind::Split { first, second, .. }) => {
                self.collect(*first, out);
                self.collect(*second, out);
            }
            None => {}
        }
    }

    pub fn draw_tree(&self, label: impl Fn(ContainerId) -> String) -> String {
        fn build(this: &BspLayoutSystem, node: NodeId, label: &dyn Fn(ContainerId) -> String) -> Tree {
            match this.nodes.get(node).map(|n| &n.kind) {
                Some(NodeKind::Leaf { container, enabled }) => {
                    let suffix = if *enabled { "" } else { " (disabled)" };
                    Tree::Leaf(vec![format!("{}{suffix}", label(*container))])
                }
                Some(NodeKind::Split { orientation, ratio, first, second }) => Tree::Node(
                    format!("{orientation:?} {ratio:.2}"),
                    vec![build(this, *first, label), build(this, *second, label)],
                ),
                None => Tree::Leaf(vec!["<missing>".to_string()]),
            }
        }

        let Some(root) = self.root else {
            return String::from("<empty>\n");
        };
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &build(self, root, &label)).is_err() {
            out.clear();
        }
        out
    }
}

impl LayoutSystem for BspLayoutSystem {
    fn insert(
        &mut self,
        container: ContainerId,
        anchor: Option<NodeId>,
        area: Rect,
    ) -> Option<NodeId> {
        assert!(
            self.leaf_of(container).is_none(),
            "container {container:?} inserted twice into the same bsp tree"
        );

        let previous = self.last_inserted.filter(|n| self.is_leaf(*n));
        let leaf = self.nodes.insert(Node {
            parent: None,
            kind: NodeKind::Leaf { container, enabled: true },
        });
        self.last_inserted = Some(leaf);

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return Some(leaf);
        };

        let target = anchor
            .filter(|n| *n != leaf && self.is_leaf(*n))
            .or(previous)
            .unwrap_or_else(|| self.first_leaf(root));
        let rect = self.locate(root, area, target).unwrap_or(area);
        let orientation = Orientation::for_rect(rect);
        let parent = self.nodes.get(target).and_then(|n| n.parent);

        let split = self.nodes.insert(Node {
            parent,
            kind: NodeKind::Split {
                orientation,
                ratio: 0.5,
                first: target,
                second: leaf,
            },
        });
        self.set_parent(target, Some(split));
        self.set_parent(leaf, Some(split));
        match parent {
            Some(p) => self.replace_child(p, target, split),
            None => self.root = Some(split),
        }

        trace!(?container, ?orientation, "bsp insert");
        Some(leaf)
    }

    fn remove(&mut self, node: NodeId) -> Option<ContainerId> {
        let container = self.container_at(node)?;
        let parent = self.nodes.remove(node).and_then(|n| n.parent);

        match parent {
            None => self.root = None,
            Some(p) => {
                let (sibling, grand) = match self.nodes.remove(p) {
                    Some(Node {
                        parent: grand,
                        kind: NodeKind::Split { first, second, .. },
                    }) => (if first == node { second } else { first }, grand),
                    _ => return Some(container),
                };
                self.set_parent(sibling, grand);
                match grand {
                    Some(g) => self.replace_child(g, p, sibling),
                    None => self.root = Some(sibling),
                }
            }
        }

        if self.last_inserted == Some(node) {
            self.last_inserted = None;
        }
        Some(container)
    }

    fn disable(&mut self, node: NodeId) { self.set_enabled(node, false); }

    fn enable(&mut self, node: NodeId) { self.set_enabled(node, true); }

    fn is_enabled(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node),
            Some(Node { kind: NodeKind::Leaf { enabled: true, .. }, .. })
        )
    }

    fn contains(&self, node: NodeId) -> bool { self.is_leaf(node) }

    fn swap(&mut self, a: NodeId, b: NodeId) -> bool {
        let (Some(ca), Some(cb)) = (self.container_at(a), self.container_at(b)) else {
            return false;
        };
        // A suspended member stays suspended in its new slot.
        let (ea, eb) = (self.is_enabled(a), self.is_enabled(b));
        for (node, value, on) in [(a, cb, eb), (b, ca, ea)] {
            if let Some(Node { kind: NodeKind::Leaf { container, enabled }, .. }) =
                self.nodes.get_mut(node)
            {
                *container = value;
                *enabled = on;
            }
        }
        true
    }

    fn replace(&mut self, node: NodeId, value: ContainerId, on: bool) -> Option<ContainerId> {
        match self.nodes.get_mut(node) {
            Some(Node { kind: NodeKind::Leaf { container, enabled }, .. }) => {
                *enabled = on;
                Some(std::mem::replace(container, value))
            }
            _ => None,
        }
    }

    fn members(&self) -> Vec<ContainerId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect(root, &mut out);
        }
        out
    }

    fn recompute(&self, inputs: &LayoutInputs<'_>) -> Vec<(ContainerId, Rect)> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.arrange(root, inputs.area, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::KeyData;

    use super::*;
    use crate::model::tag::MasterState;

    fn c(idx: u64) -> ContainerId { ContainerId::from(KeyData::from_ffi(idx | (1 << 32))) }

    fn area() -> Rect { Rect::new(0, 0, 1000, 600) }

    fn layout(bsp: &BspLayoutSystem) -> Vec<(ContainerId, Rect)> {
        let master = MasterState::new(&Default::default());
        bsp.recompute(&LayoutInputs {
            area: area(),
            tileable: &[],
            floating: &[],
            master: &master,
        })
    }

    #[test]
    fn first_insert_fills_area() {
        let mut bsp = BspLayoutSystem::default();
        bsp.insert(c(1), None, area());
        assert_eq!(layout(&bsp), vec![(c(1), area())]);
    }

    #[test]
    fn split_follows_longer_side() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area());
        let b = bsp.insert(c(2), a, area());
        assert_eq!(layout(&bsp), vec![
            (c(1), Rect::new(0, 0, 500, 600)),
            (c(2), Rect::new(500, 0, 500, 600)),
        ]);

        // The right half is taller than wide, so it splits vertically.
        bsp.insert(c(3), b, area());
        assert_eq!(layout(&bsp), vec![
            (c(1), Rect::new(0, 0, 500, 600)),
            (c(2), Rect::new(500, 0, 500, 300)),
            (c(3), Rect::new(500, 300, 500, 300)),
        ]);
    }

    #[test]
    fn disabled_leaf_yields_space_and_comes_back() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        let before = layout(&bsp);

        bsp.disable(b);
        assert!(!bsp.is_enabled(b));
        assert_eq!(layout(&bsp), vec![(c(1), area())]);

        bsp.enable(b);
        assert_eq!(layout(&bsp), before);
    }

    #[test]
    fn remove_collapses_parent() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        let d = bsp.insert(c(3), Some(b), area()).unwrap();

        assert_eq!(bsp.remove(b), Some(c(2)));
        assert!(!bsp.contains(b));
        assert_eq!(bsp.members(), vec![c(1), c(3)]);
        assert_eq!(layout(&bsp), vec![
            (c(1), Rect::new(0, 0, 500, 600)),
            (c(3), Rect::new(500, 0, 500, 600)),
        ]);

        bsp.remove(a);
        bsp.remove(d);
        assert!(bsp.members().is_empty());
        assert!(layout(&bsp).is_empty());
        assert_eq!(bsp.remove(d), None);
    }

    #[test]
    fn swap_exchanges_slots() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        assert!(bsp.swap(a, b));
        assert_eq!(layout(&bsp), vec![
            (c(2), Rect::new(0, 0, 500, 600)),
            (c(1), Rect::new(500, 0, 500, 600)),
        ]);
    }

    #[test]
    fn swap_carries_the_suspended_flag() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        bsp.disable(a);
        assert!(bsp.swap(a, b));
        assert!(bsp.is_enabled(a));
        assert!(!bsp.is_enabled(b));
        assert_eq!(layout(&bsp), vec![(c(2), area())]);

        // Enabling the suspended container's new slot restores both halves.
        bsp.enable(b);
        assert_eq!(layout(&bsp), vec![
            (c(2), Rect::new(0, 0, 500, 600)),
            (c(1), Rect::new(500, 0, 500, 600)),
        ]);
    }

    #[test]
    fn replace_keeps_the_slot() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        bsp.insert(c(2), Some(a), area());
        assert_eq!(bsp.replace(a, c(7), true), Some(c(1)));
        assert_eq!(bsp.members(), vec![c(7), c(2)]);
    }

    #[test]
    fn replace_takes_the_incoming_flag() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        bsp.disable(a);
        bsp.replace(a, c(7), true);
        assert!(bsp.is_enabled(a));
        bsp.replace(b, c(8), false);
        assert!(!bsp.is_enabled(b));
        assert_eq!(layout(&bsp), vec![(c(7), area())]);
    }

    #[test]
    #[should_panic(expected = "inserted twice")]
    fn double_insert_fails_fast() {
        let mut bsp = BspLayoutSystem::default();
        bsp.insert(c(1), None, area());
        bsp.insert(c(1), None, area());
    }

    #[test]
    fn draw_tree_marks_disabled_leaves() {
        let mut bsp = BspLayoutSystem::default();
        let a = bsp.insert(c(1), None, area()).unwrap();
        let b = bsp.insert(c(2), Some(a), area()).unwrap();
        bsp.disable(b);
        let drawn = bsp.draw_tree(|id| format!("{id:?}"));
        assert!(drawn.contains("Horizontal 0.50"));
        assert!(drawn.contains("(disabled)"));
    }
}
