use enum_dispatch::enum_dispatch;

use crate::model::container::ContainerId;
use crate::model::tag::{LayoutMode, MasterState};
use crate::sys::geometry::Rect;

slotmap::new_key_type! { pub struct NodeId; }

/// A strategy-owned handle stored in a container. The mode names the
/// strategy instance that allocated the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayoutHandle {
    pub mode: LayoutMode,
    pub node: NodeId,
}

/// Everything a strategy may look at when it recomputes geometry.
#[derive(Clone, Copy)]
pub struct LayoutInputs<'a> {
    pub area: Rect,
    /// Tileable members of the workspace, most recently focused first.
    pub tileable: &'a [ContainerId],
    /// Configurable floating members with their saved floating box.
    pub floating: &'a [(ContainerId, Rect)],
    pub master: &'a MasterState,
}

#[enum_dispatch]
pub trait LayoutSystem {
    /// Adds `container` next to `anchor` (or the strategy's own choice) and
    /// returns its handle. Strategies without membership return `None`.
    fn insert(&mut self, container: ContainerId, anchor: Option<NodeId>, area: Rect)
    -> Option<NodeId>;
    fn remove(&mut self, node: NodeId) -> Option<ContainerId>;
    /// Suspends a member without giving up its position.
    fn disable(&mut self, node: NodeId);
    fn enable(&mut self, node: NodeId);
    fn is_enabled(&self, node: NodeId) -> bool;
    fn contains(&self, node: NodeId) -> bool;
    fn swap(&mut self, a: NodeId, b: NodeId) -> bool;
    /// Puts `container` in the slot of `node`, returning the previous holder.
    /// The slot takes on `enabled` from the incoming container.
    fn replace(&mut self, node: NodeId, container: ContainerId, enabled: bool)
    -> Option<ContainerId>;
    fn members(&self) -> Vec<ContainerId>;
    /// Geometry for every enabled member, derived only from strategy state
    /// and `inputs`.
    fn recompute(&self, inputs: &LayoutInputs<'_>) -> Vec<(ContainerId, Rect)>;
}

mod bsp;
pub use bsp::BspLayoutSystem;
mod floating;
pub use floating::FloatingLayoutSystem;
mod master_stack;
pub use master_stack::MasterStackLayoutSystem;

#[derive(Debug)]
#[enum_dispatch(LayoutSystem)]
pub enum LayoutSystemKind {
    Floating(FloatingLayoutSystem),
    Bsp(BspLayoutSystem),
    MasterStack(MasterStackLayoutSystem),
}

impl LayoutSystemKind {
    pub fn new(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Floating => FloatingLayoutSystem.into(),
            LayoutMode::Bsp => BspLayoutSystem::default().into(),
            LayoutMode::MasterStack => MasterStackLayoutSystem.into(),
        }
    }
}

/// One strategy instance per layout mode, so switching modes keeps every
/// strategy's state.
#[derive(Debug)]
pub struct LayoutSystems([LayoutSystemKind; 3]);

impl Default for LayoutSystems {
    fn default() -> Self { Self(LayoutMode::ALL.map(LayoutSystemKind::new)) }
}

impl LayoutSystems {
    pub fn get(&self, mode: LayoutMode) -> &LayoutSystemKind { &self.0[mode.index()] }

    pub fn get_mut(&mut self, mode: LayoutMode) -> &mut LayoutSystemKind {
        &mut self.0[mode.index()]
    }
}

/// Cuts `rect` into `count` slices along `horizontal` (side by side) or
/// stacked. The last slice absorbs rounding.
pub(crate) fn split_even(rect: Rect, count: usize, horizontal: bool) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let n = count as i32;
    let total = if horizontal { rect.width } else { rect.height };
    let step = total / n;
    (0..n)
        .map(|i| {
            let len = if i == n - 1 { total - step * (n - 1) } else { step };
            if horizontal {
                Rect::new(rect.x + step * i, rect.y, len, rect.height)
            } else {
                Rect::new(rect.x, rect.y + step * i, rect.width, len)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_even_absorbs_remainder() {
        let parts = split_even(Rect::new(0, 0, 100, 10), 3, true);
        assert_eq!(parts, vec![
            Rect::new(0, 0, 33, 10),
            Rect::new(33, 0, 33, 10),
            Rect::new(66, 0, 34, 10),
        ]);
        assert!(split_even(Rect::new(0, 0, 100, 10), 0, false).is_empty());
    }

    #[test]
    fn each_mode_has_its_own_instance() {
        let systems = LayoutSystems::default();
        assert!(matches!(systems.get(LayoutMode::Floating), LayoutSystemKind::Floating(_)));
        assert!(matches!(systems.get(LayoutMode::Bsp), LayoutSystemKind::Bsp(_)));
        assert!(matches!(
            systems.get(LayoutMode::MasterStack),
            LayoutSystemKind::MasterStack(_)
        ));
    }
}
