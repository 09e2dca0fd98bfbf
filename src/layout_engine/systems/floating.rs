use crate::layout_engine::systems::{LayoutInputs, LayoutSystem, NodeId};
use crate::model::container::ContainerId;
use crate::sys::geometry::Rect;

/// Floating members keep whatever box they last had; the strategy owns no
/// nodes and only hands the saved boxes back.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatingLayoutSystem;

impl LayoutSystem for FloatingLayoutSystem {
    fn insert(&mut self, _: ContainerId, _: Option<NodeId>, _: Rect) -> Option<NodeId> { None }

    fn remove(&mut self, _: NodeId) -> Option<ContainerId> { None }

    fn disable(&mut self, _: NodeId) {}

    fn enable(&mut self, _: NodeId) {}

    fn is_enabled(&self, _: NodeId) -> bool { false }

    fn contains(&self, _: NodeId) -> bool { false }

    fn swap(&mut self, _: NodeId, _: NodeId) -> bool { false }

    fn replace(&mut self, _: NodeId, _: ContainerId, _: bool) -> Option<ContainerId> { None }

    fn members(&self) -> Vec<ContainerId> { Vec::new() }

    fn recompute(&self, inputs: &LayoutInputs<'_>) -> Vec<(ContainerId, Rect)> {
        inputs.floating.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::KeyData;

    use super::*;
    use crate::model::tag::MasterState;

    #[test]
    fn recompute_restores_saved_boxes() {
        let id = ContainerId::from(KeyData::from_ffi(1 | (1 << 32)));
        let boxes = [(id, Rect::new(40, 50, 300, 200))];
        let master = MasterState::new(&Default::default());
        let mut floating = FloatingLayoutSystem;

        assert_eq!(floating.insert(id, None, Rect::new(0, 0, 10, 10)), None);
        let out = floating.recompute(&LayoutInputs {
            area: Rect::new(0, 0, 1920, 1080),
            tileable: &[],
            floating: &boxes,
            master: &master,
        });
        assert_eq!(out, boxes.to_vec());
    }
}
