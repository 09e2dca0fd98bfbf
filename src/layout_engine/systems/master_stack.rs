use crate::layout_engine::systems::{LayoutInputs, LayoutSystem, NodeId, split_even};
use crate::model::container::ContainerId;
use crate::model::tag::{MasterLayout, MasterState};
use crate::sys::geometry::Rect;

/// Master/stack tiling. Membership is derived from the workspace's tileable
/// containers in focus order, so the strategy keeps no per-member state.
#[derive(Clone, Copy, Debug, Default)]
pub struct MasterStackLayoutSystem;

impl MasterStackLayoutSystem {
    fn tile(area: Rect, members: &[ContainerId], master: &MasterState, mirrored: bool) -> Vec<Rect> {
        let n = members.len();
        if n == 0 {
            return Vec::new();
        }
        let masters = (master.master_count as usize).min(n);
        let stack = n - masters;

        let master_width = if stack == 0 {
            area.width
        } else {
            (area.width as f64 * master.mwfact).round() as i32
        };
        let stack_width = area.width - master_width;

        let (master_x, stack_x) = if mirrored {
            (area.x + stack_width, area.x)
        } else {
            (area.x, area.x + master_width)
        };

        let mut rects = split_even(Rect::new(master_x, area.y, master_width, area.height), masters, false);
        if stack == 0 {
            return rects;
        }

        let stack_area = Rect::new(stack_x, area.y, stack_width, area.height);
        let columns = (master.column_count as usize).clamp(1, stack);
        let per_column = stack / columns;
        let extra = stack % columns;
        for (i, column) in split_even(stack_area, columns, true).into_iter().enumerate() {
            let count = per_column + usize::from(i < extra);
            rects.extend(split_even(column, count, false));
        }
        rects
    }
}

impl LayoutSystem for MasterStackLayoutSystem {
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
        let members = inputs.tileable;
        let rects = match inputs.master.current_layout() {
            MasterLayout::Tile => Self::tile(inputs.area, members, inputs.master, false),
            MasterLayout::TileLeft => Self::tile(inputs.area, members, inputs.master, true),
            MasterLayout::Monocle => vec![inputs.area; members.len()],
        };
        members.iter().copied().zip(rects).collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::KeyData;

    use super::*;
    use crate::common::config::LayoutSettings;

    fn c(idx: u64) -> ContainerId { ContainerId::from(KeyData::from_ffi(idx | (1 << 32))) }

    fn run(members: &[ContainerId], master: &MasterState) -> Vec<(ContainerId, Rect)> {
        MasterStackLayoutSystem.recompute(&LayoutInputs {
            area: Rect::new(0, 0, 1000, 600),
            tileable: members,
            floating: &[],
            master,
        })
    }

    #[test]
    fn single_master_fills_area() {
        let master = MasterState::new(&LayoutSettings::default());
        assert_eq!(run(&[c(1)], &master), vec![(c(1), Rect::new(0, 0, 1000, 600))]);
    }

    #[test]
    fn tile_puts_master_left() {
        let master = MasterState::new(&LayoutSettings::default());
        assert_eq!(run(&[c(1), c(2), c(3)], &master), vec![
            (c(1), Rect::new(0, 0, 500, 600)),
            (c(2), Rect::new(500, 0, 500, 300)),
            (c(3), Rect::new(500, 300, 500, 300)),
        ]);
    }

    #[test]
    fn tile_left_mirrors() {
        let mut master = MasterState::new(&LayoutSettings {
            mwfact: 0.6,
            ..Default::default()
        });
        master.cycle(1);
        assert_eq!(run(&[c(1), c(2)], &master), vec![
            (c(1), Rect::new(400, 0, 600, 600)),
            (c(2), Rect::new(0, 0, 400, 600)),
        ]);
    }

    #[test]
    fn stack_spreads_over_columns() {
        let master = MasterState::new(&LayoutSettings {
            column_count: 2,
            ..Default::default()
        });
        let out = run(&[c(1), c(2), c(3), c(4)], &master);
        assert_eq!(out[1], (c(2), Rect::new(500, 0, 250, 300)));
        assert_eq!(out[2], (c(3), Rect::new(500, 300, 250, 300)));
        assert_eq!(out[3], (c(4), Rect::new(750, 0, 250, 600)));
    }

    #[test]
    fn monocle_stacks_everything() {
        let mut master = MasterState::new(&LayoutSettings::default());
        master.cycle(-1);
        let out = run(&[c(1), c(2)], &master);
        assert!(out.iter().all(|(_, r)| *r == Rect::new(0, 0, 1000, 600)));
    }
}
