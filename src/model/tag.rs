use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use strum::{Display, EnumString, IntoStaticStr};

use crate::common::config::LayoutSettings;
use crate::layout_engine::{LayoutSystemKind, LayoutSystems};
use crate::sys::geometry::MAX_INSET;

/// Workspaces are numbered `1..MAX_WORKSPACE`; index 0 means "nothing".
pub const MAX_WORKSPACE: usize = 31;
pub const DEFAULT_MAX_GENERAL_WORKSPACE: usize = 9;

const_assert!(MAX_WORKSPACE - 1 <= u32::BITS as usize);

bitflags! {
    /// Bitfield of workspaces; bit `n - 1` stands for workspace `n`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TagSet: u32 {
        /// Every addressable workspace. Bits past it name no workspace and
        /// are dropped by `from_bits_truncate`.
        const WORKSPACES = (1 << (MAX_WORKSPACE as u32 - 1)) - 1;
    }
}

impl TagSet {
    /// The singleton set for `workspace`, or the empty set for workspace 0.
    pub fn workspace(workspace: usize) -> Self {
        if workspace == 0 || workspace >= MAX_WORKSPACE {
            return TagSet::empty();
        }
        TagSet::from_bits_retain(1 << (workspace - 1))
    }

    pub fn has_workspace(self, workspace: usize) -> bool {
        workspace != 0 && self.intersects(TagSet::workspace(workspace))
    }

    /// Lowest workspace represented in the set, or 0 when it is empty.
    pub fn first_workspace(self) -> usize {
        let mut bits = self.bits();
        for i in 1..MAX_WORKSPACE {
            if bits & 1 == 1 {
                return i;
            }
            bits >>= 1;
        }
        0
    }
}

/// Clamps a user supplied workspace index into the addressable range.
pub fn clamp_workspace(workspace: usize) -> usize { workspace.clamp(1, MAX_WORKSPACE - 1) }

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Floating,
    Bsp,
    MasterStack,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 3] = [LayoutMode::Floating, LayoutMode::Bsp, LayoutMode::MasterStack];

    pub fn is_tiling(self) -> bool { !matches!(self, LayoutMode::Floating) }

    pub(crate) fn index(self) -> usize {
        match self {
            LayoutMode::Floating => 0,
            LayoutMode::Bsp => 1,
            LayoutMode::MasterStack => 2,
        }
    }
}

/// Named arrangements available to the master-stack strategy.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MasterLayout {
    /// Masters on the left, stack columns on the right.
    Tile,
    /// Masters on the right, stack columns on the left.
    TileLeft,
    /// Every member fills the whole area.
    Monocle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MasterState {
    pub master_count: u32,
    pub column_count: u32,
    pub mwfact: f64,
    layouts: Vec<MasterLayout>,
    current: usize,
}

impl MasterState {
    pub const MIN_MWFACT: f64 = 0.1;
    pub const MAX_MWFACT: f64 = 0.9;

    pub fn new(settings: &LayoutSettings) -> Self {
        let mut layouts = settings.master_layouts.clone();
        if layouts.is_empty() {
            layouts.push(MasterLayout::Tile);
        }
        Self {
            master_count: settings.master_count.max(1),
            column_count: settings.column_count.max(1),
            mwfact: settings.mwfact.clamp(Self::MIN_MWFACT, Self::MAX_MWFACT),
            layouts,
            current: 0,
        }
    }

    pub fn current_layout(&self) -> MasterLayout {
        self.layouts.get(self.current).copied().unwrap_or(MasterLayout::Tile)
    }

    /// Walks the cyclic arrangement list `step` entries forward (or backward
    /// when negative).
    pub fn cycle(&mut self, step: i32) {
        let len = self.layouts.len() as i64;
        if len == 0 {
            return;
        }
        let next = (self.current as i64 + step as i64).rem_euclid(len);
        self.current = next as usize;
    }
}

/// Layout configuration of a single (output, workspace) pair.
#[derive(Debug)]
pub struct TagInfo {
    pub index: usize,
    pub layout_mode: LayoutMode,
    pub useless_gaps: i32,
    pub master: MasterState,
    pub pending_transaction: bool,
    pub(crate) systems: LayoutSystems,
}

impl TagInfo {
    pub fn new(index: usize, settings: &LayoutSettings) -> Self {
        Self {
            index,
            layout_mode: settings.default_mode,
            useless_gaps: settings.useless_gaps.clamp(0, MAX_INSET),
            master: MasterState::new(settings),
            pending_transaction: false,
            systems: LayoutSystems::default(),
        }
    }

    pub fn system(&self, mode: LayoutMode) -> &LayoutSystemKind { self.systems.get(mode) }

    pub fn system_mut(&mut self, mode: LayoutMode) -> &mut LayoutSystemKind {
        self.systems.get_mut(mode)
    }

    pub fn active_system(&self) -> &LayoutSystemKind { self.systems.get(self.layout_mode) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_tags() {
        assert_eq!(TagSet::workspace(1).bits(), 0b1);
        assert_eq!(TagSet::workspace(3).bits(), 0b100);
        assert!(TagSet::workspace(0).is_empty());
        assert!(TagSet::workspace(MAX_WORKSPACE).is_empty());
    }

    #[test]
    fn first_workspace_picks_lowest_bit() {
        assert_eq!(TagSet::from_bits_retain(0b0110).first_workspace(), 2);
        assert_eq!(TagSet::from_bits_retain(0b1000_0000).first_workspace(), 8);
        assert!(TagSet::from_bits_truncate(1 << 31 | 1 << 30).is_empty());
        assert_eq!(TagSet::from_bits_truncate(!0), TagSet::WORKSPACES);
        assert_eq!(TagSet::WORKSPACES.first_workspace(), 1);
        assert!(TagSet::WORKSPACES.has_workspace(MAX_WORKSPACE - 1));
        assert_eq!(TagSet::empty().first_workspace(), 0);
    }

    #[test]
    fn has_workspace_ignores_zero() {
        let tags = TagSet::from_bits_retain(0b101);
        assert!(tags.has_workspace(1));
        assert!(!tags.has_workspace(2));
        assert!(tags.has_workspace(3));
        assert!(!tags.has_workspace(0));
    }

    #[test]
    fn master_layouts_cycle_both_ways() {
        let mut state = MasterState::new(&LayoutSettings::default());
        assert_eq!(state.current_layout(), MasterLayout::Tile);
        state.cycle(1);
        assert_eq!(state.current_layout(), MasterLayout::TileLeft);
        state.cycle(-2);
        assert_eq!(state.current_layout(), MasterLayout::Monocle);
        state.cycle(4);
        assert_eq!(state.current_layout(), MasterLayout::Tile);
    }

    #[test]
    fn layout_mode_names() {
        assert_eq!(LayoutMode::MasterStack.to_string(), "master_stack");
        assert_eq!("bsp".parse::<LayoutMode>().unwrap(), LayoutMode::Bsp);
        assert!(!LayoutMode::Floating.is_tiling());
    }
}
