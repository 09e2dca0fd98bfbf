use bitflags::bitflags;
use serde::Serialize;
use slotmap::new_key_type;

use crate::layout_engine::LayoutHandle;
use crate::model::output::OutputId;
use crate::model::tag::TagSet;
use crate::model::toplevel::ToplevelId;
use crate::sys::geometry::Rect;

new_key_type! {
    pub struct ContainerId;
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct ContainerState: u32 {
        const FLOATING   = 1 << 0;
        const MAXIMIZED  = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const MINIMIZED  = 1 << 3;
        const STICKY     = 1 << 4;
        const UNMANAGED  = 1 << 5;
    }
}

/// Placement a container had on an output that went away, kept so the same
/// display can take it back on reconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OldPlacement {
    pub output: OutputId,
    pub handle: Option<LayoutHandle>,
    pub workspace: usize,
    pub tag: TagSet,
}

#[derive(Debug)]
pub struct Container {
    pub output: OutputId,
    /// Stacking order, front first.
    pub toplevels: Vec<ToplevelId>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub floating_box: Rect,
    pub opacity: f32,
    pub workspace: usize,
    pub tag: TagSet,
    pub state: ContainerState,
    pub layout_handle: Option<LayoutHandle>,
    /// Maximize again once fullscreen is left.
    pub restore_maximized: bool,
    pub old_placement: Option<OldPlacement>,
    pub border_width: i32,
    pub border_enabled: bool,
    /// Render subtree disabled.
    pub hidden: bool,
    pub backdrop: bool,
}

impl Container {
    pub fn new(output: OutputId, geometry: Rect, workspace: usize, tag: TagSet) -> Self {
        Self {
            output,
            toplevels: Vec::new(),
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            floating_box: geometry,
            opacity: 1.0,
            workspace,
            tag,
            state: ContainerState::empty(),
            layout_handle: None,
            restore_maximized: false,
            old_placement: None,
            border_width: 0,
            border_enabled: true,
            hidden: false,
            backdrop: false,
        }
    }

    pub fn rect(&self) -> Rect { Rect::new(self.x, self.y, self.width, self.height) }

    pub fn front(&self) -> Option<ToplevelId> { self.toplevels.first().copied() }

    pub fn is_unmanaged(&self) -> bool { self.state.contains(ContainerState::UNMANAGED) }

    pub fn is_maximized(&self) -> bool { self.state.contains(ContainerState::MAXIMIZED) }

    pub fn is_fullscreen(&self) -> bool { self.state.contains(ContainerState::FULLSCREEN) }

    pub fn is_minimized(&self) -> bool { self.state.contains(ContainerState::MINIMIZED) }

    pub fn is_sticky(&self) -> bool { self.state.contains(ContainerState::STICKY) }

    /// Geometry may be changed by the user or the client.
    pub fn configure_allowed(&self) -> bool { !self.is_fullscreen() && !self.is_maximized() }

    pub fn effective_border(&self) -> i32 { if self.border_enabled { self.border_width } else { 0 } }

    /// Border plus gaps on each side.
    pub fn outside_width(&self, gaps: i32) -> i32 {
        self.effective_border().saturating_add(gaps).saturating_mul(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container::new(OutputId::default(), Rect::new(0, 0, 200, 100), 1, TagSet::workspace(1))
    }

    #[test]
    fn configure_guard_tracks_max_and_full() {
        let mut c = container();
        assert!(c.configure_allowed());
        c.state.insert(ContainerState::MAXIMIZED);
        assert!(!c.configure_allowed());
        c.state.remove(ContainerState::MAXIMIZED);
        c.state.insert(ContainerState::FULLSCREEN);
        assert!(!c.configure_allowed());
    }

    #[test]
    fn outside_width_ignores_disabled_border() {
        let mut c = container();
        c.border_width = 3;
        assert_eq!(c.outside_width(4), 14);
        c.border_enabled = false;
        assert_eq!(c.outside_width(4), 8);
    }
}
