use tracing::debug;

use super::{Reactor, Request};
use crate::actor::broadcast::{ClientProperty, ScreenProperty, Signal};
use crate::model::container::{ContainerId, ContainerState};
use crate::model::output::OutputId;
use crate::model::tag::{LayoutMode, MAX_WORKSPACE, MasterState, TagSet, clamp_workspace};
use crate::model::toplevel::{DecorationMode, ToplevelId};

impl Reactor {
    fn emit_screen_prop(&self, output: OutputId, property: ScreenProperty) {
        self.emit(Signal::ScreenProp { output, property });
    }

    /// Workspace addressed by a command; 0 means the active one. `None` when
    /// the output is blanked and no workspace is active.
    fn resolve_workspace(&self, output: OutputId, workspace: usize) -> Option<usize> {
        let out = self.output_manager.get(output)?;
        let workspace = if workspace == 0 { out.state.active_workspace } else { workspace };
        (workspace != 0).then(|| clamp_workspace(workspace))
    }

    /// Schedules every workspace shown by the active tag set of `output`.
    fn schedule_active_tags(&mut self, output: OutputId) {
        let Some(active) = self.output_manager.get(output).map(|o| o.state.active_tag) else {
            return;
        };
        for workspace in 1..MAX_WORKSPACE {
            if active.has_workspace(workspace) {
                self.schedule_tag(output, workspace);
            }
        }
    }

    /// Moves focus off a toplevel that just became invisible.
    fn refocus_if_hidden(&mut self, output: OutputId) {
        if self.output_manager.focused != output {
            return;
        }
        let hidden = self.focused_toplevel.is_none_or(|t| !self.toplevel_visible(t));
        if hidden {
            self.focus_newest_visible(output);
        }
    }

    pub(super) fn set_active_tag(&mut self, output: OutputId, tag: u32) {
        let Some(out) = self.output_manager.get_mut(output) else {
            debug!(?output, "set_active_tag for unknown output - ignoring");
            return;
        };
        let tag = TagSet::from_bits_truncate(tag);
        if tag == out.state.active_tag {
            return;
        }
        let workspace_changed = !tag.has_workspace(out.state.active_workspace);
        if workspace_changed {
            out.state.active_workspace = tag.first_workspace();
        }
        out.state.active_tag = tag;

        self.schedule_output(output);
        self.schedule_active_tags(output);
        self.refocus_if_hidden(output);
        self.emit_screen_prop(output, ScreenProperty::ActiveTag);
        if workspace_changed {
            self.emit_screen_prop(output, ScreenProperty::ActiveWorkspace);
        }
    }

    /// Shows only `workspace`; workspace 0 blanks the output.
    pub(super) fn set_view_only(&mut self, output: OutputId, workspace: usize) {
        let Some(out) = self.output_manager.get_mut(output) else {
            debug!(?output, "set_view_only for unknown output - ignoring");
            return;
        };
        let workspace = if workspace == 0 { 0 } else { clamp_workspace(workspace) };
        let tag = TagSet::workspace(workspace);
        if out.state.active_workspace == workspace && out.state.active_tag == tag {
            return;
        }
        out.state.active_tag = tag;
        out.state.active_workspace = workspace;

        if workspace != 0 {
            self.schedule_tag(output, workspace);
        }
        self.schedule_output(output);
        self.refocus_if_hidden(output);
        self.emit_screen_prop(output, ScreenProperty::ActiveTag);
        self.emit_screen_prop(output, ScreenProperty::ActiveWorkspace);
    }

    /// Adds or removes one workspace from the shown set.
    pub(super) fn toggle_tag(&mut self, output: OutputId, workspace: usize) {
        let Some(active) = self.output_manager.get(output).map(|o| o.state.active_tag) else {
            debug!(?output, "toggle_tag for unknown output - ignoring");
            return;
        };
        let toggled = active.symmetric_difference(TagSet::workspace(clamp_workspace(workspace)));
        self.set_active_tag(output, toggled.bits());
    }

    /// Moves a container to another workspace of its output.
    pub(super) fn move_to_tag(&mut self, id: ContainerId, workspace: usize) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "move_to_tag for unknown container - ignoring");
            return;
        };
        let workspace = clamp_workspace(workspace);
        if c.workspace == workspace {
            return;
        }
        let output = c.output;

        self.layout_remove(id, true);
        if let Some(c) = self.container_manager.get_mut(id) {
            c.workspace = workspace;
            c.tag = TagSet::workspace(workspace);
        }
        self.layout_insert(id);

        self.schedule_tag(output, workspace);
        self.schedule_output(output);
        self.refocus_if_hidden(output);
        self.emit_client_prop(id, ClientProperty::Workspace);
        self.emit_client_prop(id, ClientProperty::Tag);
    }

    /// Replaces the tag set a container shows on without moving it to
    /// another workspace.
    pub(super) fn set_tag(&mut self, id: ContainerId, tag: u32) {
        let tag = TagSet::from_bits_truncate(tag);
        if tag.is_empty() {
            return;
        }
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "set_tag for unknown container - ignoring");
            return;
        };
        if c.tag == tag {
            return;
        }
        c.tag = tag;
        let (output, workspace) = (c.output, c.workspace);
        self.schedule_tag(output, workspace);
        self.schedule_output(output);
        self.refocus_if_hidden(output);
        self.emit_client_prop(id, ClientProperty::Tag);
    }

    pub(super) fn set_layout_mode(&mut self, output: OutputId, workspace: usize, mode: LayoutMode) {
        let Some(workspace) = self.resolve_workspace(output, workspace) else {
            debug!(?output, "set_layout_mode without a workspace - ignoring");
            return;
        };
        let Some(out) = self.output_manager.get_mut(output) else { return };
        let tag = out.state.tag_mut(workspace);
        if tag.layout_mode == mode {
            return;
        }
        tag.layout_mode = mode;
        let containers = out.state.containers.clone();

        match mode {
            LayoutMode::Bsp => self.insert_tiled_into_bsp(output, workspace),
            LayoutMode::Floating => {
                for id in &containers {
                    let Some(c) = self.container_manager.get(*id) else { continue };
                    if c.workspace == workspace
                        && c.configure_allowed()
                        && self.container_visible(c)
                    {
                        self.restore_floating_box(*id);
                    }
                }
            }
            LayoutMode::MasterStack => {}
        }

        self.refresh_decorations(output, workspace);
        self.schedule_tag(output, workspace);
        self.emit_screen_prop(output, ScreenProperty::LayoutMode);
    }

    /// Gives every visible, non-floating container of the workspace that has
    /// no slot yet a place in the BSP tree.
    pub(super) fn insert_tiled_into_bsp(&mut self, output: OutputId, workspace: usize) {
        let Some(out) = self.output_manager.get(output) else { return };
        let eligible: Vec<ContainerId> = out
            .state
            .containers
            .iter()
            .copied()
            .filter(|id| {
                self.container_manager.get(*id).is_some_and(|c| {
                    self.container_visible_in_workspace(c, workspace)
                        && !c.state.contains(ContainerState::FLOATING)
                        && c.layout_handle.is_none()
                })
            })
            .collect();
        for id in eligible {
            self.layout_insert(id);
        }
    }

    /// Re-resolves the decoration of toplevels whose policy depends on the
    /// workspace being floating.
    fn refresh_decorations(&mut self, output: OutputId, workspace: usize) {
        let Some(out) = self.output_manager.get(output) else { return };
        let floating_workspace = out.state.tag(workspace).layout_mode == LayoutMode::Floating;
        let targets: Vec<ToplevelId> = out
            .state
            .toplevels
            .iter()
            .copied()
            .filter(|t| {
                self.toplevel_manager.get(*t).is_some_and(|t| {
                    t.decoration == DecorationMode::ClientSideOnFloating
                        && t.container
                            .and_then(|c| self.container_manager.get(c))
                            .is_some_and(|c| c.workspace == workspace)
                })
            })
            .collect();
        for toplevel in targets {
            self.send_decoration(toplevel, floating_workspace);
        }
    }

    pub(super) fn send_decoration(&self, toplevel: ToplevelId, floating_workspace: bool) {
        let Some(t) = self.toplevel_manager.get(toplevel) else { return };
        let mode = t.decoration.resolve(t.requested_decoration, floating_workspace);
        self.send(Request::SetDecorationMode { toplevel, mode });
    }

    /// Walks the master arrangement list of the active workspace.
    pub(super) fn set_strategy_idx(&mut self, output: OutputId, step: i32) {
        let Some(workspace) = self.resolve_workspace(output, 0) else { return };
        let Some(out) = self.output_manager.get_mut(output) else { return };
        let tag = out.state.tag_mut(workspace);
        if tag.layout_mode != LayoutMode::MasterStack || step == 0 {
            return;
        }
        tag.master.cycle(step);
        self.schedule_tag(output, workspace);
        self.emit_screen_prop(output, ScreenProperty::StrategyIdx);
    }

    pub(super) fn set_useless_gaps(&mut self, output: OutputId, workspace: usize, gaps: i32) {
        let Some(workspace) = self.resolve_workspace(output, workspace) else { return };
        let Some(out) = self.output_manager.get_mut(output) else {
            debug!(?output, "set_useless_gaps for unknown output - ignoring");
            return;
        };
        let gaps = gaps.clamp(0, out.usable_area.max_inset());
        let tag = out.state.tag_mut(workspace);
        if tag.useless_gaps == gaps {
            return;
        }
        tag.useless_gaps = gaps;
        self.schedule_tag(output, workspace);
        self.emit_screen_prop(output, ScreenProperty::UselessGaps);
    }

    pub(super) fn set_mwfact(&mut self, output: OutputId, mwfact: f64) {
        if mwfact.is_nan() {
            return;
        }
        let mwfact = mwfact.clamp(MasterState::MIN_MWFACT, MasterState::MAX_MWFACT);
        self.update_master(output, ScreenProperty::Mwfact, |m| m.mwfact = mwfact);
    }

    pub(super) fn set_master_count(&mut self, output: OutputId, count: u32) {
        let count = count.max(1);
        self.update_master(output, ScreenProperty::MasterCount, |m| m.master_count = count);
    }

    pub(super) fn set_column_count(&mut self, output: OutputId, count: u32) {
        let count = count.max(1);
        self.update_master(output, ScreenProperty::ColumnCount, |m| m.column_count = count);
    }

    fn update_master(
        &mut self,
        output: OutputId,
        property: ScreenProperty,
        f: impl FnOnce(&mut MasterState),
    ) {
        let Some(workspace) = self.resolve_workspace(output, 0) else {
            debug!(?output, ?property, "master update without a workspace - ignoring");
            return;
        };
        let Some(out) = self.output_manager.get_mut(output) else { return };
        let master = &mut out.state.tag_mut(workspace).master;
        let before = master.clone();
        f(master);
        if *master == before {
            return;
        }
        self.schedule_tag(output, workspace);
        self.emit_screen_prop(output, property);
    }

    /// Brings a toplevel on screen and focuses it. With `merge` its tags are
    /// added to the shown set instead of replacing it.
    pub(super) fn jump_to(&mut self, toplevel: ToplevelId, merge: bool) {
        let Some(id) = self.toplevel_manager.get(toplevel).and_then(|t| t.container) else {
            debug!(?toplevel, "jump_to for uncontained toplevel - ignoring");
            return;
        };
        let Some(c) = self.container_manager.get(id) else { return };
        let (output, workspace, tag, minimized) = (c.output, c.workspace, c.tag, c.is_minimized());

        if !self.toplevel_visible(toplevel) {
            if merge {
                let active = self
                    .output_manager
                    .get(output)
                    .map_or(TagSet::empty(), |o| o.state.active_tag);
                self.set_active_tag(output, (active | tag).bits());
            } else {
                self.set_view_only(output, workspace);
            }
        }
        if minimized {
            self.set_minimized(id, false);
        }
        self.focus_toplevel(toplevel);
    }

    pub(super) fn set_max_general_workspace(&mut self, output: OutputId, max: usize) {
        let Some(out) = self.output_manager.get_mut(output) else {
            debug!(?output, "set_max_general_workspace for unknown output - ignoring");
            return;
        };
        let max = max.clamp(1, MAX_WORKSPACE - 1);
        if out.state.max_general_workspace == max {
            return;
        }
        out.state.max_general_workspace = max;
        self.emit_screen_prop(output, ScreenProperty::MaxGeneralWorkspace);
    }
}
