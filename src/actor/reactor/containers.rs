use tracing::{debug, trace};

use super::{IdleTask, Reactor, Request};
use crate::actor::broadcast::{ClientProperty, Signal};
use crate::layout_engine::{LayoutHandle, LayoutSystem};
use crate::model::container::{Container, ContainerId, ContainerState};
use crate::model::output::OutputId;
use crate::model::tag::{LayoutMode, TagSet};
use crate::model::toplevel::ToplevelId;
use crate::sys::geometry::{MAX_INSET, Rect};

/// Smallest surface size ever requested from a client.
pub const MIN_SURFACE_SIZE: i32 = 20;

impl Reactor {
    // Strategy handles.

    /// Suspends the container's strategy node without giving up its slot.
    fn layout_disable(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let (Some(handle), output, workspace) = (c.layout_handle, c.output, c.workspace) else {
            return;
        };
        if let Some(out) = self.output_manager.get_mut(output) {
            out.state.tag_mut(workspace).system_mut(handle.mode).disable(handle.node);
        }
    }

    fn layout_enable(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let (Some(handle), output, workspace) = (c.layout_handle, c.output, c.workspace) else {
            return;
        };
        if let Some(out) = self.output_manager.get_mut(output) {
            out.state.tag_mut(workspace).system_mut(handle.mode).enable(handle.node);
        }
    }

    /// Takes the container out of its strategy. With `rearrange` the vacated
    /// workspace is recomputed so the remaining members close the gap.
    pub(super) fn layout_remove(&mut self, id: ContainerId, rearrange: bool) {
        let Some(c) = self.container_manager.get_mut(id) else { return };
        let Some(handle) = c.layout_handle.take() else { return };
        let (output, workspace) = (c.output, c.workspace);
        if let Some(out) = self.output_manager.get_mut(output) {
            out.state.tag_mut(workspace).system_mut(handle.mode).remove(handle.node);
        }
        if rearrange {
            self.schedule_tag(output, workspace);
        }
    }

    /// Inserts a handle-less, non-floating container into the BSP tree of its
    /// workspace when that workspace tiles with BSP. Maximized and fullscreen
    /// containers get a disabled slot.
    pub(super) fn layout_insert(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        if c.layout_handle.is_some()
            || c.is_unmanaged()
            || c.state.contains(ContainerState::FLOATING)
        {
            return;
        }
        let (output, workspace) = (c.output, c.workspace);
        let suspended = !c.configure_allowed() || c.is_minimized();
        let Some(out) = self.output_manager.get(output) else { return };
        if out.state.tag(workspace).layout_mode != LayoutMode::Bsp {
            return;
        }

        let anchor = out.state.focus_stack.iter().find_map(|other| {
            let o = self.container_manager.get(*other)?;
            match o.layout_handle {
                Some(h) if *other != id && o.workspace == workspace && h.mode == LayoutMode::Bsp => {
                    Some(h.node)
                }
                _ => None,
            }
        });
        let area = out.usable_area;

        let Some(out) = self.output_manager.get_mut(output) else { return };
        let system = out.state.tag_mut(workspace).system_mut(LayoutMode::Bsp);
        let Some(node) = system.insert(id, anchor, area) else { return };
        if suspended {
            system.disable(node);
        }
        if let Some(c) = self.container_manager.get_mut(id) {
            c.layout_handle = Some(LayoutHandle { mode: LayoutMode::Bsp, node });
        }
        trace!(?id, workspace, "inserted into bsp");
    }

    // State machine.

    pub(super) fn set_floating(&mut self, id: ContainerId, set: bool) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "set_floating for unknown container - ignoring");
            return;
        };
        if !c.configure_allowed() {
            return;
        }
        let was_flagged = c.state.contains(ContainerState::FLOATING);
        let floating = self.container_floating(c);
        let (output, workspace) = (c.output, c.workspace);

        if set {
            if was_flagged {
                return;
            }
            if let Some(c) = self.container_manager.get_mut(id) {
                c.state.insert(ContainerState::FLOATING);
            }
            self.restore_floating_box(id);
            self.layout_disable(id);
        } else {
            if !floating {
                return;
            }
            if let Some(c) = self.container_manager.get_mut(id) {
                c.state.remove(ContainerState::FLOATING);
            }
            let has_handle = self.container_manager.get(id).is_some_and(|c| c.layout_handle.is_some());
            if has_handle {
                self.layout_enable(id);
            } else {
                self.layout_insert(id);
            }
        }

        self.schedule_tag(output, workspace);
        self.emit_client_prop(id, ClientProperty::Floating);
    }

    pub(super) fn set_maximized(&mut self, id: ContainerId, set: bool) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "set_maximized for unknown container - ignoring");
            return;
        };
        let mut set = set;
        if c.is_fullscreen() {
            if let Some(c) = self.container_manager.get_mut(id) {
                c.restore_maximized = false;
            }
            self.set_fullscreen(id, false);
            set = true;
        }
        let Some(c) = self.container_manager.get_mut(id) else { return };
        let (output, workspace) = (c.output, c.workspace);
        c.border_enabled = !set;
        if set {
            c.state.insert(ContainerState::MAXIMIZED);
        } else {
            c.state.remove(ContainerState::MAXIMIZED);
        }
        self.send_border(id);

        if set {
            self.layout_disable(id);
            self.apply_maximized_geometry(id);
        } else if self.container_manager.get(id).is_some_and(|c| self.container_floating(c)) {
            self.restore_floating_box(id);
        } else {
            self.layout_enable(id);
        }

        self.schedule_tag(output, workspace);
        self.emit_client_prop(id, ClientProperty::Maximized);
    }

    pub(super) fn set_fullscreen(&mut self, id: ContainerId, set: bool) {
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "set_fullscreen for unknown container - ignoring");
            return;
        };
        if c.is_fullscreen() == set {
            return;
        }
        let (output, workspace) = (c.output, c.workspace);
        c.border_enabled = !set;

        if set {
            if c.is_maximized() {
                c.state.remove(ContainerState::MAXIMIZED);
                c.restore_maximized = true;
            }
            c.state.insert(ContainerState::FULLSCREEN);
            c.backdrop = true;
            self.send_border(id);
            self.layout_disable(id);
            let backdrop = self.output_manager.get(output).map(|o| o.layout_box);
            self.send(Request::SetBackdrop { container: id, backdrop });
            self.apply_fullscreen_geometry(id);
        } else {
            c.state.remove(ContainerState::FULLSCREEN);
            let had_backdrop = std::mem::replace(&mut c.backdrop, false);
            let remaximize = std::mem::replace(&mut c.restore_maximized, false);
            self.send_border(id);
            if self.container_manager.get(id).is_some_and(|c| self.container_floating(c)) {
                self.restore_floating_box(id);
            } else {
                self.layout_enable(id);
            }
            if had_backdrop {
                self.send(Request::SetBackdrop { container: id, backdrop: None });
            }
            if remaximize {
                self.set_maximized(id, true);
            }
        }

        self.schedule_tag(output, workspace);
        self.emit_client_prop(id, ClientProperty::Fullscreen);
    }

    pub(super) fn set_minimized(&mut self, id: ContainerId, set: bool) {
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "set_minimized for unknown container - ignoring");
            return;
        };
        if c.is_minimized() == set {
            return;
        }
        let (output, workspace) = (c.output, c.workspace);

        if set {
            c.state.insert(ContainerState::MINIMIZED);
            if let Some(out) = self.output_manager.get_mut(output) {
                if !out.state.minimized.contains(&id) {
                    out.state.minimized.insert(0, id);
                }
            }
            self.layout_disable(id);
            let holds_focus = self
                .focused_toplevel
                .and_then(|t| self.toplevel_manager.get(t))
                .is_some_and(|t| t.container == Some(id));
            if holds_focus {
                self.focus_newest_visible(output);
            }
        } else {
            c.state.remove(ContainerState::MINIMIZED);
            if let Some(out) = self.output_manager.get_mut(output) {
                out.state.minimized.retain(|m| *m != id);
            }
            self.layout_enable(id);
        }

        self.schedule_tag(output, workspace);
        self.schedule_output(output);
        self.emit_client_prop(id, ClientProperty::Minimized);
    }

    pub(super) fn set_sticky(&mut self, id: ContainerId, set: bool) {
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "set_sticky for unknown container - ignoring");
            return;
        };
        if c.is_sticky() == set {
            return;
        }
        let (output, workspace) = (c.output, c.workspace);
        c.state.set(ContainerState::STICKY, set);
        if !set {
            self.schedule_output(output);
        }
        self.schedule_tag(output, workspace);
        self.emit_client_prop(id, ClientProperty::Sticky);
    }

    // Front toplevel.

    /// Makes `toplevel` the visible front of its container.
    pub(super) fn set_front_toplevel(&mut self, toplevel: ToplevelId) {
        let Some(container) = self.toplevel_manager.get(toplevel).and_then(|t| t.container) else {
            debug!(?toplevel, "set_front for uncontained toplevel - ignoring");
            return;
        };
        let Some(c) = self.container_manager.get_mut(container) else { return };
        let Some(pos) = c.toplevels.iter().position(|t| *t == toplevel) else { return };
        if pos != 0 {
            c.toplevels.remove(pos);
            c.toplevels.insert(0, toplevel);
        }
        self.apply_front(container);
    }

    /// Rotates the front by `step` positions through the container's stack.
    pub(super) fn focusidx(&mut self, id: ContainerId, step: i32) {
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "focusidx for unknown container - ignoring");
            return;
        };
        let len = c.toplevels.len();
        if len < 2 {
            return;
        }
        let idx = (step as i64).rem_euclid(len as i64) as usize;
        c.toplevels.rotate_left(idx);
        self.apply_front(id);

        let holds_focus = self
            .focused_toplevel
            .and_then(|t| self.toplevel_manager.get(t))
            .is_some_and(|t| t.container == Some(id));
        if holds_focus {
            if let Some(front) = self.container_manager.get(id).and_then(Container::front) {
                self.focus_toplevel(front);
            }
        }
    }

    /// Suspends every non-front toplevel and sizes the front to the container.
    fn apply_front(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let toplevels = c.toplevels.clone();
        let border = c.effective_border();
        let width = (c.width - border * 2).max(MIN_SURFACE_SIZE);
        let height = (c.height - border * 2).max(MIN_SURFACE_SIZE);
        let (output, workspace) = (c.output, c.workspace);

        for (i, toplevel) in toplevels.iter().enumerate() {
            let suspended = i != 0;
            let Some(t) = self.toplevel_manager.get_mut(*toplevel) else { continue };
            if t.suspended != suspended {
                t.suspended = suspended;
                self.send(Request::SetSuspended { toplevel: *toplevel, suspended });
            }
        }
        if let Some(front) = toplevels.first() {
            self.resize_toplevel(*front, width, height);
        }
        self.schedule_tag(output, workspace);
    }

    // Geometry.

    fn container_gaps(&self, c: &Container) -> i32 {
        if !c.configure_allowed() || self.container_floating(c) {
            return 0;
        }
        self.output_manager.get(c.output).map_or(0, |o| o.state.tag(c.workspace).useless_gaps)
    }

    fn should_save_floating_box(&self, c: &Container) -> bool {
        c.configure_allowed() && self.container_floating(c)
    }

    /// Sizes the container to an outer box of `width` x `height` (gaps
    /// included) and resizes its toplevels to match.
    pub(super) fn container_set_size(&mut self, id: ContainerId, width: i32, height: i32) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "set_size for unknown container - ignoring");
            return;
        };
        let gaps = self.container_gaps(c);
        let save = self.should_save_floating_box(c);
        let border = c.effective_border();
        let outside = c.outside_width(gaps);
        let surface_w = width.saturating_sub(outside).max(MIN_SURFACE_SIZE);
        let surface_h = height.saturating_sub(outside).max(MIN_SURFACE_SIZE);

        let Some(c) = self.container_manager.get_mut(id) else { return };
        c.width = surface_w.saturating_add(border.saturating_mul(2));
        c.height = surface_h.saturating_add(border.saturating_mul(2));
        if save {
            c.floating_box = c.floating_box.with_size(width, height);
        }
        let toplevels = c.toplevels.clone();
        for toplevel in toplevels {
            self.resize_toplevel(toplevel, surface_w, surface_h);
        }
    }

    /// Moves the container in global coordinates. A container whose centre
    /// lands on another output migrates there.
    pub(super) fn set_position_global(&mut self, id: ContainerId, x: i32, y: i32) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "set_position for unknown container - ignoring");
            return;
        };
        let save = self.should_save_floating_box(c);
        let Some(c) = self.container_manager.get_mut(id) else { return };
        c.x = x;
        c.y = y;
        if save {
            c.floating_box = c.floating_box.with_origin(x, y);
        }
        let (output, rect) = (c.output, c.rect());
        self.send(Request::SetPosition { container: id, x, y });

        if self.output_manager.is_fallback(output) {
            return;
        }
        let (cx, cy) = rect.center();
        if let Some(target) = self.output_manager.at(cx, cy) {
            if target != output {
                self.move_to_output(id, target, false);
            }
        }
    }

    /// Position relative to the container's output.
    pub(super) fn set_position(&mut self, id: ContainerId, x: i32, y: i32) {
        let Some(output) = self.container_manager.get(id).map(|c| c.output) else {
            debug!(?id, "set_position for unknown container - ignoring");
            return;
        };
        let origin = self.output_manager.get(output).map_or(Rect::default(), |o| o.layout_box);
        self.set_position_global(id, origin.x + x, origin.y + y);
    }

    pub(super) fn to_center(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        if !c.configure_allowed() {
            return;
        }
        let Some(area) = self.output_manager.get(c.output).map(|o| o.usable_area) else { return };
        let x = (area.x + (area.width - c.width) / 2).max(area.x);
        let y = (area.y + (area.height - c.height) / 2).max(area.y);
        self.set_position_global(id, x, y);
    }

    /// Places a tiled container into a strategy slot, leaving the workspace
    /// gaps around it.
    pub(super) fn place_tiled(&mut self, id: ContainerId, slot: Rect) {
        let Some(c) = self.container_manager.get(id) else { return };
        let gaps = self.container_gaps(c);
        self.set_position_global(id, slot.x.saturating_add(gaps), slot.y.saturating_add(gaps));
        self.container_set_size(id, slot.width, slot.height);
    }

    pub(super) fn restore_floating_box(&mut self, id: ContainerId) {
        let Some(fb) = self.container_manager.get(id).map(|c| c.floating_box) else { return };
        self.set_position_global(id, fb.x, fb.y);
        self.container_set_size(id, fb.width, fb.height);
    }

    fn apply_maximized_geometry(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let Some(area) = self.output_manager.get(c.output).map(|o| o.usable_area) else { return };
        self.set_position_global(id, area.x, area.y);
        self.container_set_size(id, area.width, area.height);
    }

    fn apply_fullscreen_geometry(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let Some(full) = self.output_manager.get(c.output).map(|o| o.layout_box) else { return };
        self.set_position_global(id, full.x, full.y);
        self.container_set_size(id, full.width, full.height);
    }

    pub(super) fn reapply_max_full(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        if c.is_fullscreen() {
            self.apply_fullscreen_geometry(id);
        } else if c.is_maximized() {
            self.apply_maximized_geometry(id);
        }
    }

    /// Keeps a migrated floating container at the same relative spot.
    pub(super) fn translate_floating(&mut self, id: ContainerId, from: Rect, to: OutputId) {
        let Some(c) = self.container_manager.get(id) else { return };
        if c.output != to || !c.configure_allowed() || !self.container_floating(c) {
            return;
        }
        let Some(target) = self.output_manager.get(to).map(|o| o.layout_box) else { return };
        let (nx, ny) = from.normalized_at(c.x, c.y);
        let x = target.x + (nx * target.width as f64).round() as i32;
        let y = target.y + (ny * target.height as f64).round() as i32;
        self.set_position_global(id, x, y);
    }

    pub(super) fn set_opacity(&mut self, id: ContainerId, opacity: f32) {
        let Some(c) = self.container_manager.get_mut(id) else {
            debug!(?id, "set_opacity for unknown container - ignoring");
            return;
        };
        let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        if c.opacity == opacity {
            return;
        }
        c.opacity = opacity;
        self.send(Request::SetOpacity { container: id, opacity });
        self.emit_client_prop(id, ClientProperty::Opacity);
    }

    pub(super) fn set_border_width(&mut self, id: ContainerId, width: i32) {
        let Some(output) = self.container_manager.get(id).map(|c| c.output) else {
            debug!(?id, "set_border_width for unknown container - ignoring");
            return;
        };
        let ceiling =
            self.output_manager.get(output).map_or(MAX_INSET, |o| o.usable_area.max_inset());
        let width = width.clamp(0, ceiling);
        let Some(c) = self.container_manager.get_mut(id) else { return };
        if c.border_width == width {
            return;
        }
        c.border_width = width;
        let (output, workspace) = (c.output, c.workspace);
        self.send_border(id);
        if self.container_manager.get(id).is_some_and(|c| self.should_save_floating_box(c)) {
            self.restore_floating_box(id);
        }
        self.schedule_tag(output, workspace);
        self.emit_client_prop(id, ClientProperty::BorderWidth);
    }

    pub(super) fn send_border(&self, id: ContainerId) {
        if let Some(c) = self.container_manager.get(id) {
            self.send(Request::SetBorder {
                container: id,
                width: c.border_width,
                enabled: c.border_enabled,
            });
        }
    }

    // Membership.

    /// Creates an empty container on `output` and links it into the output.
    pub(super) fn create_container(
        &mut self,
        output: OutputId,
        geometry: Rect,
        workspace: usize,
        tag: TagSet,
    ) -> ContainerId {
        let mut container = Container::new(output, geometry, workspace, tag);
        container.border_width = self.config.settings.border.width.clamp(0, MAX_INSET);
        let id = self.container_manager.insert(container);
        if let Some(out) = self.output_manager.get_mut(output) {
            out.state.containers.push(id);
            out.state.focus_stack.insert(0, id);
        }
        self.emit(Signal::ContainerNew { container: id });
        self.send_border(id);
        id
    }

    /// Adds `toplevel` at `index` of the container's stack; index 0 makes it
    /// the front.
    pub(super) fn insert_toplevel_at(&mut self, id: ContainerId, toplevel: ToplevelId, index: usize) {
        let Some(c) = self.container_manager.get_mut(id) else { return };
        let index = index.min(c.toplevels.len());
        c.toplevels.insert(index, toplevel);
        let output = c.output;
        if let Some(t) = self.toplevel_manager.get_mut(toplevel) {
            t.container = Some(id);
        }
        if let Some(out) = self.output_manager.get_mut(output) {
            if !out.state.toplevels.contains(&toplevel) {
                out.state.toplevels.push(toplevel);
            }
        }
        self.emit(Signal::ContainerInsert { container: id, toplevel });
        self.apply_front(id);
    }

    pub(super) fn insert_toplevel(&mut self, id: ContainerId, toplevel: ToplevelId) {
        self.insert_toplevel_at(id, toplevel, 0);
    }

    /// Detaches a toplevel from its container. An emptied container is
    /// destroyed unless `keep_empty` is set. Returns the container and the
    /// index the toplevel had.
    pub(super) fn remove_toplevel(
        &mut self,
        toplevel: ToplevelId,
        keep_empty: bool,
    ) -> Option<(ContainerId, usize)> {
        let id = self.toplevel_manager.get_mut(toplevel)?.container.take()?;
        let c = self.container_manager.get_mut(id)?;
        let index = c.toplevels.iter().position(|t| *t == toplevel)?;
        c.toplevels.remove(index);
        let (output, empty) = (c.output, c.toplevels.is_empty());
        if let Some(t) = self.toplevel_manager.get_mut(toplevel) {
            t.suspended = false;
        }
        if let Some(out) = self.output_manager.get_mut(output) {
            out.state.toplevels.retain(|t| *t != toplevel);
        }
        self.emit(Signal::ContainerRemove { container: id, toplevel });

        if empty {
            if !keep_empty {
                self.destroy_container(id);
            }
        } else if index == 0 {
            self.apply_front(id);
        }
        Some((id, index))
    }

    /// Frees an empty container and every reference to it, including a slot
    /// it still holds in the cached state of a disconnected output.
    pub(super) fn destroy_container(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        assert!(
            c.toplevels.is_empty(),
            "container {id:?} destroyed while still holding toplevels"
        );
        let (output, old_placement) = (c.output, c.old_placement);

        self.layout_remove(id, true);
        if let Some(placement) = old_placement {
            if let (Some(handle), Some(state)) =
                (placement.handle, self.output_manager.cache.owned_by_mut(placement.output))
            {
                state.tag_mut(placement.workspace).system_mut(handle.mode).remove(handle.node);
            }
        }
        self.detach_from_output(id);
        self.schedule_output(output);
        self.container_manager.remove(id);
        self.emit(Signal::ContainerDestroy { container: id });
    }

    pub(super) fn detach_from_output(&mut self, id: ContainerId) {
        let Some(c) = self.container_manager.get(id) else { return };
        let toplevels = c.toplevels.clone();
        let Some(out) = self.output_manager.get_mut(c.output) else { return };
        out.state.containers.retain(|x| *x != id);
        out.state.focus_stack.retain(|x| *x != id);
        out.state.minimized.retain(|x| *x != id);
        out.state.toplevels.retain(|t| !toplevels.contains(t));
    }

    pub(super) fn attach_to_output(&mut self, id: ContainerId, output: OutputId) {
        let Some(c) = self.container_manager.get_mut(id) else { return };
        c.output = output;
        let (minimized, toplevels) = (c.is_minimized(), c.toplevels.clone());
        let Some(out) = self.output_manager.get_mut(output) else { return };
        out.state.containers.push(id);
        out.state.focus_stack.push(id);
        if minimized {
            out.state.minimized.push(id);
        }
        for t in toplevels {
            if !out.state.toplevels.contains(&t) {
                out.state.toplevels.push(t);
            }
        }
    }

    /// Moves a container to the active workspace of `target`. With
    /// `translate` a floating container keeps its relative position.
    pub(super) fn move_to_output(&mut self, id: ContainerId, target: OutputId, translate: bool) {
        let Some(c) = self.container_manager.get(id) else {
            debug!(?id, "move_to_output for unknown container - ignoring");
            return;
        };
        let source = c.output;
        if source == target {
            return;
        }
        let Some(out) = self.output_manager.get(target) else {
            debug!(?target, "move_to_output to unknown output - ignoring");
            return;
        };
        let workspace = if out.state.active_workspace == 0 { 1 } else { out.state.active_workspace };
        let tag = if out.state.active_tag.is_empty() {
            TagSet::workspace(workspace)
        } else {
            out.state.active_tag
        };
        let from = self.output_manager.get(source).map_or(Rect::default(), |o| o.layout_box);

        self.layout_remove(id, true);
        self.detach_from_output(id);
        if let Some(c) = self.container_manager.get_mut(id) {
            c.workspace = workspace;
            c.tag = tag;
        }
        self.attach_to_output(id, target);

        let Some(c) = self.container_manager.get(id) else { return };
        let (remembered, configurable, floating) =
            (c.old_placement.is_some(), c.configure_allowed(), self.container_floating(c));
        if !remembered {
            self.layout_insert(id);
        }
        let fallback_involved =
            self.output_manager.is_fallback(source) || self.output_manager.is_fallback(target);
        if !configurable {
            self.defer(IdleTask::ReapplyMaxFull(id));
        } else if translate && floating && !fallback_involved {
            self.defer(IdleTask::TranslateFloating { container: id, from, to: target });
        }

        self.schedule_tag(target, workspace);
        self.schedule_output(source);
        self.schedule_output(target);
        self.emit_client_prop(id, ClientProperty::Output);
    }

    // Swapping.

    /// Exchanges two containers. Containers in the same workspace trade
    /// strategy slots and focus order; otherwise they trade placement.
    /// Toplevel stacks stay with their container.
    pub(super) fn swap_containers(&mut self, a: ContainerId, b: ContainerId) {
        if a == b {
            return;
        }
        let (Some(ca), Some(cb)) = (self.container_manager.get(a), self.container_manager.get(b))
        else {
            debug!(?a, ?b, "swap for unknown container - ignoring");
            return;
        };
        let (oa, wa, ta, ha, fa) = (ca.output, ca.workspace, ca.tag, ca.layout_handle, ca.floating_box);
        let (ob, wb, tb, hb, fb) = (cb.output, cb.workspace, cb.tag, cb.layout_handle, cb.floating_box);
        let active_a = ca.configure_allowed() && !ca.is_minimized();
        let active_b = cb.configure_allowed() && !cb.is_minimized();

        if oa == ob && wa == wb {
            if let (Some(x), Some(y)) = (ha, hb) {
                if x.mode == y.mode {
                    if let Some(out) = self.output_manager.get_mut(oa) {
                        out.state.tag_mut(wa).system_mut(x.mode).swap(x.node, y.node);
                    }
                    if let Some(c) = self.container_manager.get_mut(a) {
                        c.layout_handle = Some(y);
                    }
                    if let Some(c) = self.container_manager.get_mut(b) {
                        c.layout_handle = Some(x);
                    }
                }
            }
            if let Some(out) = self.output_manager.get_mut(oa) {
                let stack = &mut out.state.focus_stack;
                if let (Some(i), Some(j)) =
                    (stack.iter().position(|c| *c == a), stack.iter().position(|c| *c == b))
                {
                    stack.swap(i, j);
                }
            }
        } else {
            self.detach_from_output(a);
            self.detach_from_output(b);
            if let Some(c) = self.container_manager.get_mut(a) {
                c.workspace = wb;
                c.tag = tb;
                c.layout_handle = hb;
            }
            if let Some(c) = self.container_manager.get_mut(b) {
                c.workspace = wa;
                c.tag = ta;
                c.layout_handle = ha;
            }
            self.attach_to_output(a, ob);
            self.attach_to_output(b, oa);
            if let Some(h) = ha {
                if let Some(out) = self.output_manager.get_mut(oa) {
                    out.state.tag_mut(wa).system_mut(h.mode).replace(h.node, b, active_b);
                }
            }
            if let Some(h) = hb {
                if let Some(out) = self.output_manager.get_mut(ob) {
                    out.state.tag_mut(wb).system_mut(h.mode).replace(h.node, a, active_a);
                }
            }
            self.layout_insert(a);
            self.layout_insert(b);
            self.schedule_output(oa);
            self.schedule_output(ob);
        }

        if let Some(c) = self.container_manager.get_mut(a) {
            c.floating_box = fb;
        }
        if let Some(c) = self.container_manager.get_mut(b) {
            c.floating_box = fa;
        }
        self.schedule_tag(oa, wa);
        self.schedule_tag(ob, wb);
        self.emit(Signal::ContainerSwap { a, b });
    }

    /// Exchanges two toplevels, across containers when they differ. Neither
    /// container is destroyed while it is momentarily empty.
    pub(super) fn swap_toplevels(&mut self, a: ToplevelId, b: ToplevelId) {
        if a == b {
            return;
        }
        let ca = self.toplevel_manager.get(a).and_then(|t| t.container);
        let cb = self.toplevel_manager.get(b).and_then(|t| t.container);
        let (Some(ca), Some(cb)) = (ca, cb) else {
            debug!(?a, ?b, "swap for uncontained toplevel - ignoring");
            return;
        };

        if ca == cb {
            let Some(c) = self.container_manager.get_mut(ca) else { return };
            if let (Some(i), Some(j)) = (
                c.toplevels.iter().position(|t| *t == a),
                c.toplevels.iter().position(|t| *t == b),
            ) {
                c.toplevels.swap(i, j);
            }
            self.apply_front(ca);
        } else {
            let Some((_, ia)) = self.remove_toplevel(a, true) else { return };
            let Some((_, ib)) = self.remove_toplevel(b, true) else { return };
            self.insert_toplevel_at(cb, a, ib);
            self.insert_toplevel_at(ca, b, ia);
        }

        if let Some(focused) = self.focused_toplevel {
            if focused == a || focused == b {
                self.focus_toplevel(focused);
            }
        }
        self.emit(Signal::ClientSwap { a, b });
    }

    pub(super) fn mark_insert(&mut self, id: Option<ContainerId>) {
        match id {
            Some(id) if self.container_manager.get(id).is_none() => {
                debug!(?id, "mark_insert for unknown container - ignoring");
            }
            _ => self.container_manager.insert_marked = id,
        }
    }
}
