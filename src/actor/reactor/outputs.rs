use tracing::{debug, info};

use super::{IdleTask, Reactor};
use crate::actor::broadcast::{ScreenProperty, Signal};
use crate::layout_engine::Direction;
use crate::model::container::{ContainerId, OldPlacement};
use crate::model::output::{FALLBACK_OUTPUT_GEOMETRY, Output, OutputId, OutputInfo, OutputState};
use crate::model::tag::{LayoutMode, MAX_WORKSPACE};
use crate::sys::geometry::Rect;

impl Reactor {
    /// Adds a display, adopting the workspace state it had before it was
    /// disconnected when one is cached under its name.
    pub(super) fn create_output(&mut self, info: OutputInfo) -> OutputId {
        let name = info.name.clone();
        let (id, previous_owner) = match self.output_manager.cache.take(&name) {
            Some(mut state) => {
                let previous_owner = state.old_output.take();
                for tag in state.tags_mut() {
                    tag.pending_transaction = false;
                }
                let id = self.output_manager.outputs.insert(Output::new(info, state, true));
                (id, previous_owner)
            }
            None => {
                let state = OutputState::new(&self.config.settings);
                (self.output_manager.outputs.insert(Output::new(info, state, false)), None)
            }
        };
        self.output_manager.order.push(id);

        if let Some(previous_owner) = previous_owner {
            self.restore_containers(previous_owner, id);
        }
        let fallback = self.output_manager.fallback;
        self.rescue_containers(fallback, id);

        info!(name = %name, restored = previous_owner.is_some(), "created output");
        self.update_outputs_state();
        if let Some(workspace) = self.output_manager.get(id).map(|o| o.state.active_workspace) {
            if workspace != 0 {
                self.schedule_tag(id, workspace);
            }
        }
        self.emit(Signal::ScreenNew { output: id });
        if self.output_manager.order.len() == 1 {
            self.focus_output(id);
        }
        id
    }

    /// Hands containers that were rescued off `previous_owner` back to the
    /// output that took over its state, with their old slot and workspace.
    fn restore_containers(&mut self, previous_owner: OutputId, output: OutputId) {
        let returning: Vec<(ContainerId, OldPlacement)> = self
            .container_manager
            .order
            .iter()
            .filter_map(|id| {
                let placement = self.container_manager.get(*id)?.old_placement?;
                (placement.output == previous_owner).then_some((*id, placement))
            })
            .collect();

        for (id, placement) in returning {
            let Some(source) = self.container_manager.get(id).map(|c| c.output) else { continue };
            self.layout_remove(id, true);
            self.detach_from_output(id);
            if let Some(c) = self.container_manager.get_mut(id) {
                c.layout_handle = placement.handle;
                c.workspace = placement.workspace;
                c.tag = placement.tag;
                c.old_placement = None;
            }
            self.attach_to_output(id, output);
            if self.container_manager.get(id).is_some_and(|c| !c.configure_allowed()) {
                self.defer(IdleTask::ReapplyMaxFull(id));
            }
            self.schedule_output(source);
            debug!(?id, workspace = placement.workspace, "restored container");
        }
    }

    /// Moves every container of `source` to `target`. Containers leaving a
    /// real output remember where they were so they can return to it.
    pub(super) fn rescue_containers(&mut self, source: OutputId, target: OutputId) {
        if source == target {
            return;
        }
        let Some(containers) = self.output_manager.get(source).map(|o| o.state.containers.clone())
        else {
            return;
        };
        let from_fallback = self.output_manager.is_fallback(source);

        for id in containers {
            let Some(c) = self.container_manager.get_mut(id) else { continue };
            if c.old_placement.is_none() && !from_fallback {
                c.old_placement = Some(OldPlacement {
                    output: source,
                    handle: c.layout_handle.take(),
                    workspace: c.workspace,
                    tag: c.tag,
                });
            }
            let old_workspace = c.old_placement.map(|p| p.workspace);

            self.move_to_output(id, target, true);
            if let Some(workspace) = old_workspace {
                self.move_to_tag(id, workspace);
                self.layout_insert(id);
            }
        }
    }

    /// Drops a display: its state is cached under its name and its containers
    /// move to the next available output.
    pub(super) fn destroy_output(&mut self, id: OutputId) {
        if self.output_manager.is_fallback(id) {
            debug!("Destroy for the fallback output - ignoring");
            return;
        }
        let Some(name) = self.output_manager.get(id).map(|o| o.name.clone()) else {
            debug!(?id, "Destroy for unknown output - ignoring");
            return;
        };
        info!(name = %name, "destroying output");
        self.emit(Signal::ScreenDestroy { output: id });

        let target = self.other_available_output(id);
        self.focus_output(target);
        self.rescue_containers(id, target);

        if !self.output_manager.is_fallback(target) {
            for workspace in 1..MAX_WORKSPACE {
                let bsp = self
                    .output_manager
                    .get(target)
                    .is_some_and(|o| o.state.tag(workspace).layout_mode == LayoutMode::Bsp);
                if bsp {
                    self.insert_tiled_into_bsp(target, workspace);
                }
            }
        }
        self.schedule_output(target);

        self.output_manager.order.retain(|o| *o != id);
        self.transaction_manager.forget_output(id);
        if let Some(mut output) = self.output_manager.outputs.remove(id) {
            output.state.old_output = Some(id);
            output.state.containers.clear();
            output.state.focus_stack.clear();
            output.state.minimized.clear();
            output.state.toplevels.clear();
            self.output_manager.cache.insert(&name, output.state);
        }
        if self.output_manager.focused == id {
            self.output_manager.focused = self.output_manager.fallback;
        }
        self.update_outputs_state();
    }

    /// The closest enabled output before `reference` in layout order,
    /// wrapping around, or the fallback when there is none.
    pub(super) fn other_available_output(&self, reference: OutputId) -> OutputId {
        let order = &self.output_manager.order;
        let enabled = |id: &OutputId| {
            *id != reference && self.output_manager.get(*id).is_some_and(|o| o.enabled)
        };
        let index = order.iter().position(|o| *o == reference).unwrap_or(order.len());
        order[..index]
            .iter()
            .rev()
            .chain(order[index..].iter().rev())
            .copied()
            .find(enabled)
            .unwrap_or(self.output_manager.fallback)
    }

    /// Re-derives everything that depends on the arrangement of outputs.
    pub(super) fn update_outputs_state(&mut self) {
        let fallback = self.output_manager.fallback;
        if let Some(out) = self.output_manager.get_mut(fallback) {
            out.layout_box = FALLBACK_OUTPUT_GEOMETRY;
            out.usable_area = FALLBACK_OUTPUT_GEOMETRY;
        }
        self.defer(IdleTask::SortOutputs);
        self.defer(IdleTask::ClampFloating);

        for id in self.output_manager.order.clone() {
            let Some(workspace) = self.output_manager.get(id).map(|o| o.state.active_workspace)
            else {
                continue;
            };
            if workspace != 0 {
                self.schedule_tag(id, workspace);
            }
            self.schedule_output(id);
        }
    }

    /// Orders outputs top-left to bottom-right. Each output is placed before
    /// the first already placed one that is neither above nor left of it.
    pub(super) fn sort_outputs(&mut self) {
        let mut sorted: Vec<(OutputId, Rect)> = Vec::with_capacity(self.output_manager.order.len());
        for id in &self.output_manager.order {
            let Some(b) = self.output_manager.get(*id).map(|o| o.layout_box) else { continue };
            match sorted.iter().position(|(_, s)| b.y <= s.y && b.x <= s.x) {
                Some(at) => sorted.insert(at, (*id, b)),
                None => sorted.push((*id, b)),
            }
        }
        self.output_manager.order = sorted.into_iter().map(|(id, _)| id).collect();
    }

    /// Folds floating containers that ended up outside their output back in,
    /// keeping their relative offset modulo the output size.
    pub(super) fn clamp_floating(&mut self) {
        let floating: Vec<ContainerId> = self
            .container_manager
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.container_manager
                    .get(*id)
                    .is_some_and(|c| c.configure_allowed() && self.container_floating(c))
            })
            .collect();

        for id in floating {
            let Some(c) = self.container_manager.get(id) else { continue };
            let Some(area) = self.output_manager.get(c.output).map(|o| o.layout_box) else {
                continue;
            };
            if area.contains_point(c.x, c.y) {
                continue;
            }
            let (nx, ny) = area.normalized_at(c.x, c.y);
            let x = (nx.abs().fract() * area.width as f64) as i32;
            let y = (ny.abs().fract() * area.height as f64) as i32;
            debug!(?id, x, y, "clamping floating container into its output");
            self.set_position(id, x, y);
        }
    }

    pub(super) fn focus_output(&mut self, id: OutputId) {
        let Some(out) = self.output_manager.get(id) else {
            debug!(?id, "Focus for unknown output - ignoring");
            return;
        };
        if self.output_manager.focused == id || !out.enabled {
            return;
        }
        if self.output_manager.is_fallback(id) {
            self.output_manager.focused = id;
            return;
        }

        let previous = std::mem::replace(&mut self.output_manager.focused, id);
        self.focus_newest_visible(id);
        self.emit(Signal::ScreenFocus { output: id });
        if !self.output_manager.is_fallback(previous) && self.output_manager.get(previous).is_some() {
            self.emit(Signal::ScreenUnfocus { output: previous });
        }
    }

    /// Follows keyboard focus onto another output without touching which
    /// toplevel is focused.
    pub(super) fn set_focused_output_silently(&mut self, id: OutputId) {
        if self.output_manager.get(id).is_some() {
            self.output_manager.focused = id;
        }
    }

    /// Closest output whose origin lies in `direction` from the reference.
    pub fn nearest_output_by_direction(
        &self,
        reference: OutputId,
        direction: Direction,
    ) -> Option<OutputId> {
        let origin = self.output_manager.get(reference)?.layout_box;
        self.output_manager
            .order
            .iter()
            .copied()
            .filter(|id| *id != reference)
            .filter_map(|id| Some((id, self.output_manager.get(id)?.layout_box)))
            .filter(|(_, b)| {
                let (dx, dy) = (b.x - origin.x, b.y - origin.y);
                (dx != 0 || dy != 0) && direction.matches_offset(dx, dy)
            })
            .min_by(|(_, a), (_, b)| origin.distance_to(a).total_cmp(&origin.distance_to(b)))
            .map(|(id, _)| id)
    }

    pub(super) fn focus_direction(&mut self, direction: Direction) {
        let focused = self.output_manager.focused;
        match self.nearest_output_by_direction(focused, direction) {
            Some(target) => self.focus_output(target),
            None => debug!(?direction, "no output in that direction"),
        }
    }

    pub(super) fn set_layout_box(&mut self, id: OutputId, layout_box: Rect) {
        let Some(out) = self.output_manager.get_mut(id) else {
            debug!(?id, "Layout change for unknown output - ignoring");
            return;
        };
        if out.layout_box == layout_box {
            return;
        }
        let old = std::mem::replace(&mut out.layout_box, layout_box);
        out.usable_area = if out.usable_area == old {
            layout_box
        } else {
            out.usable_area.with_origin(
                out.usable_area.x + layout_box.x - old.x,
                out.usable_area.y + layout_box.y - old.y,
            )
        };
    }

    pub(super) fn set_usable_area(&mut self, id: OutputId, area: Rect) {
        let Some(out) = self.output_manager.get_mut(id) else {
            debug!(?id, "Usable area for unknown output - ignoring");
            return;
        };
        if out.usable_area == area {
            return;
        }
        out.usable_area = area;
        let workspace = out.state.active_workspace;
        if workspace != 0 {
            self.schedule_tag(id, workspace);
        }
        self.schedule_output(id);
        self.emit(Signal::ScreenProp { output: id, property: ScreenProperty::UsableArea });
    }

    pub(super) fn set_output_enabled(&mut self, id: OutputId, enabled: bool) {
        if self.output_manager.is_fallback(id) {
            return;
        }
        let Some(out) = self.output_manager.get_mut(id) else {
            debug!(?id, "set_enabled for unknown output - ignoring");
            return;
        };
        if out.enabled == enabled {
            return;
        }
        out.enabled = enabled;
        if !enabled && self.output_manager.focused == id {
            let target = self.other_available_output(id);
            self.focus_output(target);
        }
        self.update_outputs_state();
        self.emit(Signal::ScreenProp { output: id, property: ScreenProperty::Enabled });
    }

    /// Forgets the cached state of a disconnected output. Containers that
    /// were waiting to return to it stay where they are.
    pub(super) fn evict_output_state(&mut self, name: &str) {
        let Some(state) = self.output_manager.cache.take(name) else {
            debug!(name, "Evict for uncached output - ignoring");
            return;
        };
        let Some(owner) = state.old_output else { return };
        let stranded: Vec<ContainerId> = self
            .container_manager
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.container_manager
                    .get(*id)
                    .and_then(|c| c.old_placement)
                    .is_some_and(|p| p.output == owner)
            })
            .collect();
        for id in stranded {
            if let Some(c) = self.container_manager.get_mut(id) {
                c.old_placement = None;
            }
            self.layout_insert(id);
        }
        info!(name, "evicted cached output state");
    }
}
