use tracing::{debug, trace};

use crate::actor::broadcast::{ClientProperty, Signal};
use crate::actor::reactor::{MIN_SURFACE_SIZE, Reactor};
use crate::model::container::{ContainerId, ContainerState};
use crate::model::tag::{LayoutMode, TagSet};
use crate::model::toplevel::{ConfigureSerial, DecorationMode, Toplevel, ToplevelId, ToplevelInfo};
use crate::sys::geometry::Rect;

pub struct ToplevelEventHandler;

impl ToplevelEventHandler {
    pub fn handle_new_toplevel(reactor: &mut Reactor, info: ToplevelInfo) -> ToplevelId {
        let decoration = reactor.config.settings.decoration.default_mode;
        let id = reactor.toplevel_manager.insert(Toplevel::new(info, decoration));
        trace!(?id, "new toplevel");
        id
    }

    pub fn handle_map(reactor: &mut Reactor, id: ToplevelId) {
        let Some(toplevel) = reactor.toplevel_manager.get_mut(id) else {
            debug!(?id, "Received Map for unknown toplevel - ignoring");
            return;
        };
        if toplevel.mapped {
            return;
        }
        toplevel.mapped = true;
        let unmanaged = toplevel.is_unmanaged();
        let floats = toplevel.should_float();
        let geometry = toplevel.geometry;
        let urgent = std::mem::replace(&mut toplevel.pending_activation, false);
        if urgent {
            toplevel.urgent = true;
        }

        let marked = reactor
            .container_manager
            .insert_marked
            .filter(|c| reactor.container_manager.get(*c).is_some());
        let container = match marked {
            Some(container) if !unmanaged => {
                reactor.insert_toplevel(container, id);
                container
            }
            _ => {
                let container = Self::new_container_for(reactor, geometry, unmanaged);
                if let Some(c) = reactor.container_manager.get_mut(container) {
                    if unmanaged {
                        c.state.insert(ContainerState::UNMANAGED);
                    } else if floats {
                        c.state.insert(ContainerState::FLOATING);
                    }
                }
                reactor.insert_toplevel(container, id);
                container
            }
        };

        let Some(c) = reactor.container_manager.get(container) else { return };
        let (output, workspace) = (c.output, c.workspace);
        let floating_workspace = reactor
            .output_manager
            .get(output)
            .is_none_or(|o| o.state.tag(workspace).layout_mode == LayoutMode::Floating);
        reactor.send_decoration(id, floating_workspace);

        if urgent {
            reactor.emit(Signal::ClientProp { toplevel: id, property: ClientProperty::Urgent });
        }
        reactor.emit(Signal::ClientMap { toplevel: id });

        reactor.layout_insert(container);
        reactor.schedule_tag(output, workspace);
        reactor.schedule_output(output);
        if !unmanaged && reactor.toplevel_visible(id) {
            reactor.focus_toplevel(id);
        }
    }

    /// A fresh container on the focused output's active workspace, sized to
    /// hold the toplevel's committed geometry. Toplevels without a position
    /// are centred in the usable area.
    fn new_container_for(reactor: &mut Reactor, geometry: Rect, unmanaged: bool) -> ContainerId {
        let output = reactor.output_manager.focused;
        let border = if unmanaged { 0 } else { reactor.config.settings.border.width.max(0) };
        let (area, workspace, active_tag) = reactor
            .output_manager
            .get(output)
            .map(|o| (o.usable_area, o.state.active_workspace, o.state.active_tag))
            .unwrap_or_default();
        let workspace = if workspace == 0 { 1 } else { workspace };
        let tag = if active_tag.is_empty() { TagSet::workspace(workspace) } else { active_tag };

        let width = geometry.width.max(MIN_SURFACE_SIZE) + border * 2;
        let height = geometry.height.max(MIN_SURFACE_SIZE) + border * 2;
        let (x, y) = if geometry.x == 0 && geometry.y == 0 {
            (area.x + (area.width - width) / 2, area.y + (area.height - height) / 2)
        } else {
            (geometry.x, geometry.y)
        };

        let container =
            reactor.create_container(output, Rect::new(x, y, width, height), workspace, tag);
        if unmanaged {
            if let Some(c) = reactor.container_manager.get_mut(container) {
                c.border_width = 0;
            }
            reactor.send_border(container);
        }
        container
    }

    pub fn handle_unmap(reactor: &mut Reactor, id: ToplevelId) {
        let Some(toplevel) = reactor.toplevel_manager.get(id) else {
            debug!(?id, "Received Unmap for unknown toplevel - ignoring");
            return;
        };
        if !toplevel.mapped {
            return;
        }
        let output = toplevel
            .container
            .and_then(|c| reactor.container_manager.get(c))
            .map(|c| c.output);

        reactor.abandon_resize(id);
        if let Some(t) = reactor.toplevel_manager.get_mut(id) {
            t.mapped = false;
        }
        reactor.emit(Signal::ClientUnmap { toplevel: id });
        reactor.remove_toplevel(id, false);

        if reactor.focused_toplevel == Some(id) {
            reactor.focused_toplevel = None;
            if let Some(output) = output {
                reactor.focus_newest_visible(output);
            }
        }
    }

    pub fn handle_destroy(reactor: &mut Reactor, id: ToplevelId) {
        if reactor.toplevel_manager.get(id).is_none() {
            debug!(?id, "Received Destroy for unknown toplevel - ignoring");
            return;
        }
        Self::handle_unmap(reactor, id);
        reactor.abandon_resize(id);
        if reactor.focused_toplevel == Some(id) {
            reactor.focused_toplevel = None;
        }
        reactor.toplevel_manager.remove(id);
        reactor.emit(Signal::ClientDestroy { toplevel: id });
    }

    pub fn handle_commit(
        reactor: &mut Reactor,
        id: ToplevelId,
        serial: ConfigureSerial,
        geometry: Rect,
    ) {
        let Some(toplevel) = reactor.toplevel_manager.get_mut(id) else {
            debug!(?id, "Received Commit for unknown toplevel - ignoring");
            return;
        };
        toplevel.geometry = geometry;
        if serial >= toplevel.last_serial() {
            toplevel.pending_size = None;
        }
        let acked = toplevel.resize_serial.is_some_and(|pending| pending <= serial);
        if acked {
            toplevel.resize_serial = None;
            trace!(?id, ?serial, "resize acknowledged");
            if reactor.transaction_manager.finish_resize() {
                reactor.repaint_waiting_outputs();
            }
        }

        Self::follow_floating_commit(reactor, id, geometry);
    }

    /// A floating front toplevel that settled on a size of its own drags its
    /// container along.
    fn follow_floating_commit(reactor: &mut Reactor, id: ToplevelId, geometry: Rect) {
        let Some(toplevel) = reactor.toplevel_manager.get(id) else { return };
        if !toplevel.mapped || toplevel.pending_size.is_some() {
            return;
        }
        let Some(container) = toplevel.container else { return };
        let Some(c) = reactor.container_manager.get(container) else { return };
        if c.front() != Some(id) || !c.configure_allowed() || !reactor.container_floating(c) {
            return;
        }
        let border = c.effective_border();
        let (width, height) = (geometry.width + border * 2, geometry.height + border * 2);
        if (c.width, c.height) == (width, height) {
            return;
        }
        let output = c.output;
        if let Some(c) = reactor.container_manager.get_mut(container) {
            c.width = width;
            c.height = height;
            c.floating_box = c.floating_box.with_size(width, height);
        }
        reactor.schedule_output(output);
    }

    pub fn handle_request_activate(reactor: &mut Reactor, id: ToplevelId) {
        let Some(toplevel) = reactor.toplevel_manager.get_mut(id) else {
            debug!(?id, "Received RequestActivate for unknown toplevel - ignoring");
            return;
        };
        if !toplevel.mapped {
            toplevel.pending_activation = true;
            return;
        }
        let container = toplevel.container;
        let on_focused_output = container
            .and_then(|c| reactor.container_manager.get(c))
            .is_some_and(|c| c.output == reactor.output_manager.focused);
        if on_focused_output && reactor.toplevel_visible(id) {
            reactor.focus_toplevel(id);
            return;
        }
        if let Some(t) = reactor.toplevel_manager.get_mut(id) {
            if t.urgent {
                return;
            }
            t.urgent = true;
        }
        reactor.emit(Signal::ClientProp { toplevel: id, property: ClientProperty::Urgent });
    }

    pub fn handle_request_decoration(reactor: &mut Reactor, id: ToplevelId, mode: DecorationMode) {
        let Some(toplevel) = reactor.toplevel_manager.get_mut(id) else {
            debug!(?id, "Received RequestDecoration for unknown toplevel - ignoring");
            return;
        };
        toplevel.requested_decoration = Some(mode);
        let container = toplevel.container;
        let floating_workspace = container
            .and_then(|c| reactor.container_manager.get(c))
            .and_then(|c| reactor.output_manager.get(c.output).map(|o| (o, c.workspace)))
            .is_none_or(|(o, workspace)| o.state.tag(workspace).layout_mode == LayoutMode::Floating);
        reactor.send_decoration(id, floating_workspace);
        reactor.emit(Signal::ClientProp { toplevel: id, property: ClientProperty::Decoration });
    }
}
