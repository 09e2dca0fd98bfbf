//! The reactor is the single owner of layout state.
//!
//! It takes events from the protocol and render layers, keeps toplevels,
//! containers and outputs coherent, asks the layout strategies for geometry
//! and sends requests back out. Work that must not run reentrantly is queued
//! as idle tasks and drained by [`Reactor::tick`], which also runs the
//! coalescing pass over every scheduled workspace and output.

mod containers;
mod error;
mod events;
mod managers;
mod outputs;
mod tags;
mod transaction_manager;

#[cfg(test)]
mod testing;

use std::time::Instant;

pub use containers::MIN_SURFACE_SIZE;
pub use error::ReactorError;
use events::command::CommandEventHandler;
use events::output::OutputEventHandler;
use events::toplevel::ToplevelEventHandler;
pub use managers::{ContainerManager, OutputManager, ToplevelManager};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
pub use transaction_manager::TransactionManager;

use crate::actor::broadcast::{BroadcastSender, ClientProperty, Signal};
use crate::actor;
use crate::common::collections::VecDeque;
use crate::common::config::Config;
use crate::common::log::trace_misc;
use crate::layout_engine::{Direction, LayoutInputs, LayoutSystem, LayoutSystemKind};
use crate::model::container::{Container, ContainerId, ContainerState};
use crate::model::output::{
    FALLBACK_OUTPUT_GEOMETRY, FALLBACK_OUTPUT_NAME, Output, OutputId, OutputInfo, OutputState,
};
use crate::model::tag::LayoutMode;
use crate::model::toplevel::{ConfigureSerial, DecorationMode, Toplevel, ToplevelId, ToplevelInfo};
use crate::sys::geometry::Rect;

pub type RequestSender = actor::Sender<Request>;
pub type RequestReceiver = actor::Receiver<Request>;

#[derive(Debug, Clone)]
pub enum Event {
    Map(ToplevelId),
    Unmap(ToplevelId),
    /// A surface commit. `serial` is the newest configure the client has
    /// acknowledged and `geometry` its committed window geometry.
    Commit {
        toplevel: ToplevelId,
        serial: ConfigureSerial,
        geometry: Rect,
    },
    Destroy(ToplevelId),
    RequestActivate(ToplevelId),
    RequestDecoration(ToplevelId, DecorationMode),
    OutputDestroyed(OutputId),
    /// New layout boxes of outputs that moved or changed mode.
    OutputLayoutChanged(Vec<(OutputId, Rect)>),
    UsableAreaChanged(OutputId, Rect),
    Frame {
        output: OutputId,
        needs_frame: bool,
    },
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Container(ContainerCommand),
    Toplevel(ToplevelCommand),
    Output(OutputCommand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerCommand {
    SetFloating(ContainerId, bool),
    SetMaximized(ContainerId, bool),
    SetFullscreen(ContainerId, bool),
    SetMinimized(ContainerId, bool),
    SetSticky(ContainerId, bool),
    FocusIdx(ContainerId, i32),
    SetSize {
        container: ContainerId,
        width: i32,
        height: i32,
    },
    /// Position relative to the container's output.
    SetPosition {
        container: ContainerId,
        x: i32,
        y: i32,
    },
    SetPositionGlobal {
        container: ContainerId,
        x: i32,
        y: i32,
    },
    ToCenter(ContainerId),
    SetOpacity(ContainerId, f32),
    SetBorderWidth(ContainerId, i32),
    MoveToTag(ContainerId, usize),
    /// Raw tag bitfield; zero is ignored.
    SetTag(ContainerId, u32),
    MoveToOutput(ContainerId, OutputId),
    Swap(ContainerId, ContainerId),
    MarkInsert(Option<ContainerId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToplevelCommand {
    Focus(ToplevelId),
    SetFront(ToplevelId),
    JumpTo { toplevel: ToplevelId, merge: bool },
    Swap(ToplevelId, ToplevelId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCommand {
    Focus(OutputId),
    FocusDirection(Direction),
    SetActiveTag(OutputId, u32),
    SetViewOnly(OutputId, usize),
    ToggleTag(OutputId, usize),
    /// Workspace 0 addresses the active workspace.
    SetLayoutMode {
        output: OutputId,
        workspace: usize,
        mode: LayoutMode,
    },
    SetStrategyIdx(OutputId, i32),
    SetUselessGaps {
        output: OutputId,
        workspace: usize,
        gaps: i32,
    },
    SetMwfact(OutputId, f64),
    SetMasterCount(OutputId, u32),
    SetColumnCount(OutputId, u32),
    SetEnabled(OutputId, bool),
    SetMaxGeneralWorkspace(OutputId, usize),
    EvictState(String),
}

/// Requests to the protocol and render layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "request")]
pub enum Request {
    /// Configure the client to a new surface size. The serial comes back in
    /// the acknowledging commit.
    Resize {
        toplevel: ToplevelId,
        width: i32,
        height: i32,
        serial: ConfigureSerial,
    },
    SetActivated {
        toplevel: ToplevelId,
        activated: bool,
    },
    SetVisible {
        container: ContainerId,
        visible: bool,
    },
    /// Hide or show a toplevel that is not the front of its container.
    SetSuspended {
        toplevel: ToplevelId,
        suspended: bool,
    },
    SetPosition {
        container: ContainerId,
        x: i32,
        y: i32,
    },
    SetBorder {
        container: ContainerId,
        width: i32,
        enabled: bool,
    },
    /// `Some` adds an opaque backdrop of that size behind the container.
    SetBackdrop {
        container: ContainerId,
        backdrop: Option<Rect>,
    },
    SetOpacity {
        container: ContainerId,
        opacity: f32,
    },
    SetDecorationMode {
        toplevel: ToplevelId,
        mode: DecorationMode,
    },
    ScheduleRepaint {
        output: OutputId,
    },
    /// The pending frame of `output` may be committed.
    Present {
        output: OutputId,
    },
    ClearFocus,
    Focus {
        toplevel: ToplevelId,
    },
}

/// Deferred work, run by [`Reactor::tick`] ahead of the coalescing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
enum IdleTask {
    ReapplyMaxFull(ContainerId),
    TranslateFloating {
        container: ContainerId,
        from: Rect,
        to: OutputId,
    },
    SortOutputs,
    ClampFloating,
}

pub struct Reactor {
    config: Config,
    toplevel_manager: ToplevelManager,
    container_manager: ContainerManager,
    output_manager: OutputManager,
    transaction_manager: TransactionManager,
    idle: VecDeque<IdleTask>,
    focused_toplevel: Option<ToplevelId>,
    requests: RequestSender,
    broadcast: BroadcastSender,
}

impl Reactor {
    pub fn new(config: Config, requests: RequestSender, broadcast: BroadcastSender) -> Reactor {
        let fallback = Output::new(
            OutputInfo {
                name: FALLBACK_OUTPUT_NAME.to_string(),
                layout_box: FALLBACK_OUTPUT_GEOMETRY,
                usable_area: None,
                enabled: true,
            },
            OutputState::new(&config.settings),
            false,
        );
        Reactor {
            transaction_manager: TransactionManager::new(config.settings.transaction.timeout),
            config,
            toplevel_manager: ToplevelManager::default(),
            container_manager: ContainerManager::default(),
            output_manager: OutputManager::new(fallback),
            idle: VecDeque::new(),
            focused_toplevel: None,
            requests,
            broadcast,
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    /// Registers a toplevel announced by the protocol layer. It stays
    /// unmanaged until it is mapped.
    pub fn new_toplevel(&mut self, info: ToplevelInfo) -> ToplevelId {
        ToplevelEventHandler::handle_new_toplevel(self, info)
    }

    pub fn new_output(&mut self, info: OutputInfo) -> OutputId {
        OutputEventHandler::handle_new_output(self, info)
    }

    fn log_event(&self, event: &Event) {
        match event {
            Event::Commit { .. } | Event::Frame { .. } => trace!(?event, "Event"),
            _ => debug!(?event, "Event"),
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event=?event))]
    pub fn handle_event(&mut self, event: Event) {
        self.log_event(&event);
        match event {
            Event::Map(toplevel) => ToplevelEventHandler::handle_map(self, toplevel),
            Event::Unmap(toplevel) => ToplevelEventHandler::handle_unmap(self, toplevel),
            Event::Commit { toplevel, serial, geometry } => {
                ToplevelEventHandler::handle_commit(self, toplevel, serial, geometry)
            }
            Event::Destroy(toplevel) => ToplevelEventHandler::handle_destroy(self, toplevel),
            Event::RequestActivate(toplevel) => {
                ToplevelEventHandler::handle_request_activate(self, toplevel)
            }
            Event::RequestDecoration(toplevel, mode) => {
                ToplevelEventHandler::handle_request_decoration(self, toplevel, mode)
            }
            Event::OutputDestroyed(output) => {
                OutputEventHandler::handle_output_destroyed(self, output)
            }
            Event::OutputLayoutChanged(boxes) => {
                OutputEventHandler::handle_output_layout_changed(self, boxes)
            }
            Event::UsableAreaChanged(output, area) => {
                OutputEventHandler::handle_usable_area_changed(self, output, area)
            }
            Event::Frame { output, needs_frame } => {
                OutputEventHandler::handle_frame(self, output, needs_frame, Instant::now())
            }
            Event::Command(command) => CommandEventHandler::handle_command(self, command),
        }
    }

    /// Drains idle tasks, then recomputes every scheduled workspace and
    /// refreshes every scheduled output, until nothing is left.
    pub fn tick(&mut self) {
        loop {
            while let Some(task) = self.idle.pop_front() {
                self.run_idle_task(task);
            }
            if !self.transaction_manager.has_pending() {
                break;
            }

            for (output, workspace) in self.transaction_manager.take_pending_tags() {
                if let Some(out) = self.output_manager.get_mut(output) {
                    out.state.tag_mut(workspace).pending_transaction = false;
                }
                self.arrange_workspace(output, workspace);
            }
            for output in self.transaction_manager.take_pending_outputs() {
                if let Some(out) = self.output_manager.get_mut(output) {
                    out.pending_transaction = false;
                }
                self.refresh_output(output);
            }
        }
    }

    fn run_idle_task(&mut self, task: IdleTask) {
        trace!(?task, "idle task");
        match task {
            IdleTask::ReapplyMaxFull(container) => self.reapply_max_full(container),
            IdleTask::TranslateFloating { container, from, to } => {
                self.translate_floating(container, from, to)
            }
            IdleTask::SortOutputs => self.sort_outputs(),
            IdleTask::ClampFloating => self.clamp_floating(),
        }
    }

    fn defer(&mut self, task: IdleTask) {
        if !self.idle.contains(&task) {
            self.idle.push_back(task);
        }
    }

    /// Marks a workspace for recompute in the next coalescing pass.
    fn schedule_tag(&mut self, output: OutputId, workspace: usize) {
        let Some(out) = self.output_manager.get_mut(output) else { return };
        let tag = out.state.tag_mut(workspace);
        let workspace = tag.index;
        tag.pending_transaction = true;
        self.transaction_manager.schedule_tag(output, workspace);
    }

    fn schedule_output(&mut self, output: OutputId) {
        let Some(out) = self.output_manager.get_mut(output) else { return };
        out.pending_transaction = true;
        self.transaction_manager.schedule_output(output);
    }

    fn send(&self, request: Request) {
        trace!(?request, "request");
        self.requests.send(request);
    }

    fn emit(&self, signal: Signal) {
        trace!(name = signal.name(), "signal");
        self.broadcast.send(signal);
    }

    fn emit_client_prop(&self, container: ContainerId, property: ClientProperty) {
        if let Some(toplevel) = self.container_manager.get(container).and_then(Container::front) {
            self.emit(Signal::ClientProp { toplevel, property });
        }
    }

    // Queries.

    pub fn toplevel(&self, id: ToplevelId) -> Result<&Toplevel, ReactorError> {
        self.toplevel_manager.get(id).ok_or(ReactorError::StaleToplevel(id))
    }

    pub fn container(&self, id: ContainerId) -> Result<&Container, ReactorError> {
        self.container_manager.get(id).ok_or(ReactorError::StaleContainer(id))
    }

    pub fn output(&self, id: OutputId) -> Result<&Output, ReactorError> {
        self.output_manager.get(id).ok_or(ReactorError::StaleOutput(id))
    }

    /// Last committed geometry of a toplevel.
    pub fn get_geometry(&self, id: ToplevelId) -> Result<Rect, ReactorError> {
        Ok(self.toplevel(id)?.geometry)
    }

    pub fn container_of(&self, id: ToplevelId) -> Result<ContainerId, ReactorError> {
        self.toplevel(id)?.container.ok_or(ReactorError::Uncontained(id))
    }

    pub fn toplevels(&self) -> &[ToplevelId] { &self.toplevel_manager.order }

    pub fn containers(&self) -> &[ContainerId] { &self.container_manager.order }

    /// Real outputs in layout order.
    pub fn outputs(&self) -> &[OutputId] { &self.output_manager.order }

    pub fn focused_output(&self) -> OutputId { self.output_manager.focused }

    pub fn fallback_output(&self) -> OutputId { self.output_manager.fallback }

    pub fn focused_toplevel(&self) -> Option<ToplevelId> { self.focused_toplevel }

    pub fn insert_marked(&self) -> Option<ContainerId> { self.container_manager.insert_marked }

    pub fn resize_count(&self) -> i32 { self.transaction_manager.resize_count() }

    pub fn is_state_cached(&self, name: &str) -> bool { self.output_manager.cache.contains(name) }

    pub fn is_visible(&self, id: ContainerId) -> Result<bool, ReactorError> {
        Ok(self.container_visible(self.container(id)?))
    }

    pub fn is_floating(&self, id: ContainerId) -> Result<bool, ReactorError> {
        Ok(self.container_floating(self.container(id)?))
    }

    pub fn is_tileable(&self, id: ContainerId) -> Result<bool, ReactorError> {
        Ok(self.container_tileable(self.container(id)?))
    }

    pub fn is_visible_in_workspace(
        &self,
        id: ContainerId,
        workspace: usize,
    ) -> Result<bool, ReactorError> {
        Ok(self.container_visible_in_workspace(self.container(id)?, workspace))
    }

    /// Renders the BSP tree of a workspace for debugging.
    pub fn draw_bsp_tree(&self, output: OutputId, workspace: usize) -> Result<String, ReactorError> {
        let out = self.output(output)?;
        match out.state.tag(workspace).system(LayoutMode::Bsp) {
            LayoutSystemKind::Bsp(bsp) => Ok(bsp.draw_tree(|id| format!("{id:?}"))),
            _ => Ok(String::new()),
        }
    }

    fn container_visible(&self, c: &Container) -> bool {
        if c.is_minimized() {
            return false;
        }
        if c.is_sticky() {
            return true;
        }
        self.output_manager
            .get(c.output)
            .is_some_and(|o| o.state.active_tag.intersects(c.tag))
    }

    fn container_visible_in_workspace(&self, c: &Container, workspace: usize) -> bool {
        if c.is_minimized() {
            return false;
        }
        let Some(out) = self.output_manager.get(c.output) else { return false };
        out.state.active_workspace != 0
            && !out.state.active_tag.is_empty()
            && c.workspace == workspace
    }

    fn container_floating(&self, c: &Container) -> bool {
        c.state.contains(ContainerState::FLOATING)
            || self
                .output_manager
                .get(c.output)
                .is_none_or(|o| o.state.tag(c.workspace).layout_mode == LayoutMode::Floating)
    }

    fn container_tileable(&self, c: &Container) -> bool {
        !c.is_unmanaged()
            && c.configure_allowed()
            && !self.container_floating(c)
            && self.container_visible_in_workspace(c, c.workspace)
    }

    fn toplevel_visible(&self, id: ToplevelId) -> bool {
        self.toplevel_manager
            .get(id)
            .and_then(|t| t.container)
            .and_then(|c| self.container_manager.get(c))
            .is_some_and(|c| c.front() == Some(id) && self.container_visible(c))
    }

    // Layout and transactions.

    /// Requests a new surface size, skipping toplevels that already have it.
    /// Resizes of visible mapped toplevels hold back repaint until the client
    /// acknowledges them.
    fn resize_toplevel(&mut self, id: ToplevelId, width: i32, height: i32) {
        let visible = self.toplevel_visible(id);
        let Some(toplevel) = self.toplevel_manager.get_mut(id) else { return };
        if toplevel.target_size() == (width, height) {
            return;
        }
        let serial = toplevel.next_serial();
        toplevel.pending_size = Some((width, height));
        if toplevel.resize_serial.is_some() {
            toplevel.resize_serial = Some(serial);
        } else if toplevel.mapped && visible {
            toplevel.resize_serial = Some(serial);
            self.transaction_manager.begin_resize();
        }
        self.send(Request::Resize { toplevel: id, width, height, serial });
    }

    /// Drops the outstanding resize of a toplevel that is going away.
    fn abandon_resize(&mut self, id: ToplevelId) {
        let Some(toplevel) = self.toplevel_manager.get_mut(id) else { return };
        toplevel.pending_size = None;
        if toplevel.resize_serial.take().is_some() && self.transaction_manager.finish_resize() {
            self.repaint_waiting_outputs();
        }
    }

    /// Every output held back by the gate gets exactly one repaint.
    fn repaint_waiting_outputs(&mut self) {
        let mut waiting = Vec::new();
        for (id, output) in self.output_manager.outputs.iter_mut() {
            if output.waiting_since.take().is_some() {
                waiting.push(id);
            }
        }
        for output in waiting {
            self.send(Request::ScheduleRepaint { output });
        }
    }

    /// Applies the active strategy of a workspace to its members.
    fn arrange_workspace(&mut self, output: OutputId, workspace: usize) {
        if self.output_manager.is_fallback(output) {
            return;
        }
        let Some(out) = self.output_manager.get(output) else {
            debug!(?output, "Arrange for unknown output - ignoring");
            return;
        };
        if !out.state.active_tag.has_workspace(workspace) {
            trace!(?output, workspace, "skipping arrange of hidden workspace");
            return;
        }

        let members: Vec<ContainerId> = out
            .state
            .focus_stack
            .iter()
            .copied()
            .filter(|id| self.container_manager.get(*id).is_some_and(|c| c.workspace == workspace))
            .collect();
        let tileable: Vec<ContainerId> = members
            .iter()
            .copied()
            .filter(|id| self.container_manager.get(*id).is_some_and(|c| self.container_tileable(c)))
            .collect();
        let floating: Vec<(ContainerId, Rect)> = members
            .iter()
            .filter_map(|id| {
                let c = self.container_manager.get(*id)?;
                (self.container_floating(c)
                    && c.configure_allowed()
                    && self.container_visible_in_workspace(c, workspace))
                .then_some((*id, c.floating_box))
            })
            .collect();

        let tag = out.state.tag(workspace);
        let mode = tag.layout_mode;
        let inputs = LayoutInputs {
            area: out.usable_area,
            tileable: &tileable,
            floating: &floating,
            master: &tag.master,
        };
        let layout = trace_misc("recompute", || tag.active_system().recompute(&inputs));

        for (container, rect) in layout {
            if mode.is_tiling() {
                self.place_tiled(container, rect);
            } else {
                self.restore_floating_box(container);
            }
        }
        for container in members {
            let max_or_full = self
                .container_manager
                .get(container)
                .is_some_and(|c| !c.configure_allowed() && self.container_visible(c));
            if max_or_full {
                self.reapply_max_full(container);
            }
        }
    }

    /// Shows or hides every container of an output to match its tags, then
    /// asks for a repaint.
    fn refresh_output(&mut self, output: OutputId) {
        let Some(out) = self.output_manager.get(output) else { return };
        let mut changed = Vec::new();
        for id in &out.state.containers {
            if let Some(c) = self.container_manager.get(*id) {
                let visible = self.container_visible(c);
                if c.hidden == visible {
                    changed.push((*id, visible));
                }
            }
        }
        for (container, visible) in changed {
            if let Some(c) = self.container_manager.get_mut(container) {
                c.hidden = !visible;
            }
            self.send(Request::SetVisible { container, visible });
        }
        self.send(Request::ScheduleRepaint { output });
    }

    /// Gate for the frame of `output` at `now`.
    pub fn frame(
        &mut self,
        output: OutputId,
        needs_frame: bool,
        now: Instant,
    ) -> Result<bool, ReactorError> {
        let tearing = self.output_allows_tearing(output);
        let out = self.output_manager.get_mut(output).ok_or(ReactorError::StaleOutput(output))?;
        out.needs_frame = needs_frame;
        if !needs_frame {
            return Ok(false);
        }
        if tearing {
            return Ok(true);
        }
        Ok(self.transaction_manager.allow_render(out, now))
    }

    /// A visible fullscreen toplevel that allows tearing bypasses the gate.
    fn output_allows_tearing(&self, output: OutputId) -> bool {
        let Some(out) = self.output_manager.get(output) else { return false };
        out.state.containers.iter().any(|id| {
            self.container_manager.get(*id).is_some_and(|c| {
                c.is_fullscreen()
                    && self.container_visible(c)
                    && c.front()
                        .and_then(|t| self.toplevel_manager.get(t))
                        .is_some_and(|t| t.allow_tearing)
            })
        })
    }

    // Focus.

    pub(crate) fn focus_toplevel(&mut self, id: ToplevelId) {
        let Some(toplevel) = self.toplevel_manager.get(id) else {
            debug!(?id, "Focus for unknown toplevel - ignoring");
            return;
        };
        if !toplevel.mapped {
            return;
        }
        let container = toplevel.container;
        let urgent = toplevel.urgent;

        if let Some(container) = container {
            if self.container_manager.get(container).and_then(Container::front) != Some(id) {
                self.set_front_toplevel(id);
            }
            if let Some(output) = self.container_manager.get(container).map(|c| c.output) {
                if let Some(out) = self.output_manager.get_mut(output) {
                    out.state.focus_stack.retain(|c| *c != container);
                    out.state.focus_stack.insert(0, container);
                }
                if output != self.output_manager.focused {
                    self.set_focused_output_silently(output);
                }
            }
        }

        if self.focused_toplevel != Some(id) {
            if let Some(previous) = self.focused_toplevel {
                if self.toplevel_manager.get(previous).is_some() {
                    self.send(Request::SetActivated { toplevel: previous, activated: false });
                }
            }
            self.focused_toplevel = Some(id);
            self.send(Request::SetActivated { toplevel: id, activated: true });
            self.send(Request::Focus { toplevel: id });
        }

        if urgent {
            if let Some(t) = self.toplevel_manager.get_mut(id) {
                t.urgent = false;
            }
            self.emit(Signal::ClientProp { toplevel: id, property: ClientProperty::Urgent });
        }
    }

    /// Focuses the most recently focused visible toplevel of `output`, or
    /// clears focus when there is none.
    fn focus_newest_visible(&mut self, output: OutputId) {
        let Some(out) = self.output_manager.get(output) else { return };
        let next = out.state.focus_stack.iter().find_map(|id| {
            let c = self.container_manager.get(*id)?;
            if self.container_visible(c) { c.front() } else { None }
        });
        match next {
            Some(toplevel) => self.focus_toplevel(toplevel),
            None => self.clear_focus(),
        }
    }

    fn clear_focus(&mut self) {
        if let Some(previous) = self.focused_toplevel.take() {
            if self.toplevel_manager.get(previous).is_some() {
                self.send(Request::SetActivated { toplevel: previous, activated: false });
            }
            self.send(Request::ClearFocus);
        }
    }
}
