use tracing::{debug, info};

use crate::actor::reactor::{Command, ContainerCommand, OutputCommand, Reactor, ToplevelCommand};

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command(reactor: &mut Reactor, cmd: Command) {
        match cmd {
            Command::Container(cmd) => Self::handle_command_container(reactor, cmd),
            Command::Toplevel(cmd) => Self::handle_command_toplevel(reactor, cmd),
            Command::Output(cmd) => Self::handle_command_output(reactor, cmd),
        }
    }

    pub fn handle_command_container(reactor: &mut Reactor, cmd: ContainerCommand) {
        debug!(?cmd);
        match cmd {
            ContainerCommand::SetFloating(c, set) => reactor.set_floating(c, set),
            ContainerCommand::SetMaximized(c, set) => reactor.set_maximized(c, set),
            ContainerCommand::SetFullscreen(c, set) => reactor.set_fullscreen(c, set),
            ContainerCommand::SetMinimized(c, set) => reactor.set_minimized(c, set),
            ContainerCommand::SetSticky(c, set) => reactor.set_sticky(c, set),
            ContainerCommand::FocusIdx(c, step) => reactor.focusidx(c, step),
            ContainerCommand::SetSize { container, width, height } => {
                reactor.container_set_size(container, width, height);
                if let Some(output) = reactor.container_manager.get(container).map(|c| c.output) {
                    reactor.schedule_output(output);
                }
            }
            ContainerCommand::SetPosition { container, x, y } => {
                reactor.set_position(container, x, y)
            }
            ContainerCommand::SetPositionGlobal { container, x, y } => {
                reactor.set_position_global(container, x, y)
            }
            ContainerCommand::ToCenter(c) => reactor.to_center(c),
            ContainerCommand::SetOpacity(c, opacity) => reactor.set_opacity(c, opacity),
            ContainerCommand::SetBorderWidth(c, width) => reactor.set_border_width(c, width),
            ContainerCommand::MoveToTag(c, workspace) => reactor.move_to_tag(c, workspace),
            ContainerCommand::SetTag(c, tag) => reactor.set_tag(c, tag),
            ContainerCommand::MoveToOutput(c, output) => reactor.move_to_output(c, output, true),
            ContainerCommand::Swap(a, b) => reactor.swap_containers(a, b),
            ContainerCommand::MarkInsert(c) => reactor.mark_insert(c),
        }
    }

    pub fn handle_command_toplevel(reactor: &mut Reactor, cmd: ToplevelCommand) {
        debug!(?cmd);
        match cmd {
            ToplevelCommand::Focus(t) => reactor.focus_toplevel(t),
            ToplevelCommand::SetFront(t) => reactor.set_front_toplevel(t),
            ToplevelCommand::JumpTo { toplevel, merge } => reactor.jump_to(toplevel, merge),
            ToplevelCommand::Swap(a, b) => reactor.swap_toplevels(a, b),
        }
    }

    pub fn handle_command_output(reactor: &mut Reactor, cmd: OutputCommand) {
        match cmd {
            OutputCommand::Focus(o) => reactor.focus_output(o),
            OutputCommand::FocusDirection(direction) => reactor.focus_direction(direction),
            OutputCommand::SetActiveTag(o, tag) => reactor.set_active_tag(o, tag),
            OutputCommand::SetViewOnly(o, workspace) => reactor.set_view_only(o, workspace),
            OutputCommand::ToggleTag(o, workspace) => reactor.toggle_tag(o, workspace),
            OutputCommand::SetLayoutMode { output, workspace, mode } => {
                reactor.set_layout_mode(output, workspace, mode)
            }
            OutputCommand::SetStrategyIdx(o, step) => reactor.set_strategy_idx(o, step),
            OutputCommand::SetUselessGaps { output, workspace, gaps } => {
                reactor.set_useless_gaps(output, workspace, gaps)
            }
            OutputCommand::SetMwfact(o, mwfact) => reactor.set_mwfact(o, mwfact),
            OutputCommand::SetMasterCount(o, count) => reactor.set_master_count(o, count),
            OutputCommand::SetColumnCount(o, count) => reactor.set_column_count(o, count),
            OutputCommand::SetEnabled(o, enabled) => reactor.set_output_enabled(o, enabled),
            OutputCommand::SetMaxGeneralWorkspace(o, max) => {
                reactor.set_max_general_workspace(o, max)
            }
            OutputCommand::EvictState(name) => {
                info!(name = %name, "evicting cached output state");
                reactor.evict_output_state(&name)
            }
        }
    }
}
