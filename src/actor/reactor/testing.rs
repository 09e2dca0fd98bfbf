use super::*;
use crate::actor::broadcast::BroadcastReceiver;
use crate::common::config::Config;

/// The far side of both reactor channels, standing in for the protocol
/// layer and the scripting runtime.
pub struct Host {
    requests: RequestReceiver,
    signals: BroadcastReceiver,
}

impl Host {
    pub fn requests(&mut self) -> Vec<Request> { actor::drain(&mut self.requests) }

    pub fn signals(&mut self) -> Vec<Signal> { actor::drain(&mut self.signals) }

    pub fn signal_names(&mut self) -> Vec<String> {
        self.signals().iter().map(Signal::name).collect()
    }

    /// Drops everything queued so far.
    pub fn clear(&mut self) {
        _ = self.requests();
        _ = self.signals();
    }
}

/// Commits that acknowledge every resize in `requests`, in order.
pub fn acks(requests: &[Request]) -> Vec<Event> {
    requests
        .iter()
        .filter_map(|r| match *r {
            Request::Resize { toplevel, width, height, serial } => Some(Event::Commit {
                toplevel,
                serial,
                geometry: Rect::new(0, 0, width, height),
            }),
            _ => None,
        })
        .collect()
}

pub fn resizes(requests: &[Request]) -> Vec<(ToplevelId, i32, i32, ConfigureSerial)> {
    requests
        .iter()
        .filter_map(|r| match *r {
            Request::Resize { toplevel, width, height, serial } => {
                Some((toplevel, width, height, serial))
            }
            _ => None,
        })
        .collect()
}

pub fn repaints(requests: &[Request]) -> Vec<OutputId> {
    requests
        .iter()
        .filter_map(|r| match *r {
            Request::ScheduleRepaint { output } => Some(output),
            _ => None,
        })
        .collect()
}

/// Borderless config with every workspace starting in `mode`.
pub fn config_with(mode: LayoutMode) -> Config {
    let mut config = Config::default();
    config.settings.layout.default_mode = mode;
    config.settings.border.width = 0;
    config
}

pub fn output_info(name: &str, layout_box: Rect) -> OutputInfo {
    OutputInfo {
        name: name.to_string(),
        layout_box,
        usable_area: None,
        enabled: true,
    }
}

pub fn toplevel_info(width: i32, height: i32) -> ToplevelInfo {
    ToplevelInfo {
        geometry: Rect::new(0, 0, width, height),
        ..Default::default()
    }
}

pub const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

impl Reactor {
    pub fn new_for_test(config: Config) -> (Reactor, Host) {
        let (requests_tx, requests) = actor::channel();
        let (signals_tx, signals) = actor::channel();
        (Reactor::new(config, requests_tx, signals_tx), Host { requests, signals })
    }

    /// Announces and maps a toplevel.
    pub fn map_new(&mut self, info: ToplevelInfo) -> ToplevelId {
        let id = self.new_toplevel(info);
        self.handle_event(Event::Map(id));
        id
    }

    pub fn command(&mut self, command: impl Into<Command>) {
        self.handle_event(Event::Command(command.into()));
    }

    /// Ticks and acknowledges every resize until the reactor goes quiet.
    /// Returns every request sent on the way.
    pub fn settle(&mut self, host: &mut Host) -> Vec<Request> {
        let mut all = Vec::new();
        loop {
            self.tick();
            let requests = host.requests();
            let acks = acks(&requests);
            all.extend(requests);
            if acks.is_empty() {
                return all;
            }
            for event in acks {
                self.handle_event(event);
            }
        }
    }

    /// Rect of the container holding `toplevel`.
    pub fn rect_of(&self, toplevel: ToplevelId) -> Rect {
        let container = self.container_of(toplevel).unwrap();
        self.container(container).unwrap().rect()
    }
}

impl From<ContainerCommand> for Command {
    fn from(cmd: ContainerCommand) -> Self { Command::Container(cmd) }
}

impl From<ToplevelCommand> for Command {
    fn from(cmd: ToplevelCommand) -> Self { Command::Toplevel(cmd) }
}

impl From<OutputCommand> for Command {
    fn from(cmd: OutputCommand) -> Self { Command::Output(cmd) }
}
