use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use cairn_wm::actor::broadcast::Signal;
use cairn_wm::actor::reactor::{
    Command, ContainerCommand, Event, OutputCommand, Reactor, ReactorError, Request,
    ToplevelCommand,
};
use cairn_wm::actor::{self, Receiver};
use cairn_wm::common::collections::BTreeMap;
use cairn_wm::common::config::{Config, config_file};
use cairn_wm::common::log;
use cairn_wm::model::container::ContainerId;
use cairn_wm::model::output::{OutputId, OutputInfo};
use cairn_wm::model::tag::LayoutMode;
use cairn_wm::model::toplevel::{ToplevelId, ToplevelInfo};
use cairn_wm::sys::geometry::Rect;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Headless driver for the cairn layout core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and show what auto-fix would change
    CheckConfig {
        /// Defaults to the user config file
        path: Option<PathBuf>,
    },
    /// Replay a scenario and print every request and signal as JSON lines
    Run {
        scenario: PathBuf,
        /// Config to run with instead of the user config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum ScenarioError {
    #[error("label `{0}` is already in use")]
    DuplicateLabel(String),
    #[error("no toplevel labelled `{0}`")]
    UnknownToplevel(String),
    #[error("no output labelled `{0}`")]
    UnknownOutput(String),
    #[error(transparent)]
    Reactor(#[from] ReactorError),
}

#[derive(Debug, Deserialize)]
struct Scenario {
    steps: Vec<Step>,
}

/// One step of a scenario. Outputs and toplevels are named by labels given
/// when they are created; container commands address the container that
/// holds the labelled toplevel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    Output { label: String, info: OutputInfo },
    DestroyOutput(String),
    LayoutBox(String, Rect),
    UsableArea(String, Rect),
    /// Announces and maps a toplevel.
    Toplevel { label: String, info: ToplevelInfo },
    Unmap(String),
    Map(String),
    Destroy(String),
    Activate(String),
    Focus(String),
    JumpTo { toplevel: String, merge: bool },
    Floating(String, bool),
    Maximized(String, bool),
    Fullscreen(String, bool),
    Minimized(String, bool),
    Sticky(String, bool),
    MoveToTag(String, usize),
    MoveToOutput(String, String),
    Swap(String, String),
    MarkInsert(Option<String>),
    ViewOnly(String, usize),
    ActiveTag(String, u32),
    LayoutMode { output: String, workspace: usize, mode: LayoutMode },
    Gaps { output: String, workspace: usize, gaps: i32 },
    Frame(String),
    /// Prints the current placement of every labelled toplevel.
    Snapshot,
}

struct Runner<W> {
    reactor: Reactor,
    requests: Receiver<Request>,
    signals: Receiver<Signal>,
    outputs: BTreeMap<String, OutputId>,
    toplevels: BTreeMap<String, ToplevelId>,
    out: W,
}

impl<W: Write> Runner<W> {
    fn new(config: Config, out: W) -> Self {
        let (requests_tx, requests) = actor::channel();
        let (signals_tx, signals) = actor::channel();
        Self {
            reactor: Reactor::new(config, requests_tx, signals_tx),
            requests,
            signals,
            outputs: BTreeMap::new(),
            toplevels: BTreeMap::new(),
            out,
        }
    }

    fn output(&self, label: &str) -> Result<OutputId, ScenarioError> {
        self.outputs.get(label).copied().ok_or_else(|| ScenarioError::UnknownOutput(label.into()))
    }

    fn toplevel(&self, label: &str) -> Result<ToplevelId, ScenarioError> {
        self.toplevels
            .get(label)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownToplevel(label.into()))
    }

    fn container_command(
        &mut self,
        label: &str,
        cmd: impl FnOnce(ContainerId) -> ContainerCommand,
    ) -> Result<(), ScenarioError> {
        let container = self.reactor.container_of(self.toplevel(label)?)?;
        self.reactor.handle_event(Event::Command(Command::Container(cmd(container))));
        Ok(())
    }

    fn output_command(&mut self, cmd: OutputCommand) {
        self.reactor.handle_event(Event::Command(Command::Output(cmd)));
    }

    fn claim(&self, label: &str) -> Result<(), ScenarioError> {
        if self.outputs.contains_key(label) || self.toplevels.contains_key(label) {
            return Err(ScenarioError::DuplicateLabel(label.into()));
        }
        Ok(())
    }

    fn step(&mut self, step: Step) -> anyhow::Result<()> {
        debug!(?step, "step");
        match step {
            Step::Output { label, info } => {
                self.claim(&label)?;
                let id = self.reactor.new_output(info);
                self.outputs.insert(label, id);
            }
            Step::DestroyOutput(label) => {
                let id = self.output(&label)?;
                self.reactor.handle_event(Event::OutputDestroyed(id));
                self.outputs.remove(&label);
            }
            Step::LayoutBox(label, rect) => {
                let id = self.output(&label)?;
                self.reactor.handle_event(Event::OutputLayoutChanged(vec![(id, rect)]));
            }
            Step::UsableArea(label, rect) => {
                let id = self.output(&label)?;
                self.reactor.handle_event(Event::UsableAreaChanged(id, rect));
            }
            Step::Toplevel { label, info } => {
                self.claim(&label)?;
                let id = self.reactor.new_toplevel(info);
                self.toplevels.insert(label, id);
                self.reactor.handle_event(Event::Map(id));
            }
            Step::Unmap(label) => {
                let id = self.toplevel(&label)?;
                self.reactor.handle_event(Event::Unmap(id));
            }
            Step::Map(label) => {
                let id = self.toplevel(&label)?;
                self.reactor.handle_event(Event::Map(id));
            }
            Step::Destroy(label) => {
                let id = self.toplevel(&label)?;
                self.reactor.handle_event(Event::Destroy(id));
                self.toplevels.remove(&label);
            }
            Step::Activate(label) => {
                let id = self.toplevel(&label)?;
                self.reactor.handle_event(Event::RequestActivate(id));
            }
            Step::Focus(label) => {
                let id = self.toplevel(&label)?;
                let cmd = Command::Toplevel(ToplevelCommand::Focus(id));
                self.reactor.handle_event(Event::Command(cmd));
            }
            Step::JumpTo { toplevel, merge } => {
                let toplevel = self.toplevel(&toplevel)?;
                let cmd = Command::Toplevel(ToplevelCommand::JumpTo { toplevel, merge });
                self.reactor.handle_event(Event::Command(cmd));
            }
            Step::Floating(label, set) => {
                self.container_command(&label, |c| ContainerCommand::SetFloating(c, set))?
            }
            Step::Maximized(label, set) => {
                self.container_command(&label, |c| ContainerCommand::SetMaximized(c, set))?
            }
            Step::Fullscreen(label, set) => {
                self.container_command(&label, |c| ContainerCommand::SetFullscreen(c, set))?
            }
            Step::Minimized(label, set) => {
                self.container_command(&label, |c| ContainerCommand::SetMinimized(c, set))?
            }
            Step::Sticky(label, set) => {
                self.container_command(&label, |c| ContainerCommand::SetSticky(c, set))?
            }
            Step::MoveToTag(label, workspace) => {
                self.container_command(&label, |c| ContainerCommand::MoveToTag(c, workspace))?
            }
            Step::MoveToOutput(label, output) => {
                let output = self.output(&output)?;
                self.container_command(&label, |c| ContainerCommand::MoveToOutput(c, output))?
            }
            Step::Swap(a, b) => {
                let b = self.reactor.container_of(self.toplevel(&b)?)?;
                self.container_command(&a, |a| ContainerCommand::Swap(a, b))?
            }
            Step::MarkInsert(label) => {
                let container = match label {
                    Some(label) => Some(self.reactor.container_of(self.toplevel(&label)?)?),
                    None => None,
                };
                let cmd = Command::Container(ContainerCommand::MarkInsert(container));
                self.reactor.handle_event(Event::Command(cmd));
            }
            Step::ViewOnly(label, workspace) => {
                let output = self.output(&label)?;
                self.output_command(OutputCommand::SetViewOnly(output, workspace));
            }
            Step::ActiveTag(label, tag) => {
                let output = self.output(&label)?;
                self.output_command(OutputCommand::SetActiveTag(output, tag));
            }
            Step::LayoutMode { output, workspace, mode } => {
                let output = self.output(&output)?;
                self.output_command(OutputCommand::SetLayoutMode { output, workspace, mode });
            }
            Step::Gaps { output, workspace, gaps } => {
                let output = self.output(&output)?;
                self.output_command(OutputCommand::SetUselessGaps { output, workspace, gaps });
            }
            Step::Frame(label) => {
                let output = self.output(&label)?;
                self.reactor.handle_event(Event::Frame { output, needs_frame: true });
            }
            Step::Snapshot => self.snapshot()?,
        }
        self.settle()
    }

    /// Runs the coalescing pass and answers every resize the way a well
    /// behaved client would, until nothing is left to do.
    fn settle(&mut self) -> anyhow::Result<()> {
        loop {
            self.reactor.tick();
            let requests = actor::drain(&mut self.requests);
            for signal in actor::drain(&mut self.signals) {
                writeln!(self.out, "{}", json!({ "signal": signal.name(), "detail": signal }))?;
            }
            let mut acks = Vec::new();
            for request in &requests {
                writeln!(self.out, "{}", serde_json::to_string(request)?)?;
                if let Request::Resize { toplevel, width, height, serial } = *request {
                    acks.push(Event::Commit {
                        toplevel,
                        serial,
                        geometry: Rect::new(0, 0, width, height),
                    });
                }
            }
            if acks.is_empty() {
                return Ok(());
            }
            for ack in acks {
                self.reactor.handle_event(ack);
            }
        }
    }

    fn snapshot(&mut self) -> Result<(), ScenarioError> {
        let mut toplevels = serde_json::Map::new();
        for (label, id) in &self.toplevels {
            let Ok(container) = self.reactor.container_of(*id) else {
                toplevels.insert(label.clone(), json!(null));
                continue;
            };
            let c = self.reactor.container(container)?;
            let output = self
                .outputs
                .iter()
                .find_map(|(name, o)| (*o == c.output).then_some(name.as_str()));
            toplevels.insert(
                label.clone(),
                json!({
                    "output": output,
                    "workspace": c.workspace,
                    "rect": c.rect(),
                    "state": c.state,
                    "visible": self.reactor.is_visible(container)?,
                    "front": c.front() == Some(*id),
                }),
            );
        }
        let focused = self
            .reactor
            .focused_toplevel()
            .and_then(|t| self.toplevels.iter().find_map(|(l, id)| (*id == t).then(|| l.clone())));
        let line = json!({ "snapshot": toplevels, "focused": focused });
        // Snapshot lines are best effort; a closed stdout ends the run anyway.
        _ = writeln!(self.out, "{line}");
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file);
    if !path.exists() {
        info!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let mut config =
        Config::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let fixes = config.auto_fix_values();
    if fixes > 0 {
        info!(fixes, "applied config auto-fixes");
    }
    Ok(config)
}

fn check_config(path: Option<PathBuf>) -> anyhow::Result<bool> {
    let path = path.unwrap_or_else(config_file);
    let mut config =
        Config::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let issues = config.validate();
    if issues.is_empty() {
        println!("{}: ok", path.display());
        return Ok(true);
    }
    for issue in &issues {
        println!("{}: {issue}", path.display());
    }
    let fixes = config.auto_fix_values();
    println!("{fixes} value(s) can be fixed automatically");
    Ok(false)
}

fn run(scenario: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(scenario)
        .with_context(|| format!("reading {}", scenario.display()))?;
    let scenario: Scenario = ron::from_str(&text)
        .with_context(|| format!("parsing {}", scenario.display()))?;
    let config = load_config(config)?;

    let stdout = std::io::stdout();
    let mut runner = Runner::new(config, stdout.lock());
    for (i, step) in scenario.steps.into_iter().enumerate() {
        runner.step(step).with_context(|| format!("step {}", i + 1))?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    log::init_logging();

    let result = match cli.command {
        Commands::CheckConfig { path } => check_config(path).map(|ok| if ok { 0 } else { 1 }),
        Commands::Run { scenario, config } => run(&scenario, config.as_deref()).map(|()| 0),
    };
    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{err:#}");
            eprintln!("cairn: {err:#}");
            process::exit(2);
        }
    }
}
