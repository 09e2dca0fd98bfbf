use std::time::Instant;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tracing::debug;

use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::model::container::ContainerId;
use crate::model::tag::{MAX_WORKSPACE, TagInfo, TagSet, clamp_workspace};
use crate::model::toplevel::ToplevelId;
use crate::sys::geometry::Rect;

new_key_type! {
    pub struct OutputId;
}

pub const FALLBACK_OUTPUT_NAME: &str = "FALLBACK";

/// Geometry of the headless fallback output. It is reasserted on every
/// outputs-state update because downstream layout code expects the fallback
/// to keep a usable size even though it is never part of the real layout.
pub const FALLBACK_OUTPUT_GEOMETRY: Rect = Rect::new(0, 0, 1920, 1080);

/// What the protocol layer reports about a newly connected display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub name: String,
    pub layout_box: Rect,
    #[serde(default)]
    pub usable_area: Option<Rect>,
    #[serde(default = "yes")]
    pub enabled: bool,
}

fn yes() -> bool { true }

/// Workspace state of an output. Outlives the output itself through the
/// restoration cache.
#[derive(Debug)]
pub struct OutputState {
    pub active_tag: TagSet,
    pub active_workspace: usize,
    pub max_general_workspace: usize,
    pub toplevels: Vec<ToplevelId>,
    pub containers: Vec<ContainerId>,
    /// Most recently focused first.
    pub focus_stack: Vec<ContainerId>,
    pub minimized: Vec<ContainerId>,
    tag_info: Vec<TagInfo>,
    /// Output that owned this state when it was cached.
    pub old_output: Option<OutputId>,
}

impl OutputState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            active_tag: TagSet::workspace(1),
            active_workspace: 1,
            max_general_workspace: settings.workspaces.max_general_workspace,
            toplevels: Vec::new(),
            containers: Vec::new(),
            focus_stack: Vec::new(),
            minimized: Vec::new(),
            tag_info: (0..MAX_WORKSPACE).map(|i| TagInfo::new(i, &settings.layout)).collect(),
            old_output: None,
        }
    }

    /// TagInfo for `workspace`; out of range indices are clamped.
    pub fn tag(&self, workspace: usize) -> &TagInfo { &self.tag_info[clamp_workspace(workspace)] }

    pub fn tag_mut(&mut self, workspace: usize) -> &mut TagInfo {
        &mut self.tag_info[clamp_workspace(workspace)]
    }

    pub fn tags_mut(&mut self) -> impl Iterator<Item = &mut TagInfo> { self.tag_info.iter_mut() }
}

#[derive(Debug)]
pub struct Output {
    pub name: String,
    pub enabled: bool,
    pub layout_box: Rect,
    pub usable_area: Rect,
    pub restored: bool,
    pub needs_frame: bool,
    pub waiting_since: Option<Instant>,
    pub pending_transaction: bool,
    pub state: OutputState,
}

impl Output {
    pub fn new(info: OutputInfo, state: OutputState, restored: bool) -> Self {
        Self {
            usable_area: info.usable_area.unwrap_or(info.layout_box),
            name: info.name,
            enabled: info.enabled,
            layout_box: info.layout_box,
            restored,
            needs_frame: false,
            waiting_since: None,
            pending_transaction: false,
            state,
        }
    }
}

/// Name-keyed store of workspace states of disconnected outputs.
#[derive(Debug, Default)]
pub struct OutputStateCache {
    states: HashMap<String, OutputState>,
}

impl OutputStateCache {
    pub fn insert(&mut self, name: &str, state: OutputState) {
        debug!(name, "caching output state");
        self.states.insert(name.to_string(), state);
    }

    pub fn take(&mut self, name: &str) -> Option<OutputState> { self.states.remove(name) }

    pub fn contains(&self, name: &str) -> bool { self.states.contains_key(name) }

    /// The cached state last owned by `output`.
    pub fn owned_by_mut(&mut self, output: OutputId) -> Option<&mut OutputState> {
        self.states.values_mut().find(|s| s.old_output == Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tag::LayoutMode;

    #[test]
    fn fresh_state_defaults() {
        let state = OutputState::new(&Settings::default());
        assert_eq!(state.active_workspace, 1);
        assert_eq!(state.active_tag, TagSet::workspace(1));
        assert_eq!(state.max_general_workspace, 9);
        assert_eq!(state.tag(3).layout_mode, LayoutMode::Floating);
        assert_eq!(state.tag(3).master.mwfact, 0.5);
        assert_eq!(state.tag(0).index, 1);
        assert_eq!(state.tag(MAX_WORKSPACE + 4).index, MAX_WORKSPACE - 1);
    }

    #[test]
    fn cache_takes_by_name() {
        let mut cache = OutputStateCache::default();
        let mut state = OutputState::new(&Settings::default());
        state.active_workspace = 4;
        cache.insert("DP-1", state);
        assert!(cache.contains("DP-1"));
        assert!(cache.take("HDMI-A-1").is_none());
        assert_eq!(cache.take("DP-1").map(|s| s.active_workspace), Some(4));
        assert!(!cache.contains("DP-1"));
    }

    #[test]
    fn usable_area_defaults_to_layout_box() {
        let info = OutputInfo {
            name: "DP-1".into(),
            layout_box: Rect::new(0, 0, 2560, 1440),
            usable_area: None,
            enabled: true,
        };
        let output = Output::new(info, OutputState::new(&Settings::default()), false);
        assert_eq!(output.usable_area, Rect::new(0, 0, 2560, 1440));
    }
}
