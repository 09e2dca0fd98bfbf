use serde::Serialize;
use strum::IntoStaticStr;

use crate::model::container::ContainerId;
use crate::model::output::OutputId;
use crate::model::toplevel::ToplevelId;

/// Property of a client whose change is announced as `client::prop::<name>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientProperty {
    Floating,
    Maximized,
    Fullscreen,
    Minimized,
    Sticky,
    Urgent,
    Opacity,
    BorderWidth,
    Workspace,
    Tag,
    Output,
    Decoration,
}

/// Property of a screen whose change is announced as `screen::prop::<name>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScreenProperty {
    ActiveTag,
    ActiveWorkspace,
    LayoutMode,
    UselessGaps,
    Mwfact,
    MasterCount,
    ColumnCount,
    StrategyIdx,
    Enabled,
    UsableArea,
    MaxGeneralWorkspace,
}

/// Notifications for observers such as the scripting runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum Signal {
    ContainerNew { container: ContainerId },
    ContainerDestroy { container: ContainerId },
    ContainerInsert { container: ContainerId, toplevel: ToplevelId },
    ContainerRemove { container: ContainerId, toplevel: ToplevelId },
    ContainerSwap { a: ContainerId, b: ContainerId },
    ClientMap { toplevel: ToplevelId },
    ClientUnmap { toplevel: ToplevelId },
    ClientDestroy { toplevel: ToplevelId },
    ClientSwap { a: ToplevelId, b: ToplevelId },
    ClientProp { toplevel: ToplevelId, property: ClientProperty },
    ScreenNew { output: OutputId },
    ScreenDestroy { output: OutputId },
    ScreenFocus { output: OutputId },
    ScreenUnfocus { output: OutputId },
    ScreenProp { output: OutputId, property: ScreenProperty },
}

impl Signal {
    /// Name the signal is published under.
    pub fn name(&self) -> String {
        let fixed = match self {
            Signal::ContainerNew { .. } => "container::new",
            Signal::ContainerDestroy { .. } => "container::destroy",
            Signal::ContainerInsert { .. } => "container::insert",
            Signal::ContainerRemove { .. } => "container::remove",
            Signal::ContainerSwap { .. } => "container::swap",
            Signal::ClientMap { .. } => "client::map",
            Signal::ClientUnmap { .. } => "client::unmap",
            Signal::ClientDestroy { .. } => "client::destroy",
            Signal::ClientSwap { .. } => "client::swap",
            Signal::ScreenNew { .. } => "screen::new",
            Signal::ScreenDestroy { .. } => "screen::destroy",
            Signal::ScreenFocus { .. } => "screen::focus",
            Signal::ScreenUnfocus { .. } => "screen::unfocus",
            Signal::ClientProp { property, .. } => {
                let name: &'static str = property.into();
                return format!("client::prop::{name}");
            }
            Signal::ScreenProp { property, .. } => {
                let name: &'static str = property.into();
                return format!("screen::prop::{name}");
            }
        };
        fixed.to_string()
    }
}

pub type BroadcastSender = crate::actor::Sender<Signal>;
pub type BroadcastReceiver = crate::actor::Receiver<Signal>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_names() {
        let t = ToplevelId::default();
        let o = OutputId::default();
        assert_eq!(Signal::ClientMap { toplevel: t }.name(), "client::map");
        assert_eq!(
            Signal::ClientProp { toplevel: t, property: ClientProperty::BorderWidth }.name(),
            "client::prop::border_width"
        );
        assert_eq!(
            Signal::ScreenProp { output: o, property: ScreenProperty::ActiveTag }.name(),
            "screen::prop::active_tag"
        );
    }
}
