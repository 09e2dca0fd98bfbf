use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::model::container::ContainerId;
use crate::sys::geometry::Rect;

new_key_type! {
    pub struct ToplevelId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToplevelKind {
    #[default]
    Normal,
    /// Override-redirect style surfaces. They get a borderless container that
    /// never tiles and never takes the insert mark.
    Unmanaged,
}

/// Decoration policy of a toplevel. The numeric values are shared with the
/// scripting surface.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive
)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum DecorationMode {
    None = 0,
    ClientSide = 1,
    ServerSide = 2,
    /// Whatever the client asked for, server side when it did not ask.
    #[default]
    ClientPreferred = 100,
    /// Client side while the workspace is floating, server side when tiled.
    ClientSideOnFloating = 101,
}

impl DecorationMode {
    /// Resolves a policy into the mode actually negotiated with the client.
    pub fn resolve(self, requested: Option<DecorationMode>, floating_workspace: bool) -> Self {
        match self {
            DecorationMode::ClientPreferred => match requested {
                Some(DecorationMode::ClientSide) => DecorationMode::ClientSide,
                _ => DecorationMode::ServerSide,
            },
            DecorationMode::ClientSideOnFloating => {
                if floating_workspace {
                    DecorationMode::ClientSide
                } else {
                    DecorationMode::ServerSide
                }
            }
            DecorationMode::ClientSide | DecorationMode::ServerSide => self,
            DecorationMode::None => DecorationMode::ServerSide,
        }
    }
}

/// Serial attached to a resize request and echoed back by the commit that
/// acknowledges it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigureSerial(pub u32);

/// What the protocol layer knows about a toplevel when it is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToplevelInfo {
    pub kind: ToplevelKind,
    pub geometry: Rect,
    pub parent: Option<ToplevelId>,
    pub min_size: (i32, i32),
    pub max_size: (i32, i32),
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub allow_tearing: bool,
}

#[derive(Debug)]
pub struct Toplevel {
    pub kind: ToplevelKind,
    pub mapped: bool,
    pub urgent: bool,
    /// Activation was requested before the toplevel was mapped.
    pub pending_activation: bool,
    pub allow_tearing: bool,
    /// Outstanding resize that counts against the repaint gate.
    pub resize_serial: Option<ConfigureSerial>,
    /// Size of the last resize request not yet acknowledged.
    pub pending_size: Option<(i32, i32)>,
    last_serial: ConfigureSerial,
    pub decoration: DecorationMode,
    pub requested_decoration: Option<DecorationMode>,
    pub geometry: Rect,
    pub container: Option<ContainerId>,
    pub parent: Option<ToplevelId>,
    pub min_size: (i32, i32),
    pub max_size: (i32, i32),
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub xdg_tag: Option<String>,
    pub xdg_description: Option<String>,
    /// Suspended because a sibling is the front of its container.
    pub suspended: bool,
}

impl Toplevel {
    pub fn new(info: ToplevelInfo, decoration: DecorationMode) -> Self {
        Self {
            kind: info.kind,
            mapped: false,
            urgent: false,
            pending_activation: false,
            allow_tearing: info.allow_tearing,
            resize_serial: None,
            pending_size: None,
            last_serial: ConfigureSerial::default(),
            decoration,
            requested_decoration: None,
            geometry: info.geometry,
            container: None,
            parent: info.parent,
            min_size: info.min_size,
            max_size: info.max_size,
            app_id: info.app_id,
            title: info.title,
            xdg_tag: None,
            xdg_description: None,
            suspended: false,
        }
    }

    pub fn is_unmanaged(&self) -> bool { self.kind == ToplevelKind::Unmanaged }

    /// Dialogs and fixed-size windows start out floating.
    pub fn should_float(&self) -> bool {
        let (min_w, min_h) = self.min_size;
        let (max_w, max_h) = self.max_size;
        self.parent.is_some()
            || (min_w != 0 && min_h != 0 && (min_w == max_w || min_h == max_h))
    }

    /// Size the client will have once every sent resize is acknowledged.
    pub fn target_size(&self) -> (i32, i32) {
        self.pending_size.unwrap_or((self.geometry.width, self.geometry.height))
    }

    /// Serial of the newest resize sent to the client.
    pub fn last_serial(&self) -> ConfigureSerial { self.last_serial }

    #[must_use]
    pub(crate) fn next_serial(&mut self) -> ConfigureSerial {
        self.last_serial.0 += 1;
        self.last_serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoration_resolution() {
        use DecorationMode::{ClientPreferred, ClientSide, ClientSideOnFloating, ServerSide};
        assert_eq!(ClientPreferred.resolve(None, false), ServerSide);
        assert_eq!(ClientPreferred.resolve(Some(ClientSide), false), ClientSide);
        assert_eq!(ClientSideOnFloating.resolve(None, true), ClientSide);
        assert_eq!(ClientSideOnFloating.resolve(Some(ClientSide), false), ServerSide);
        assert_eq!(DecorationMode::None.resolve(Some(ClientSide), true), ServerSide);
    }

    #[test]
    fn decoration_numeric_values() {
        assert_eq!(u32::from(DecorationMode::ClientSideOnFloating), 101);
        assert_eq!(DecorationMode::try_from(2u32).unwrap(), DecorationMode::ServerSide);
        assert!(DecorationMode::try_from(7u32).is_err());
    }

    #[test]
    fn fixed_size_and_dialogs_float() {
        let mut info = ToplevelInfo::default();
        assert!(!Toplevel::new(info.clone(), DecorationMode::default()).should_float());

        info.min_size = (300, 200);
        info.max_size = (300, 900);
        assert!(Toplevel::new(info.clone(), DecorationMode::default()).should_float());

        let mut dialog = ToplevelInfo::default();
        dialog.parent = Some(ToplevelId::default());
        assert!(Toplevel::new(dialog, DecorationMode::default()).should_float());
    }

    #[test]
    fn serials_are_monotonic() {
        let mut t = Toplevel::new(ToplevelInfo::default(), DecorationMode::default());
        let a = t.next_serial();
        let b = t.next_serial();
        assert!(b > a);
    }
}
