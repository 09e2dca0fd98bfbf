use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::model::tag::{LayoutMode, MAX_WORKSPACE, MasterLayout, MasterState};
use crate::model::toplevel::DecorationMode;
use crate::sys::geometry::MAX_INSET;

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cairn")
        .join("cairn.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub border: BorderSettings,
    #[serde(default)]
    pub decoration: DecorationSettings,
    #[serde(default)]
    pub transaction: TransactionSettings,
    #[serde(default)]
    pub workspaces: WorkspaceSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Layout mode every workspace starts in.
    #[serde(default)]
    pub default_mode: LayoutMode,
    /// Gap around each container, in pixels.
    #[serde(default)]
    pub useless_gaps: i32,
    /// Fraction of the area given to the master column.
    #[serde(default = "default_mwfact")]
    pub mwfact: f64,
    #[serde(default = "one")]
    pub master_count: u32,
    #[serde(default = "one")]
    pub column_count: u32,
    /// Cyclic list of master-stack arrangements, first one is the default.
    #[serde(default = "default_master_layouts")]
    pub master_layouts: Vec<MasterLayout>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BorderSettings {
    #[serde(default = "default_border_width")]
    pub width: i32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct DecorationSettings {
    #[serde(default)]
    pub default_mode: DecorationMode,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TransactionSettings {
    /// How long repaint may be held back waiting for resize acknowledgements.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_transaction_timeout", rename = "timeout_ms")]
    pub timeout: Duration,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSettings {
    /// Workspaces shown to the user as general purpose, the rest are
    /// reachable only by index.
    #[serde(default = "default_max_general_workspace")]
    pub max_general_workspace: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            default_mode: LayoutMode::default(),
            useless_gaps: 0,
            mwfact: default_mwfact(),
            master_count: 1,
            column_count: 1,
            master_layouts: default_master_layouts(),
        }
    }
}

impl Default for BorderSettings {
    fn default() -> Self { Self { width: default_border_width() } }
}

impl Default for TransactionSettings {
    fn default() -> Self { Self { timeout: default_transaction_timeout() } }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            max_general_workspace: default_max_general_workspace(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.layout.validate());

        if !(0..=MAX_INSET).contains(&self.border.width) {
            issues.push(format!(
                "border.width must be between 0 and {MAX_INSET}, got {}",
                self.border.width
            ));
        }

        if self.transaction.timeout.is_zero() {
            issues.push("transaction.timeout_ms must be positive".to_string());
        }

        let max = self.workspaces.max_general_workspace;
        if max == 0 || max >= MAX_WORKSPACE {
            issues.push(format!(
                "workspaces.max_general_workspace must be between 1 and {}, got {}",
                MAX_WORKSPACE - 1,
                max
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = self.layout.auto_fix_values();

        if !(0..=MAX_INSET).contains(&self.border.width) {
            self.border.width = self.border.width.clamp(0, MAX_INSET);
            fixes += 1;
        }

        if self.transaction.timeout.is_zero() {
            self.transaction.timeout = default_transaction_timeout();
            fixes += 1;
        }

        let max = self.workspaces.max_general_workspace;
        if max == 0 || max >= MAX_WORKSPACE {
            self.workspaces.max_general_workspace = max.clamp(1, MAX_WORKSPACE - 1);
            fixes += 1;
        }

        fixes
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(0..=MAX_INSET).contains(&self.useless_gaps) {
            issues.push(format!(
                "layout.useless_gaps must be between 0 and {MAX_INSET}, got {}",
                self.useless_gaps
            ));
        }

        if !(MasterState::MIN_MWFACT..=MasterState::MAX_MWFACT).contains(&self.mwfact) {
            issues.push(format!(
                "layout.mwfact must be between {} and {}, got {}",
                MasterState::MIN_MWFACT,
                MasterState::MAX_MWFACT,
                self.mwfact
            ));
        }

        if self.master_count == 0 {
            issues.push("layout.master_count must be at least 1".to_string());
        }

        if self.column_count == 0 {
            issues.push("layout.column_count must be at least 1".to_string());
        }

        if self.master_layouts.is_empty() {
            issues.push("layout.master_layouts must name at least one arrangement".to_string());
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(0..=MAX_INSET).contains(&self.useless_gaps) {
            self.useless_gaps = self.useless_gaps.clamp(0, MAX_INSET);
            fixes += 1;
        }

        if !(MasterState::MIN_MWFACT..=MasterState::MAX_MWFACT).contains(&self.mwfact) {
            self.mwfact = if self.mwfact.is_nan() {
                default_mwfact()
            } else {
                self.mwfact.clamp(MasterState::MIN_MWFACT, MasterState::MAX_MWFACT)
            };
            fixes += 1;
        }

        if self.master_count == 0 {
            self.master_count = 1;
            fixes += 1;
        }

        if self.column_count == 0 {
            self.column_count = 1;
            fixes += 1;
        }

        if self.master_layouts.is_empty() {
            self.master_layouts = default_master_layouts();
            fixes += 1;
        }

        fixes
    }
}

fn one() -> u32 { 1 }

fn default_mwfact() -> f64 { 0.5 }

fn default_border_width() -> i32 { 1 }

fn default_transaction_timeout() -> Duration { Duration::from_millis(500) }

fn default_max_general_workspace() -> usize { 9 }

fn default_master_layouts() -> Vec<MasterLayout> {
    vec![MasterLayout::Tile, MasterLayout::TileLeft, MasterLayout::Monocle]
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn bundled() -> anyhow::Result<Config> { Self::parse(include_str!("../../cairn.default.toml")) }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile {
            settings: self.settings.clone(),
        };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: c.settings })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bundled_config_matches_defaults() {
        assert_eq!(Config::bundled().unwrap(), Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [settings.layout]
            default_mode = "bsp"
            useless_gaps = 6

            [settings.transaction]
            timeout_ms = 250
        "#,
        )
        .unwrap();

        assert_eq!(config.settings.layout.default_mode, LayoutMode::Bsp);
        assert_eq!(config.settings.layout.useless_gaps, 6);
        assert_eq!(config.settings.layout.mwfact, 0.5);
        assert_eq!(config.settings.transaction.timeout, Duration::from_millis(250));
        assert_eq!(config.settings.border.width, 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[settings.layout]\nanimate = true\n").is_err());
    }

    #[test]
    fn decoration_and_master_layouts_parse() {
        let config = Config::parse(
            r#"
            [settings.layout]
            master_layouts = ["monocle", "tile"]

            [settings.decoration]
            default_mode = "client_side_on_floating"
        "#,
        )
        .unwrap();
        assert_eq!(
            config.settings.layout.master_layouts,
            vec![MasterLayout::Monocle, MasterLayout::Tile]
        );
        assert_eq!(
            config.settings.decoration.default_mode,
            DecorationMode::ClientSideOnFloating
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        let issues = config.validate();
        assert!(issues.is_empty());

        config.settings.layout.mwfact = 1.5;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("mwfact must be between"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 1);
        assert_eq!(config.settings.layout.mwfact, 0.9);

        config.settings.layout.useless_gaps = -4;
        config.settings.border.width = -1;
        config.settings.workspaces.max_general_workspace = 0;
        assert_eq!(config.validate().len(), 3);

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 3);
        assert_eq!(config.settings.layout.useless_gaps, 0);
        assert_eq!(config.settings.border.width, 0);
        assert_eq!(config.settings.workspaces.max_general_workspace, 1);
        assert!(config.validate().is_empty());

        config.settings.layout.useless_gaps = i32::MAX;
        config.settings.border.width = i32::MAX;
        assert_eq!(config.validate().len(), 2);
        assert_eq!(config.auto_fix_values(), 2);
        assert_eq!(config.settings.layout.useless_gaps, MAX_INSET);
        assert_eq!(config.settings.border.width, MAX_INSET);
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cairn.toml");

        let mut config = Config::default();
        config.settings.layout.default_mode = LayoutMode::MasterStack;
        config.settings.transaction.timeout = Duration::from_millis(750);
        config.save(&path).unwrap();

        assert_eq!(Config::read(&path).unwrap(), config);
    }
}
