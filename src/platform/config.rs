// PanelDock - platform/config.rs
//
// Where PanelDock keeps its files, and the config.toml reader.
//
// Directories come from the `directories` crate (XDG, AppData or
// Library depending on the OS). config.toml is validated once at startup.

use crate::core::model::View;
use crate::core::preset::ReadonlyPolicy;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for PanelDock data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/paneldock/ or %APPDATA%\PanelDock\config\)
    pub config_dir: PathBuf,

    /// Data directory for the preset database and the saved layout.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve the per-user config and data directories.
    ///
    /// Both become `.` when the OS offers no home directory.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    /// Default location of the preset database.
    pub fn presets_path(&self) -> PathBuf {
        self.data_dir.join(constants::PRESETS_FILE_NAME)
    }

    /// Location of the saved panel layout.
    pub fn layout_path(&self) -> PathBuf {
        crate::app::layout::layout_path(&self.data_dir)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// config.toml as written on disk, before validation.
///
/// Unknown keys are ignored so files written for newer releases still load.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[modules]` section.
    pub modules: ModulesSection,
    /// `[presets]` section.
    pub presets: PresetsSection,
    /// `[ui]` section.
    pub ui: UiSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[modules]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ModulesSection {
    /// Debounce delay of postponed module updates in ms.
    pub postponed_update_ms: Option<u64>,
    /// View shown at startup when no layout was saved.
    pub default_view: Option<String>,
}

/// `[presets]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PresetsSection {
    /// "overwrite" or "refuse".
    pub readonly_policy: Option<String>,
    /// Preset database path override.
    pub database: Option<String>,
}

/// `[ui]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// Theme: "dark" or "light".
    pub theme: Option<String>,
    /// Body font size in points.
    pub font_size: Option<f32>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Checked configuration. Every field holds a usable value; rejected
/// entries were replaced by their default and reported as warnings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Modules --
    /// Debounce delay of postponed updates in ms.
    pub postponed_update_ms: u64,
    /// Startup view when no layout was saved.
    pub default_view: View,

    // -- Presets --
    /// Whether writes may overwrite read-only presets.
    pub readonly_policy: ReadonlyPolicy,
    /// Preset database override path.
    pub presets_database: Option<PathBuf>,

    // -- UI --
    /// Dark mode (true) or light mode (false).
    pub dark_mode: bool,
    /// Body font size in points.
    pub font_size: f32,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            postponed_update_ms: constants::DEFAULT_POSTPONED_UPDATE_MS,
            default_view: View::default(),
            readonly_policy: ReadonlyPolicy::default(),
            presets_database: None,
            dark_mode: true,
            font_size: constants::DEFAULT_FONT_SIZE,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unparseable, returns defaults with an error warning so the
/// application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: config_path.clone(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Validate each field against named constants, accumulating all problems.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Modules: postponed_update_ms --
    if let Some(ms) = raw.modules.postponed_update_ms {
        if (constants::MIN_POSTPONED_UPDATE_MS..=constants::MAX_POSTPONED_UPDATE_MS).contains(&ms)
        {
            config.postponed_update_ms = ms;
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: "[modules] postponed_update_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{} ms",
                    constants::MIN_POSTPONED_UPDATE_MS,
                    constants::MAX_POSTPONED_UPDATE_MS
                ),
            };
            warnings.push(format!(
                "{err}. Using default ({}).",
                constants::DEFAULT_POSTPONED_UPDATE_MS
            ));
        }
    }

    // -- Modules: default_view --
    if let Some(ref name) = raw.modules.default_view {
        match View::from_name(name) {
            Some(view) => config.default_view = view,
            None => warnings.push(format!(
                "[modules] default_view = \"{name}\" is not a known view. Using default ({}).",
                View::default(),
            )),
        }
    }

    // -- Presets: readonly_policy --
    if let Some(ref policy) = raw.presets.readonly_policy {
        match ReadonlyPolicy::from_name(policy) {
            Some(p) => config.readonly_policy = p,
            None => warnings.push(format!(
                "[presets] readonly_policy = \"{policy}\" is not recognised. \
                 Expected \"overwrite\" or \"refuse\". Using default (overwrite).",
            )),
        }
    }

    // -- Presets: database --
    if let Some(ref db) = raw.presets.database {
        if !db.trim().is_empty() {
            config.presets_database = Some(PathBuf::from(db));
        }
    }

    // -- UI: theme --
    if let Some(ref theme) = raw.ui.theme {
        match theme.to_lowercase().as_str() {
            "dark" => config.dark_mode = true,
            "light" => config.dark_mode = false,
            other => {
                warnings.push(format!(
                    "[ui] theme = \"{other}\" is not recognised. Expected \"dark\" or \"light\". Using default (dark).",
                ));
            }
        }
    }

    // -- UI: font_size --
    if let Some(size) = raw.ui.font_size {
        if (constants::MIN_FONT_SIZE..=constants::MAX_FONT_SIZE).contains(&size) {
            config.font_size = size;
        } else {
            let err = ConfigError::ValueOutOfRange {
                field: "[ui] font_size".to_string(),
                value: size.to_string(),
                expected: format!("{}-{} pt", constants::MIN_FONT_SIZE, constants::MAX_FONT_SIZE),
            };
            warnings.push(format!("{err}. Using default ({}).", constants::DEFAULT_FONT_SIZE));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(constants::CONFIG_FILE_NAME), content).unwrap();
        dir
    }

    #[test]
    fn test_missing_config_gives_defaults_without_warnings() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
        assert_eq!(config.postponed_update_ms, constants::DEFAULT_POSTPONED_UPDATE_MS);
        assert_eq!(config.readonly_policy, ReadonlyPolicy::Overwrite);
    }

    #[test]
    fn test_valid_values_are_applied() {
        let dir = write_config(
            r#"
            [modules]
            postponed_update_ms = 120
            default_view = "darkroom"

            [presets]
            readonly_policy = "refuse"
            database = "/tmp/presets.json"

            [ui]
            theme = "light"

            [future_section]
            ignored = true
            "#,
        );
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.postponed_update_ms, 120);
        assert_eq!(config.default_view, View::Darkroom);
        assert_eq!(config.readonly_policy, ReadonlyPolicy::Refuse);
        assert_eq!(config.presets_database, Some(PathBuf::from("/tmp/presets.json")));
        assert!(!config.dark_mode);
    }

    #[test]
    fn test_invalid_values_warn_and_fall_back() {
        let dir = write_config(
            r#"
            [modules]
            postponed_update_ms = 1
            default_view = "kitchen"

            [presets]
            readonly_policy = "sometimes"
            "#,
        );
        let (config, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.postponed_update_ms, constants::DEFAULT_POSTPONED_UPDATE_MS);
        assert_eq!(config.default_view, View::Lighttable);
        assert_eq!(config.readonly_policy, ReadonlyPolicy::Overwrite);
    }

    #[test]
    fn test_unparseable_config_warns() {
        let dir = write_config("[modules\npostponed_update_ms = ");
        let (_, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Config parse error"));
    }
}
