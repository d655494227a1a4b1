// PanelDock - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every failure is contained to the module or preset operation that produced
// it; nothing here is fatal to the host application.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all PanelDock operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum PanelError {
    /// A module failed to load or rejected an operation.
    Module(ModuleError),

    /// A preset operation failed.
    Preset(PresetError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(e) => write!(f, "Module error: {e}"),
            Self::Preset(e) => write!(f, "Preset error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for PanelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Module(e) => Some(e),
            Self::Preset(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Module errors
// ---------------------------------------------------------------------------

/// Errors raised while loading a module or driving one of its hooks.
#[derive(Debug)]
pub enum ModuleError {
    /// The module reported an empty plugin name.
    EmptyName,

    /// The plugin name exceeds the persisted key limit.
    NameTooLong {
        name: String,
        length: usize,
        max_length: usize,
    },

    /// Another loaded module already uses this plugin name.
    DuplicateName { name: String },

    /// The registry already holds its maximum number of modules.
    TooManyModules { max: usize },

    /// The module's own initialisation hook failed.
    InitFailed { name: String, reason: String },

    /// The module has no parameter set, so presets cannot be applied to it.
    ParamsUnsupported { name: String },

    /// The module could not decode a parameter blob.
    InvalidParams { name: String, reason: String },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Module reported an empty plugin name"),
            Self::NameTooLong {
                name,
                length,
                max_length,
            } => write!(
                f,
                "Module name '{name}' is {length} bytes, exceeds maximum of {max_length}"
            ),
            Self::DuplicateName { name } => {
                write!(f, "A module named '{name}' is already loaded")
            }
            Self::TooManyModules { max } => {
                write!(f, "Too many modules loaded, maximum is {max}")
            }
            Self::InitFailed { name, reason } => {
                write!(f, "Module '{name}' failed to initialise: {reason}")
            }
            Self::ParamsUnsupported { name } => {
                write!(f, "Module '{name}' does not support parameters")
            }
            Self::InvalidParams { name, reason } => {
                write!(f, "Module '{name}' rejected parameters: {reason}")
            }
        }
    }
}

impl std::error::Error for ModuleError {}

impl From<ModuleError> for PanelError {
    fn from(e: ModuleError) -> Self {
        Self::Module(e)
    }
}

// ---------------------------------------------------------------------------
// Preset errors
// ---------------------------------------------------------------------------

/// Errors related to preset storage and application.
#[derive(Debug)]
pub enum PresetError {
    /// No preset exists under (module, version, name).
    NotFound {
        module: String,
        version: i32,
        name: String,
    },

    /// The target module is not loaded.
    ModuleNotFound { module: String },

    /// The preset was saved for a different parameter schema version.
    SchemaMismatch {
        module: String,
        name: String,
        preset_version: i32,
        module_version: i32,
    },

    /// The requested name belongs to a different existing preset.
    NameCollision {
        module: String,
        version: i32,
        name: String,
    },

    /// The preset is read-only and the configured policy refuses the write.
    ReadOnly { module: String, name: String },

    /// Preset names must not be empty.
    EmptyName,

    /// The preset name or parameter blob exceeds a named limit.
    TooLarge {
        what: &'static str,
        size: usize,
        max: usize,
    },

    /// The module refused the parameter blob.
    Rejected(ModuleError),

    /// Reading or writing the preset database failed.
    StoreIo { path: PathBuf, source: io::Error },

    /// The preset database could not be (de)serialised.
    StoreJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound {
                module,
                version,
                name,
            } => write!(f, "No preset '{name}' for module '{module}' v{version}"),
            Self::ModuleNotFound { module } => {
                write!(f, "Module '{module}' is not loaded")
            }
            Self::SchemaMismatch {
                module,
                name,
                preset_version,
                module_version,
            } => write!(
                f,
                "Preset '{name}' is incompatible with '{module}': \
                 saved for v{preset_version}, module is v{module_version}"
            ),
            Self::NameCollision {
                module,
                version,
                name,
            } => write!(
                f,
                "A preset named '{name}' already exists for module '{module}' v{version}"
            ),
            Self::ReadOnly { module, name } => {
                write!(f, "Preset '{name}' of module '{module}' is read-only")
            }
            Self::EmptyName => write!(f, "Preset name must not be empty"),
            Self::TooLarge { what, size, max } => {
                write!(f, "Preset {what} is {size}, exceeds maximum of {max}")
            }
            Self::Rejected(e) => write!(f, "Preset rejected by module: {e}"),
            Self::StoreIo { path, source } => {
                write!(f, "Preset store I/O error '{}': {source}", path.display())
            }
            Self::StoreJson { path, source } => {
                write!(f, "Preset store format error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PresetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::StoreIo { source, .. } => Some(source),
            Self::StoreJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PresetError> for PanelError {
    fn from(e: PresetError) -> Self {
        Self::Preset(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for PanelError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for PanelDock results.
pub type Result<T> = std::result::Result<T, PanelError>;
