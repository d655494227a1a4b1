// PanelDock - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "PanelDock";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "PanelDock";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Module limits
// =============================================================================

/// Maximum length of a module's stable plugin name, in bytes.
///
/// Names are persisted as layout and preset keys; anything longer is a load
/// failure for that module.
pub const MAX_MODULE_NAME_LEN: usize = 127;

/// Maximum number of modules the registry will load.
pub const MAX_MODULES: usize = 256;

// =============================================================================
// Deferred updates
// =============================================================================

/// Default debounce delay before a postponed module update fires (ms).
pub const DEFAULT_POSTPONED_UPDATE_MS: u64 = 500;

/// Minimum user-configurable postponed update delay (ms).
pub const MIN_POSTPONED_UPDATE_MS: u64 = 10;

/// Maximum user-configurable postponed update delay (ms).
pub const MAX_POSTPONED_UPDATE_MS: u64 = 5_000;

// =============================================================================
// Presets
// =============================================================================

/// Maximum length of a preset name, in characters.
pub const MAX_PRESET_NAME_LEN: usize = 255;

/// Maximum size of a single preset parameter blob, in bytes.
pub const MAX_PRESET_PARAMS_SIZE: usize = 1024 * 1024; // 1 MiB

/// Upper bound on the numeric suffix tried when disambiguating a duplicate.
pub const MAX_DUPLICATE_SUFFIX: u32 = 10_000;

/// Highest number of chained `legacy_params` upgrades attempted per preset.
pub const MAX_LEGACY_UPGRADE_STEPS: usize = 32;

// =============================================================================
// Colorpicker
// =============================================================================

/// Number of channels in each picked colour buffer (RGB or Lab).
pub const PICKER_CHANNELS: usize = 3;

/// Maximum number of live samples kept by the colorpicker proxy.
pub const MAX_LIVE_SAMPLES: usize = 64;

// =============================================================================
// Pipeline (demo host)
// =============================================================================

/// How often the demo pipeline thread produces a new frame (ms).
pub const PIPELINE_FRAME_INTERVAL_MS: u64 = 250;

/// How often the pipeline thread checks its cancel flag while sleeping (ms).
pub const PIPELINE_CANCEL_CHECK_INTERVAL_MS: u64 = 50;

/// Width of the synthetic frames produced by the demo pipeline.
pub const PIPELINE_FRAME_WIDTH: usize = 320;

/// Height of the synthetic frames produced by the demo pipeline.
pub const PIPELINE_FRAME_HEIGHT: usize = 200;

/// Frames between switches of the synthetic input profile (display-referred
/// to linear and back), so the histogram's linearity flag is exercised.
pub const PIPELINE_PROFILE_SWITCH_FRAMES: u64 = 16;

/// Number of histogram bins per channel.
pub const HISTOGRAM_BINS: usize = 256;

/// Maximum number of pipeline messages processed per UI frame.
pub const MAX_PIPELINE_MESSAGES_PER_FRAME: usize = 32;

// =============================================================================
// UI defaults
// =============================================================================

/// Default UI body font size in points.
pub const DEFAULT_FONT_SIZE: f32 = 14.5;

/// Minimum user-configurable UI font size (points).
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Maximum user-configurable UI font size (points).
pub const MAX_FONT_SIZE: f32 = 24.0;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration and persistence
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Panel layout persistence file name (stored in the platform data directory).
pub const LAYOUT_FILE_NAME: &str = "layout.json";

/// Preset database file name (stored in the platform data directory).
pub const PRESETS_FILE_NAME: &str = "presets.json";
