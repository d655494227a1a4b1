// PanelDock - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading and logging initialisation (debug mode support)
// 3. Preset database, saved layout and module registry setup
// 4. eframe GUI launch

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod gui;

// Re-export modules from the library crate so that `gui.rs` and other
// binary-side code can still use `crate::app::...`, `crate::core::...` etc.
pub use paneldock::app;

pub use paneldock::core;
pub use paneldock::modules;
pub use paneldock::platform;
pub use paneldock::ui;
pub use paneldock::util;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Configure fonts for the egui context.
///
/// On Windows, loads Segoe UI and Segoe UI Symbol from the system font
/// directory as the primary proportional fonts so arrows and other symbols
/// used in module headers render. The built-in egui fonts are kept as final
/// fallbacks so no glyph is ever lost.
///
/// On non-Windows platforms the egui defaults are used unchanged.
fn configure_fonts(ctx: &egui::Context) {
    #[cfg(target_os = "windows")]
    {
        let mut fonts = egui::FontDefinitions::default();

        let candidates: &[(&str, &str)] = &[
            ("Segoe UI", r"C:\Windows\Fonts\segoeui.ttf"),
            ("Segoe UI Symbol", r"C:\Windows\Fonts\seguisym.ttf"),
        ];

        let mut loaded_names: Vec<&str> = Vec::new();
        for (name, path) in candidates {
            match std::fs::read(path) {
                Ok(data) => {
                    fonts
                        .font_data
                        .insert((*name).to_owned(), egui::FontData::from_owned(data).into());
                    loaded_names.push(name);
                    tracing::debug!(font = name, "Loaded Windows system font");
                }
                Err(e) => {
                    tracing::warn!(
                        font = name,
                        error = %e,
                        "Failed to load Windows system font; some symbols may render as squares"
                    );
                }
            }
        }

        if !loaded_names.is_empty() {
            if let Some(proportional) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
                for (i, name) in loaded_names.iter().enumerate() {
                    proportional.insert(i, (*name).to_owned());
                }
            }
            if let Some(monospace) = fonts.families.get_mut(&egui::FontFamily::Monospace) {
                for name in &loaded_names {
                    monospace.push((*name).to_owned());
                }
            }

            ctx.set_fonts(fonts);
            tracing::info!(fonts = ?loaded_names, "Windows system fonts configured");
        }
    }

    #[cfg(not(target_os = "windows"))]
    let _ = ctx;
}

/// PanelDock - Dockable side-panel modules with presets.
///
/// Hosts the built-in histogram, color picker and image information modules
/// in per-view side panels, fed by a synthetic image pipeline.
#[derive(Parser, Debug)]
#[command(name = "PanelDock", version, about)]
struct Cli {
    /// View to open (lighttable, darkroom, tethering, map, slideshow, print).
    #[arg(short = 'v', long = "view")]
    view: Option<String>,

    /// Preset database to use instead of the platform default.
    #[arg(short = 'p', long = "presets")]
    presets: Option<PathBuf>,

    /// Start without the demo image pipeline.
    #[arg(long = "no-pipeline")]
    no_pipeline: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    // Resolve platform paths and read config.toml before logging so the
    // configured level and file take effect from the first message.
    let platform_paths = platform::config::PlatformPaths::resolve();
    let (config, config_warnings) = platform::config::load_config(&platform_paths.config_dir);

    util::logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref().map(std::path::Path::new),
    );

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "PanelDock starting"
    );
    for w in &config_warnings {
        tracing::warn!(warning = %w, "Config warning");
    }
    let mut warnings = config_warnings;

    // Preset database: CLI override > config override > platform default.
    let presets_path = cli
        .presets
        .clone()
        .or_else(|| config.presets_database.clone())
        .unwrap_or_else(|| platform_paths.presets_path());
    let (store, store_warning) = app::preset_store::JsonPresetStore::open(&presets_path);
    warnings.extend(store_warning);

    let layout_path = platform_paths.layout_path();
    let layout = app::layout::load(&layout_path).unwrap_or_default();

    // Startup view: CLI > last saved view > config default.
    let cli_view = cli.view.as_deref().and_then(|name| {
        let view = core::model::View::from_name(name);
        if view.is_none() {
            let msg = format!("Unknown view '{name}' on the command line, ignored.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
        }
        view
    });
    let view = cli_view
        .or(layout.last_view)
        .unwrap_or(config.default_view);

    let registry_config = app::registry::RegistryConfig {
        view,
        postponed_delay: Duration::from_millis(config.postponed_update_ms),
        readonly_policy: config.readonly_policy,
    };
    let mut registry = app::registry::Registry::new(registry_config, Box::new(store), layout);
    let mut accels = app::accels::AccelMap::new();

    let load_errors = registry.initialize(&modules::builtin_catalog(), &mut accels);
    for err in &load_errors {
        warnings.push(err.to_string());
    }

    let report = registry.autoapply_presets();
    for key in &report.stale {
        warnings.push(format!(
            "Auto-apply preset '{}' of {} was saved for version {}; skipped.",
            key.name, key.module, key.version
        ));
    }

    tracing::info!(
        modules = registry.len(),
        view = %view,
        "Ready to launch GUI"
    );

    let mut state = app::state::AppState::new(registry, accels, config, layout_path, cli.debug);
    state.warnings = warnings;
    state.pipeline_enabled = !cli.no_pipeline;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!(
                "{} v{}",
                util::constants::APP_NAME,
                util::constants::APP_VERSION
            ))
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        util::constants::APP_NAME,
        native_options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Ok(Box::new(gui::PanelDockApp::new(state)))
        }),
    );

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to launch GUI");
        eprintln!("Error: Failed to launch PanelDock GUI: {e}");
        std::process::exit(1);
    }
}
