// PanelDock - app/mod.rs
//
// Application layer: module registry and lifecycle, preset adapter and
// store, layout persistence, accelerators, the demo image pipeline and the
// GUI-facing state.
// Dependencies: core layer, platform config (read-only).
// Must NOT depend on: ui.

pub mod accels;
pub mod layout;
pub mod module;
pub mod pipeline;
pub mod preset_store;
pub mod presets;
pub mod registry;
pub mod state;
