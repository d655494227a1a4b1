// PanelDock - lib.rs
//
// Library entry point, exposing the panel framework and the built-in
// modules for integration testing and embedding in other hosts.
//
// The GUI-specific `gui` module lives in `main.rs` and is not part of the
// library surface.

pub mod app;
pub mod core;
pub mod modules;
pub mod platform;
pub mod ui;
pub mod util;
