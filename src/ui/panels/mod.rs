// PanelDock - ui/panels/mod.rs

pub mod about;
pub mod modules;
pub mod options;
pub mod overlay;
pub mod presets;
pub mod views;
pub mod warnings;
