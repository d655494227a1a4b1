// PanelDock - core/mod.rs
//
// Core logic layer: data model, visibility resolution, preset rules,
// deferred-update queue and proxy broker.
// Must NOT depend on: ui, platform, app.

pub mod deferred;
pub mod model;
pub mod preset;
pub mod proxy;
pub mod visibility;
