// PanelDock - modules/mod.rs
//
// Built-in module set. `builtin_catalog` is the discovery interface the
// registry loads at startup.
// Dependencies: app (module trait), core.

pub mod colorpicker;
pub mod histogram;
pub mod image_information;

use crate::app::module::ModuleFactory;

/// Every module shipped with the application.
pub fn builtin_catalog() -> Vec<ModuleFactory> {
    vec![
        ModuleFactory::new(histogram::NAME, histogram::HistogramModule::create),
        ModuleFactory::new(colorpicker::NAME, colorpicker::ColorpickerModule::create),
        ModuleFactory::new(
            image_information::NAME,
            image_information::ImageInformationModule::create,
        ),
    ]
}
