// PanelDock - modules/image_information.rs
//
// Image information module: a metadata table for the current image. Which
// rows are shown is its parameter set, and it ships an auto-apply preset so
// the table layout is restored on every image load.

use crate::app::module::{LibModule, ModuleContext};
use crate::core::model::{PanelContainer, ViewSet};
use crate::core::preset::BuiltinPreset;
use crate::util::error::ModuleError;
use serde::{Deserialize, Serialize};
use std::any::Any;

pub const NAME: &str = "image_information";

/// One row of the information table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoField {
    Filename,
    Dimensions,
    Exposure,
    Lens,
    Profile,
    View,
}

impl InfoField {
    pub fn all() -> &'static [InfoField] {
        &[
            InfoField::Filename,
            InfoField::Dimensions,
            InfoField::Exposure,
            InfoField::Lens,
            InfoField::Profile,
            InfoField::View,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            InfoField::Filename => "filename",
            InfoField::Dimensions => "dimensions",
            InfoField::Exposure => "exposure",
            InfoField::Lens => "lens",
            InfoField::Profile => "input profile",
            InfoField::View => "view",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoParams {
    pub fields: Vec<InfoField>,
}

impl Default for InfoParams {
    fn default() -> Self {
        Self {
            fields: InfoField::all().to_vec(),
        }
    }
}

/// Metadata of the demo image.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub exposure: String,
    pub lens: String,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            filename: "IMG_0042.CR3".to_string(),
            width: 6000,
            height: 4000,
            exposure: "1/250 f/5.6 ISO 200".to_string(),
            lens: "EF 24-70mm f/2.8L".to_string(),
        }
    }
}

pub struct ImageInformationModule {
    params: InfoParams,
    image: ImageMetadata,
}

impl ImageInformationModule {
    pub fn new() -> Self {
        Self {
            params: InfoParams {
                fields: vec![InfoField::Filename],
            },
            image: ImageMetadata::default(),
        }
    }

    pub fn create() -> Box<dyn LibModule> {
        Box::new(Self::new())
    }

    pub fn fields(&self) -> &[InfoField] {
        &self.params.fields
    }

    fn value(&self, field: InfoField, ctx: &mut ModuleContext<'_>) -> String {
        match field {
            InfoField::Filename => self.image.filename.clone(),
            InfoField::Dimensions => format!("{} x {}", self.image.width, self.image.height),
            InfoField::Exposure => self.image.exposure.clone(),
            InfoField::Lens => self.image.lens.clone(),
            InfoField::Profile => {
                if ctx.proxy().histogram.is_linear() {
                    "linear".to_string()
                } else {
                    "display-referred".to_string()
                }
            }
            InfoField::View => ctx.view().label().to_string(),
        }
    }
}

impl Default for ImageInformationModule {
    fn default() -> Self {
        Self::new()
    }
}

impl LibModule for ImageInformationModule {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> String {
        "Image information".to_string()
    }

    fn views(&self) -> ViewSet {
        ViewSet::All
    }

    fn container(&self) -> PanelContainer {
        PanelContainer::Left
    }

    fn position(&self) -> i32 {
        250
    }

    fn gui(&mut self, ui: &mut egui::Ui, ctx: &mut ModuleContext<'_>) {
        egui::Grid::new("image_information_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for field in self.params.fields.clone() {
                    ui.weak(field.label());
                    ui.label(self.value(field, ctx));
                    ui.end_row();
                }
            });

        ui.menu_button("fields", |ui| {
            for field in InfoField::all() {
                let mut on = self.params.fields.contains(field);
                if ui.checkbox(&mut on, field.label()).changed() {
                    if on {
                        self.params.fields.push(*field);
                    } else {
                        self.params.fields.retain(|f| f != field);
                    }
                }
            }
        });
    }

    fn gui_reset(&mut self) {
        self.params = InfoParams::default();
    }

    fn params(&self) -> Option<Vec<u8>> {
        serde_json::to_vec(&self.params).ok()
    }

    fn set_params(&mut self, params: &[u8]) -> Result<(), ModuleError> {
        self.params = serde_json::from_slice(params).map_err(|e| ModuleError::InvalidParams {
            name: NAME.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn builtin_presets(&self) -> Vec<BuiltinPreset> {
        let all = serde_json::to_vec(&InfoParams::default()).unwrap_or_default();
        let minimal = serde_json::to_vec(&InfoParams {
            fields: vec![InfoField::Filename, InfoField::Exposure],
        })
        .unwrap_or_default();
        vec![
            BuiltinPreset::new("all fields", all)
                .with_description("every metadata row")
                .with_autoapply(true),
            BuiltinPreset::new("minimal", minimal).with_description("filename and exposure"),
        ]
    }

    fn preset_autoapply(&self) -> bool {
        true
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
