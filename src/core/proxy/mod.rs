// PanelDock - core/proxy/mod.rs
//
// Proxy broker: capability channels that let the active view and the image
// pipeline reach whichever module currently provides a cross-cutting
// capability, without static knowledge of each other.
//
// One `ProxyContext` is owned by the registry for the application lifetime
// and passed explicitly to modules; `PipelineProxy` is the thread-safe subset
// handed to background producers.

pub mod colorpicker;
pub mod histogram;

use crate::core::model::ModuleHandle;
use colorpicker::{ColorpickerFeed, ColorpickerProxy};
use histogram::HistogramProxy;

/// All proxy state, owned by the registry.
#[derive(Default)]
pub struct ProxyContext {
    pub colorpicker: ColorpickerProxy,
    pub histogram: HistogramProxy,
}

impl ProxyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread-safe handles for the image pipeline.
    pub fn pipeline(&self) -> PipelineProxy {
        PipelineProxy {
            colorpicker: self.colorpicker.feed(),
            histogram: self.histogram.clone(),
        }
    }

    /// Drop every capability `module` currently owns.
    pub fn release_all(&mut self, module: ModuleHandle) {
        self.colorpicker.release(module);
        self.histogram.release(module);
    }
}

/// Producer-side proxy handles (Clone + Send + Sync).
#[derive(Clone)]
pub struct PipelineProxy {
    pub colorpicker: ColorpickerFeed,
    pub histogram: HistogramProxy,
}
