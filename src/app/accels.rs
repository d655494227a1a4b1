// PanelDock - app/accels.rs
//
// Common accelerator registration. The shortcut dispatcher itself is an
// external collaborator; the registry only announces each loaded module so
// the dispatcher can bind its "reset" and "presets" actions.

/// Actions every module gets a shortcut slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonAction {
    /// Restore the module's default parameters.
    Reset,
    /// Open the module's presets menu.
    Presets,
}

impl CommonAction {
    pub fn all() -> &'static [CommonAction] {
        &[CommonAction::Reset, CommonAction::Presets]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommonAction::Reset => "reset",
            CommonAction::Presets => "presets",
        }
    }
}

/// External shortcut dispatcher interface.
pub trait AcceleratorSink {
    /// Register the reset/presets shortcuts for `module`.
    fn connect_common_accels(&mut self, module: &str);
}

/// One registered shortcut slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelBinding {
    pub module: String,
    pub action: CommonAction,
    /// Dispatcher path, `"<module>/<action>"`.
    pub path: String,
}

/// Simple dispatcher table used by the demo host and tests.
#[derive(Debug, Default)]
pub struct AccelMap {
    bindings: Vec<AccelBinding>,
}

impl AccelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &[AccelBinding] {
        &self.bindings
    }

    /// Resolve a dispatcher path back to (module, action).
    pub fn resolve(&self, path: &str) -> Option<(&str, CommonAction)> {
        self.bindings
            .iter()
            .find(|b| b.path == path)
            .map(|b| (b.module.as_str(), b.action))
    }

    pub fn path_for(module: &str, action: CommonAction) -> String {
        format!("{module}/{}", action.name())
    }
}

impl AcceleratorSink for AccelMap {
    fn connect_common_accels(&mut self, module: &str) {
        for action in CommonAction::all() {
            let path = Self::path_for(module, *action);
            if self.bindings.iter().any(|b| b.path == path) {
                continue;
            }
            self.bindings.push(AccelBinding {
                module: module.to_string(),
                action: *action,
                path,
            });
        }
        tracing::debug!(module, "Common accelerators connected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_registers_reset_and_presets_once() {
        let mut map = AccelMap::new();
        map.connect_common_accels("histogram");
        map.connect_common_accels("histogram");
        assert_eq!(map.bindings().len(), 2);
        assert_eq!(
            map.resolve("histogram/reset"),
            Some(("histogram", CommonAction::Reset))
        );
        assert_eq!(
            map.resolve("histogram/presets"),
            Some(("histogram", CommonAction::Presets))
        );
        assert_eq!(map.resolve("colorpicker/reset"), None);
    }
}
