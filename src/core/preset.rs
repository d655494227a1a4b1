// PanelDock - core/preset.rs
//
// Preset data model and pure naming rules.
//
// A preset is a named, versioned snapshot of a module's parameter blob,
// identified by the (module, version, name) triple. Storage lives in the app
// layer; this file only defines the shapes and the rules they obey.

use crate::util::constants::{MAX_DUPLICATE_SUFFIX, MAX_PRESET_NAME_LEN, MAX_PRESET_PARAMS_SIZE};
use crate::util::error::PresetError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Preset key and record
// =============================================================================

/// Unique identity of a preset.
///
/// Ordering is (module, version, name) so that all presets of one module
/// version are contiguous in ordered stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresetKey {
    pub module: String,
    pub version: i32,
    pub name: String,
}

impl PresetKey {
    pub fn new(name: &str, module: &str, version: i32) -> Self {
        Self {
            module: module.to_string(),
            version,
            name: name.to_string(),
        }
    }

    /// Same module and version, different preset name.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            module: self.module.clone(),
            version: self.version,
            name: name.to_string(),
        }
    }
}

/// A stored preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub key: PresetKey,

    /// Opaque parameter blob; its length is the parameter size.
    pub params: Vec<u8>,

    /// Free-form description shown in the presets menu.
    #[serde(default)]
    pub description: String,

    /// Read-only presets are shipped by modules. Whether programmatic
    /// overwrite honours the flag is decided by `ReadonlyPolicy`.
    #[serde(default)]
    pub readonly: bool,

    /// Eligible for the auto-apply pass at image-load time.
    #[serde(default)]
    pub autoapply: bool,

    /// Last time the preset was written.
    pub modified: DateTime<Utc>,
}

impl Preset {
    pub fn new(key: PresetKey, params: Vec<u8>, readonly: bool) -> Self {
        Self {
            key,
            params,
            description: String::new(),
            readonly,
            autoapply: false,
            modified: Utc::now(),
        }
    }

    /// Size of the parameter blob in bytes.
    pub fn params_size(&self) -> usize {
        self.params.len()
    }
}

/// A preset a module ships with; installed read-only when the module loads.
#[derive(Debug, Clone)]
pub struct BuiltinPreset {
    pub name: String,
    pub description: String,
    pub params: Vec<u8>,
    pub autoapply: bool,
}

impl BuiltinPreset {
    pub fn new(name: &str, params: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            params,
            autoapply: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_autoapply(mut self, autoapply: bool) -> Self {
        self.autoapply = autoapply;
        self
    }
}

// =============================================================================
// Read-only policy
// =============================================================================

/// How programmatic writes treat presets flagged read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadonlyPolicy {
    /// Read-only is advisory (menus disable edit/delete); writes always go through.
    #[default]
    Overwrite,
    /// Writes, renames and removals of read-only presets are refused.
    Refuse,
}

impl ReadonlyPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "refuse" => Some(Self::Refuse),
            _ => None,
        }
    }

    /// Check whether a write to `existing` is permitted.
    pub fn check(&self, existing: &Preset) -> Result<(), PresetError> {
        if existing.readonly && *self == Self::Refuse {
            return Err(PresetError::ReadOnly {
                module: existing.key.module.clone(),
                name: existing.key.name.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Validation and naming
// =============================================================================

/// Reject empty or oversized names and oversized parameter blobs.
pub fn validate(name: &str, params: &[u8]) -> Result<(), PresetError> {
    if name.trim().is_empty() {
        return Err(PresetError::EmptyName);
    }
    let chars = name.chars().count();
    if chars > MAX_PRESET_NAME_LEN {
        return Err(PresetError::TooLarge {
            what: "name length",
            size: chars,
            max: MAX_PRESET_NAME_LEN,
        });
    }
    if params.len() > MAX_PRESET_PARAMS_SIZE {
        return Err(PresetError::TooLarge {
            what: "parameter size",
            size: params.len(),
            max: MAX_PRESET_PARAMS_SIZE,
        });
    }
    Ok(())
}

/// Find the first free `"{base}_{n}"` name (n starting at 1).
///
/// `taken` reports whether a candidate already exists for the same module and
/// version. Returns `None` only if every suffix up to the limit is taken.
pub fn disambiguate(base: &str, taken: impl Fn(&str) -> bool) -> Option<String> {
    (1..=MAX_DUPLICATE_SUFFIX)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disambiguate_skips_taken_suffixes() {
        let taken = ["soft_1", "soft_2"];
        let name = disambiguate("soft", |c| taken.contains(&c));
        assert_eq!(name.as_deref(), Some("soft_3"));
    }

    #[test]
    fn test_disambiguate_first_candidate() {
        assert_eq!(disambiguate("x", |_| false).as_deref(), Some("x_1"));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(matches!(validate("   ", &[]), Err(PresetError::EmptyName)));
    }

    #[test]
    fn test_validate_rejects_oversized_params() {
        let big = vec![0u8; MAX_PRESET_PARAMS_SIZE + 1];
        assert!(matches!(
            validate("big", &big),
            Err(PresetError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_refuse_policy_blocks_readonly_only() {
        let mut preset = Preset::new(PresetKey::new("p", "m", 1), vec![1], true);
        assert!(ReadonlyPolicy::Refuse.check(&preset).is_err());
        assert!(ReadonlyPolicy::Overwrite.check(&preset).is_ok());
        preset.readonly = false;
        assert!(ReadonlyPolicy::Refuse.check(&preset).is_ok());
    }

    #[test]
    fn test_policy_from_name() {
        assert_eq!(ReadonlyPolicy::from_name("Refuse"), Some(ReadonlyPolicy::Refuse));
        assert_eq!(ReadonlyPolicy::from_name("overwrite"), Some(ReadonlyPolicy::Overwrite));
        assert_eq!(ReadonlyPolicy::from_name("maybe"), None);
    }
}
