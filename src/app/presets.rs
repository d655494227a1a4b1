// PanelDock - app/presets.rs
//
// Preset store adapter: the single reader/writer of the preset store.
// Applies naming rules, collision checks and the configured read-only
// policy on top of a plain key-value `PresetStore`.
//
// Applying a preset needs the live module and therefore lives on the
// registry (`Registry::apply_preset`); everything else is here.

use crate::app::preset_store::PresetStore;
use crate::core::preset::{self, BuiltinPreset, Preset, PresetKey, ReadonlyPolicy};
use crate::util::error::PresetError;
use chrono::Utc;

/// CRUD over named parameter blobs per module and version.
pub struct PresetAdapter {
    store: Box<dyn PresetStore>,
    policy: ReadonlyPolicy,
}

impl PresetAdapter {
    pub fn new(store: Box<dyn PresetStore>, policy: ReadonlyPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> ReadonlyPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ReadonlyPolicy) {
        self.policy = policy;
    }

    pub fn get(&self, name: &str, module: &str, version: i32) -> Option<Preset> {
        self.store.get(&PresetKey::new(name, module, version))
    }

    /// Presets for one module version, ordered by name.
    pub fn list(&self, module: &str, version: i32) -> Vec<Preset> {
        self.store.list(module, Some(version))
    }

    /// Presets for every version of `module`.
    pub fn list_all_versions(&self, module: &str) -> Vec<Preset> {
        self.store.list(module, None)
    }

    /// Insert or replace the preset (module, version, name).
    ///
    /// Replacing resets the description and auto-apply flag. Under the
    /// `Refuse` policy an existing read-only preset is not overwritten.
    pub fn add_or_replace(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
        params: &[u8],
        readonly: bool,
    ) -> Result<(), PresetError> {
        preset::validate(name, params)?;
        let key = PresetKey::new(name, module, version);
        if let Some(existing) = self.store.get(&key) {
            self.policy.check(&existing)?;
        }

        self.store.put(Preset::new(key, params.to_vec(), readonly))?;
        tracing::info!(
            preset = name,
            module,
            version,
            size = params.len(),
            readonly,
            "Preset stored"
        );
        Ok(())
    }

    /// Store a new writable preset with its description in one write.
    ///
    /// Unlike `add_or_replace` an existing preset of the same name is never
    /// touched; the caller gets `NameCollision` instead.
    pub fn create(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
        description: &str,
        params: &[u8],
    ) -> Result<(), PresetError> {
        preset::validate(name, params)?;
        let key = PresetKey::new(name, module, version);
        if self.store.contains(&key) {
            return Err(PresetError::NameCollision {
                module: module.to_string(),
                version,
                name: name.to_string(),
            });
        }

        let mut record = Preset::new(key, params.to_vec(), false);
        record.description = description.to_string();
        self.store.put(record)?;
        tracing::info!(preset = name, module, version, size = params.len(), "Preset created");
        Ok(())
    }

    /// Install a module-shipped preset, read-only, regardless of policy.
    pub(crate) fn install_builtin(
        &mut self,
        module: &str,
        version: i32,
        builtin: BuiltinPreset,
    ) -> Result<(), PresetError> {
        preset::validate(&builtin.name, &builtin.params)?;
        let mut record = Preset::new(
            PresetKey::new(&builtin.name, module, version),
            builtin.params,
            true,
        );
        record.description = builtin.description;
        record.autoapply = builtin.autoapply;
        self.store.put(record)
    }

    /// Store a preset record as-is (used for legacy upgrades).
    pub(crate) fn put_record(&mut self, preset: Preset) -> Result<(), PresetError> {
        self.store.put(preset)
    }

    /// Clone a preset under the first free `"{name}_{n}"` name.
    ///
    /// The copy is writable and not auto-applied.
    pub fn duplicate(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
    ) -> Result<String, PresetError> {
        let key = PresetKey::new(name, module, version);
        let source = self.store.get(&key).ok_or_else(|| not_found(&key))?;

        let new_name = preset::disambiguate(name, |candidate| {
            self.store.contains(&key.renamed(candidate))
        })
        .ok_or_else(|| PresetError::NameCollision {
            module: module.to_string(),
            version,
            name: name.to_string(),
        })?;

        let mut copy = source;
        copy.key = key.renamed(&new_name);
        copy.readonly = false;
        copy.autoapply = false;
        copy.modified = Utc::now();
        self.store.put(copy)?;

        tracing::info!(preset = name, copy = %new_name, module, version, "Preset duplicated");
        Ok(new_name)
    }

    /// Delete a preset. Removing a missing preset is a no-op.
    pub fn remove(&mut self, name: &str, module: &str, version: i32) -> Result<(), PresetError> {
        let key = PresetKey::new(name, module, version);
        let Some(existing) = self.store.get(&key) else {
            tracing::debug!(preset = name, module, version, "Remove of missing preset ignored");
            return Ok(());
        };
        self.policy.check(&existing)?;
        self.store.delete(&key)?;
        tracing::info!(preset = name, module, version, "Preset removed");
        Ok(())
    }

    /// Rename, redescribe and reparametrise a preset in place.
    ///
    /// `new_name` equal to a different existing preset is a collision and
    /// leaves both presets untouched.
    pub fn update(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
        new_name: &str,
        new_description: &str,
        new_params: &[u8],
    ) -> Result<(), PresetError> {
        preset::validate(new_name, new_params)?;
        let key = PresetKey::new(name, module, version);
        let existing = self.store.get(&key).ok_or_else(|| not_found(&key))?;
        self.policy.check(&existing)?;

        let new_key = key.renamed(new_name);
        if new_key != key && self.store.contains(&new_key) {
            return Err(PresetError::NameCollision {
                module: module.to_string(),
                version,
                name: new_name.to_string(),
            });
        }

        let mut updated = existing;
        updated.key = new_key;
        updated.description = new_description.to_string();
        updated.params = new_params.to_vec();
        updated.modified = Utc::now();
        self.store.replace(&key, updated)?;

        tracing::info!(preset = name, new_name, module, version, "Preset updated");
        Ok(())
    }

    /// Mark a preset eligible (or not) for auto-apply.
    pub fn set_autoapply(
        &mut self,
        name: &str,
        module: &str,
        version: i32,
        autoapply: bool,
    ) -> Result<(), PresetError> {
        let key = PresetKey::new(name, module, version);
        let mut existing = self.store.get(&key).ok_or_else(|| not_found(&key))?;
        self.policy.check(&existing)?;
        existing.autoapply = autoapply;
        existing.modified = Utc::now();
        self.store.put(existing)
    }

    /// Drop a stale preset after its upgraded copy was stored.
    pub(crate) fn delete_key(&mut self, key: &PresetKey) -> Result<bool, PresetError> {
        self.store.delete(key)
    }
}

fn not_found(key: &PresetKey) -> PresetError {
    PresetError::NotFound {
        module: key.module.clone(),
        version: key.version,
        name: key.name.clone(),
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::preset_store::MemoryPresetStore;

    fn adapter(policy: ReadonlyPolicy) -> PresetAdapter {
        PresetAdapter::new(Box::new(MemoryPresetStore::new()), policy)
    }

    #[test]
    fn test_add_then_get_returns_exact_params() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("p", "mod", 1, &[1, 2, 3], false).unwrap();
        let p = a.get("p", "mod", 1).unwrap();
        assert_eq!(p.params, vec![1, 2, 3]);
        assert_eq!(p.params_size(), 3);
        assert!(a.get("p", "mod", 2).is_none());
    }

    #[test]
    fn test_replace_overwrites_readonly_under_overwrite_policy() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("p", "mod", 1, &[1], true).unwrap();
        a.add_or_replace("p", "mod", 1, &[2], false).unwrap();
        let p = a.get("p", "mod", 1).unwrap();
        assert_eq!(p.params, vec![2]);
        assert!(!p.readonly);
    }

    #[test]
    fn test_replace_refused_for_readonly_under_refuse_policy() {
        let mut a = adapter(ReadonlyPolicy::Refuse);
        a.add_or_replace("p", "mod", 1, &[1], true).unwrap();
        let err = a.add_or_replace("p", "mod", 1, &[2], false).unwrap_err();
        assert!(matches!(err, PresetError::ReadOnly { .. }));
        assert_eq!(a.get("p", "mod", 1).unwrap().params, vec![1]);
    }

    #[test]
    fn test_create_sets_description_and_rejects_taken_name() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.create("p", "mod", 1, "soft look", &[1]).unwrap();
        let p = a.get("p", "mod", 1).unwrap();
        assert_eq!(p.description, "soft look");
        assert!(!p.readonly);

        a.add_or_replace("factory", "mod", 1, &[4], true).unwrap();
        let err = a.create("factory", "mod", 1, "", &[9]).unwrap_err();
        assert!(matches!(err, PresetError::NameCollision { .. }));
        let factory = a.get("factory", "mod", 1).unwrap();
        assert_eq!(factory.params, vec![4]);
        assert!(factory.readonly);
    }

    #[test]
    fn test_duplicate_then_remove_original_leaves_copy() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("p", "mod", 1, &[5], true).unwrap();
        let copy = a.duplicate("p", "mod", 1).unwrap();
        assert_eq!(copy, "p_1");
        a.remove("p", "mod", 1).unwrap();

        let left = a.list("mod", 1);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].key.name, "p_1");
        assert_eq!(left[0].params, vec![5]);
        assert!(!left[0].readonly);
    }

    #[test]
    fn test_duplicate_never_collides() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("p", "mod", 1, &[1], false).unwrap();
        a.add_or_replace("p_1", "mod", 1, &[2], false).unwrap();
        assert_eq!(a.duplicate("p", "mod", 1).unwrap(), "p_2");
        assert_eq!(a.get("p_1", "mod", 1).unwrap().params, vec![2]);
    }

    #[test]
    fn test_duplicate_missing_is_not_found() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        assert!(matches!(
            a.duplicate("nope", "mod", 1),
            Err(PresetError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut a = adapter(ReadonlyPolicy::Refuse);
        assert!(a.remove("ghost", "mod", 1).is_ok());
    }

    #[test]
    fn test_update_collision_keeps_both_presets() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("a", "mod", 1, &[1], false).unwrap();
        a.add_or_replace("b", "mod", 1, &[2], false).unwrap();
        let err = a.update("a", "mod", 1, "b", "desc", &[9]).unwrap_err();
        assert!(matches!(err, PresetError::NameCollision { .. }));
        assert_eq!(a.get("a", "mod", 1).unwrap().params, vec![1]);
        assert_eq!(a.get("b", "mod", 1).unwrap().params, vec![2]);
    }

    #[test]
    fn test_update_renames_and_reparametrises() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("a", "mod", 1, &[1], false).unwrap();
        a.update("a", "mod", 1, "c", "contrasty", &[7, 7]).unwrap();
        assert!(a.get("a", "mod", 1).is_none());
        let c = a.get("c", "mod", 1).unwrap();
        assert_eq!(c.description, "contrasty");
        assert_eq!(c.params, vec![7, 7]);
    }

    #[test]
    fn test_update_same_name_only_changes_params() {
        let mut a = adapter(ReadonlyPolicy::Overwrite);
        a.add_or_replace("a", "mod", 1, &[1], false).unwrap();
        a.update("a", "mod", 1, "a", "", &[3]).unwrap();
        assert_eq!(a.list("mod", 1).len(), 1);
        assert_eq!(a.get("a", "mod", 1).unwrap().params, vec![3]);
    }

    #[test]
    fn test_builtin_install_ignores_refuse_policy() {
        let mut a = adapter(ReadonlyPolicy::Refuse);
        a.install_builtin("mod", 1, BuiltinPreset::new("factory", vec![1]))
            .unwrap();
        a.install_builtin("mod", 1, BuiltinPreset::new("factory", vec![2]).with_autoapply(true))
            .unwrap();
        let p = a.get("factory", "mod", 1).unwrap();
        assert!(p.readonly);
        assert!(p.autoapply);
        assert_eq!(p.params, vec![2]);
    }
}
