// PanelDock - app/preset_store.rs
//
// Preset persistence backends. The store is a plain key-value map keyed by
// (module, version, name); all policy (read-only handling, collisions,
// naming) lives in `presets::PresetAdapter`, which is the store's only user.
//
// `JsonPresetStore` keeps the whole database in memory and rewrites the file
// atomically (write temp, rename) after every mutation, so a crash never
// leaves a half-written database behind.

use crate::core::preset::{Preset, PresetKey};
use crate::util::error::PresetError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version stamp of the on-disk preset database.
pub const PRESET_DB_VERSION: u32 = 1;

/// External preset persistence interface.
pub trait PresetStore {
    fn get(&self, key: &PresetKey) -> Option<Preset>;

    fn contains(&self, key: &PresetKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace by key.
    fn put(&mut self, preset: Preset) -> Result<(), PresetError>;

    /// Delete by key. Returns Ok(false) when nothing was stored.
    fn delete(&mut self, key: &PresetKey) -> Result<bool, PresetError>;

    /// Remove `old` and store `preset` in one step.
    fn replace(&mut self, old: &PresetKey, preset: Preset) -> Result<(), PresetError> {
        self.delete(old)?;
        self.put(preset)
    }

    /// Presets of `module`, restricted to `version` when given, ordered by
    /// (version, name).
    fn list(&self, module: &str, version: Option<i32>) -> Vec<Preset>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Volatile store; also the in-memory image of `JsonPresetStore`.
#[derive(Debug, Default, Clone)]
pub struct MemoryPresetStore {
    presets: BTreeMap<PresetKey, Preset>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    fn all(&self) -> Vec<Preset> {
        self.presets.values().cloned().collect()
    }
}

impl PresetStore for MemoryPresetStore {
    fn get(&self, key: &PresetKey) -> Option<Preset> {
        self.presets.get(key).cloned()
    }

    fn contains(&self, key: &PresetKey) -> bool {
        self.presets.contains_key(key)
    }

    fn put(&mut self, preset: Preset) -> Result<(), PresetError> {
        self.presets.insert(preset.key.clone(), preset);
        Ok(())
    }

    fn delete(&mut self, key: &PresetKey) -> Result<bool, PresetError> {
        Ok(self.presets.remove(key).is_some())
    }

    fn list(&self, module: &str, version: Option<i32>) -> Vec<Preset> {
        self.presets
            .values()
            .filter(|p| p.key.module == module)
            .filter(|p| version.map_or(true, |v| p.key.version == v))
            .cloned()
            .collect()
    }
}

// =============================================================================
// JSON file store
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PresetFile {
    version: u32,
    #[serde(default)]
    presets: Vec<Preset>,
}

/// File-backed store persisting after every mutation.
#[derive(Debug)]
pub struct JsonPresetStore {
    path: PathBuf,
    inner: MemoryPresetStore,
    /// Set when an unloadable file could not be moved aside; writes then
    /// stay in memory so the file on disk is never overwritten.
    detached: bool,
}

impl JsonPresetStore {
    /// Open the database at `path`.
    ///
    /// A missing file is a normal first run. A file that cannot be read,
    /// parsed or is of another format version is renamed to
    /// `<name>.bak-<timestamp>` before the store starts empty, and the
    /// returned warning names the backup. If even the rename fails the
    /// store keeps its changes in memory for this session.
    pub fn open(path: &Path) -> (Self, Option<String>) {
        let mut store = Self {
            path: path.to_path_buf(),
            inner: MemoryPresetStore::new(),
            detached: false,
        };

        let problem = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No preset database yet");
                return (store, None);
            }
            Err(e) => format!("could not be read: {e}"),
            Ok(content) => match serde_json::from_str::<PresetFile>(&content) {
                Err(e) => format!("is malformed: {e}"),
                Ok(file) if file.version != PRESET_DB_VERSION => format!(
                    "has version {}, expected {PRESET_DB_VERSION}",
                    file.version
                ),
                Ok(file) => {
                    for preset in file.presets {
                        store.inner.presets.insert(preset.key.clone(), preset);
                    }
                    tracing::info!(
                        path = %path.display(),
                        count = store.inner.len(),
                        "Preset database loaded"
                    );
                    return (store, None);
                }
            },
        };

        let msg = match set_aside(path) {
            Ok(backup) => format!(
                "Preset database '{}' {problem}. It was moved to '{}'; starting empty.",
                path.display(),
                backup.display()
            ),
            Err(e) => {
                store.detached = true;
                format!(
                    "Preset database '{}' {problem}. It could not be moved aside ({e}); \
                     preset changes will not be saved this session.",
                    path.display()
                )
            }
        };
        tracing::warn!("{}", msg);
        (store, Some(msg))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn persist(&self) -> Result<(), PresetError> {
        if self.detached {
            tracing::debug!(path = %self.path.display(), "Preset store detached, not saving");
            return Ok(());
        }
        let file = PresetFile {
            version: PRESET_DB_VERSION,
            presets: self.inner.all(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| PresetError::StoreJson {
            path: self.path.clone(),
            source: e,
        })?;

        let io_err = |path: &Path, source| PresetError::StoreIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes()).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io_err(&self.path, e)
        })?;

        tracing::debug!(path = %self.path.display(), count = file.presets.len(), "Preset database saved");
        Ok(())
    }

    /// Apply `mutate` to the in-memory image and persist; roll back on failure.
    fn write<R>(
        &mut self,
        mutate: impl FnOnce(&mut MemoryPresetStore) -> R,
    ) -> Result<R, PresetError> {
        let snapshot = self.inner.clone();
        let result = mutate(&mut self.inner);
        if let Err(e) = self.persist() {
            self.inner = snapshot;
            return Err(e);
        }
        Ok(result)
    }
}

/// Rename an unloadable database next to itself with a timestamp suffix.
fn set_aside(path: &Path) -> std::io::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "presets.json".to_string());
    let backup = path.with_file_name(format!("{file_name}.bak-{stamp}"));
    std::fs::rename(path, &backup)?;
    Ok(backup)
}

impl PresetStore for JsonPresetStore {
    fn get(&self, key: &PresetKey) -> Option<Preset> {
        self.inner.get(key)
    }

    fn contains(&self, key: &PresetKey) -> bool {
        self.inner.contains(key)
    }

    fn put(&mut self, preset: Preset) -> Result<(), PresetError> {
        self.write(|m| {
            m.presets.insert(preset.key.clone(), preset);
        })
    }

    fn delete(&mut self, key: &PresetKey) -> Result<bool, PresetError> {
        if !self.inner.contains(key) {
            return Ok(false);
        }
        self.write(|m| m.presets.remove(key).is_some())
    }

    fn replace(&mut self, old: &PresetKey, preset: Preset) -> Result<(), PresetError> {
        self.write(|m| {
            m.presets.remove(old);
            m.presets.insert(preset.key.clone(), preset);
        })
    }

    fn list(&self, module: &str, version: Option<i32>) -> Vec<Preset> {
        self.inner.list(module, version)
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn preset(name: &str, module: &str, version: i32, params: &[u8]) -> Preset {
        Preset::new(PresetKey::new(name, module, version), params.to_vec(), false)
    }

    #[test]
    fn test_memory_list_filters_module_and_version() {
        let mut store = MemoryPresetStore::new();
        store.put(preset("a", "histogram", 1, &[1])).unwrap();
        store.put(preset("b", "histogram", 2, &[2])).unwrap();
        store.put(preset("c", "colorpicker", 1, &[3])).unwrap();

        assert_eq!(store.list("histogram", None).len(), 2);
        let v1 = store.list("histogram", Some(1));
        assert_eq!(v1.len(), 1);
        assert_eq!(v1[0].key.name, "a");
    }

    #[test]
    fn test_json_store_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("presets.json");

        let (mut store, warning) = JsonPresetStore::open(&path);
        assert!(warning.is_none());
        store.put(preset("soft", "histogram", 2, &[9, 8, 7])).unwrap();
        store.put(preset("hard", "histogram", 2, &[1])).unwrap();
        assert!(store.delete(&PresetKey::new("hard", "histogram", 2)).unwrap());

        let (reopened, warning) = JsonPresetStore::open(&path);
        assert!(warning.is_none());
        assert_eq!(reopened.len(), 1);
        let got = reopened.get(&PresetKey::new("soft", "histogram", 2)).unwrap();
        assert_eq!(got.params, vec![9, 8, 7]);
    }

    fn backups(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.to_string_lossy().contains(".bak-"))
            .collect()
    }

    #[test]
    fn test_json_store_malformed_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let (mut store, warning) = JsonPresetStore::open(&path);
        assert!(store.is_empty());
        let warning = warning.unwrap();
        let saved = backups(dir.path());
        assert_eq!(saved.len(), 1);
        assert!(warning.contains(&*saved[0].to_string_lossy()));
        assert_eq!(std::fs::read(&saved[0]).unwrap(), b"{ not json".to_vec());

        // New writes go to a fresh file, the backup is left alone.
        store.put(preset("soft", "histogram", 2, &[1])).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&saved[0]).unwrap(), b"{ not json".to_vec());
    }

    #[test]
    fn test_json_store_wrong_version_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let original = br#"{"version": 99, "presets": []}"#;
        std::fs::write(&path, original).unwrap();

        let (store, warning) = JsonPresetStore::open(&path);
        assert!(store.is_empty());
        assert!(warning.unwrap().contains("99"));
        let saved = backups(dir.path());
        assert_eq!(saved.len(), 1);
        assert_eq!(std::fs::read(&saved[0]).unwrap(), original.to_vec());
        assert!(!path.exists());
    }

    #[test]
    fn test_json_store_replace_is_single_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("presets.json");
        let (mut store, _) = JsonPresetStore::open(&path);
        let old = PresetKey::new("a", "m", 1);
        store.put(preset("a", "m", 1, &[1])).unwrap();
        store.replace(&old, preset("b", "m", 1, &[2])).unwrap();

        let (reopened, _) = JsonPresetStore::open(&path);
        assert!(!reopened.contains(&old));
        assert!(reopened.contains(&PresetKey::new("b", "m", 1)));
    }

    #[test]
    fn test_delete_missing_is_not_an_error() {
        let mut store = MemoryPresetStore::new();
        assert!(!store.delete(&PresetKey::new("x", "m", 1)).unwrap());
    }
}
