//! Module template storage.

use crate::codec::{decode_module, encode_module};
use crate::error::StoreError;
use crate::module::Module;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Id and display name of a stored template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub id: String,
    pub name: String,
}

/// Where module templates live.
pub trait ModuleStore {
    /// Write a template, replacing any existing one with the same id.
    fn save(&mut self, module: &Module) -> Result<(), StoreError>;

    fn load(&self, id: &str) -> Result<Module, StoreError>;

    /// Every readable template, sorted by name.
    fn list(&self) -> Vec<ModuleSummary>;

    /// Remove a template. Returns whether one existed.
    fn delete(&mut self, id: &str) -> bool;

    /// A new unique template id: the first 8 characters of a v4 UUID.
    fn generate_id(&self) -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(8);
        id
    }
}

// ─── Filesystem ──────────────────────────────────────────────────────────

/// One `<id>.json` file per template inside a directory.
#[derive(Debug, Clone)]
pub struct FsModuleStore {
    dir: PathBuf,
}

impl FsModuleStore {
    /// Open a store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl ModuleStore for FsModuleStore {
    fn save(&mut self, module: &Module) -> Result<(), StoreError> {
        let path = self.path_for(&module.id);
        fs::write(&path, encode_module(module)?)?;
        log::info!("saved module '{}' to {}", module.name, path.display());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Module, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::ModuleNotFound(id.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        Ok(decode_module(&text)?)
    }

    fn list(&self) -> Vec<ModuleSummary> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot read module directory {}: {e}", self.dir.display());
                return Vec::new();
            }
        };
        let mut modules: Vec<ModuleSummary> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let text = fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|text| decode_module(&text).map_err(StoreError::from));
                match text {
                    Ok(module) => Some(ModuleSummary {
                        id: module.id,
                        name: module.name,
                    }),
                    Err(e) => {
                        log::warn!("skipping module file {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        modules
    }

    fn delete(&mut self, id: &str) -> bool {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                log::warn!("cannot delete module file {}: {e}", path.display());
                false
            }
        }
    }
}

// ─── In-Memory ───────────────────────────────────────────────────────────

/// Templates kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryModuleStore {
    modules: BTreeMap<String, Module>,
}

impl MemoryModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleStore for MemoryModuleStore {
    fn save(&mut self, module: &Module) -> Result<(), StoreError> {
        self.modules.insert(module.id.clone(), module.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Module, StoreError> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ModuleNotFound(id.to_string()))
    }

    fn list(&self) -> Vec<ModuleSummary> {
        let mut modules: Vec<ModuleSummary> = self
            .modules
            .values()
            .map(|m| ModuleSummary {
                id: m.id.clone(),
                name: m.name.clone(),
            })
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        modules
    }

    fn delete(&mut self, id: &str) -> bool {
        self.modules.remove(id).is_some()
    }
}
