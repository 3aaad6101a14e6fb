/// Ontology store: filesystem overrides, built-in catalog, memoization
///
/// Resolution order for a requested name:
/// 1. `<dir>/<name>.json` if the file exists; a present but invalid file
///    is an error, never silently shadowed by a built-in;
/// 2. the built-in catalog;
/// 3. the default built-in profile (unknown names resolve to it).
///
/// Loaded documents are immutable and memoized in a bounded LRU cache
/// keyed by the requested name.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use super::{builtin, Ontology};
use crate::errors::VeritextError;

/// Bounded cache capacity; comfortably above the built-in count.
const CACHE_CAPACITY: usize = 16;

pub struct OntologyStore {
    dir: PathBuf,
    cache: Mutex<IndexMap<String, Arc<Ontology>>>,
}

impl OntologyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OntologyStore {
            dir: dir.into(),
            cache: Mutex::new(IndexMap::new()),
        }
    }

    /// Load an ontology by name, memoized.
    pub fn load(&self, name: &str) -> Result<Arc<Ontology>, VeritextError> {
        if !is_valid_name(name) {
            return Err(VeritextError::validation(
                "ontology",
                "ontology names may only contain letters, digits, '.', '_' and '-'",
            ));
        }

        {
            let mut cache = self.cache.lock().expect("ontology cache poisoned");
            if let Some(hit) = cache.shift_remove(name) {
                // Re-insert at the back: most recently used.
                cache.insert(name.to_string(), hit.clone());
                return Ok(hit);
            }
        }

        let loaded = self.load_uncached(name)?;

        let mut cache = self.cache.lock().expect("ontology cache poisoned");
        if cache.len() >= CACHE_CAPACITY {
            cache.shift_remove_index(0);
        }
        cache.insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn load_uncached(&self, name: &str) -> Result<Arc<Ontology>, VeritextError> {
        let path = self.dir.join(format!("{}.json", name));
        if path.exists() {
            return load_file(name, &path).map(Arc::new);
        }

        if let Some(found) = builtin::get(name) {
            return Ok(found);
        }

        tracing::info!(ontology = %name, "unknown ontology, using default profile");
        Ok(builtin::default())
    }

    /// Sorted union of built-in names and `*.json` stems in the directory.
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = builtin::NAMES.iter().map(|n| n.to_string()).collect();

        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        if !names.iter().any(|n| n == stem) {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }

        names.sort();
        names
    }
}

fn load_file(name: &str, path: &Path) -> Result<Ontology, VeritextError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::warn!(ontology = %name, path = %path.display(), error = %e, "failed to read ontology file");
        VeritextError::OntologyInvalid {
            name: name.to_string(),
            reason: format!("unreadable file: {}", e),
        }
    })?;

    let raw: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| VeritextError::OntologyInvalid {
            name: name.to_string(),
            reason: format!("invalid JSON: {}", e),
        })?;

    Ontology::from_value(raw).map_err(|e| VeritextError::OntologyInvalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Names double as file stems, so path separators and dot-segments are
/// rejected before touching the filesystem.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
