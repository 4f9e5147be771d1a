//! Reference tracking
//!
//! Objects reached more than once are written in full only the first time.
//! Later occurrences carry a marker pointing back at the first one, either by
//! a numeric id or by the path of the node holding it. Reading resolves the
//! marker to the very object created for that node, which may still be under
//! construction when the reference closes a cycle.

use ahash::AHashMap;
use serde::Deserialize;
use trellis_stream::Path;

use crate::value::{ObjectId, Value};

/// How repeated objects are marked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceMode {
    /// Every occurrence is written in full; cycles are an error.
    NoReferences,
    /// Objects get `id="N"` on first sight and `reference="N"` on repeats.
    #[default]
    Id,
    /// Repeats carry the path to the first occurrence relative to themselves.
    RelativePath,
    /// Repeats carry the absolute path to the first occurrence.
    AbsolutePath,
}

impl ReferenceMode {
    /// Whether repeats are written as markers.
    pub fn tracks_references(self) -> bool {
        self != ReferenceMode::NoReferences
    }
}

/// Identity of a written or read object within one stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKey {
    /// Value of the id attribute
    Id(String),
    /// Absolute path of the node
    Path(Path),
}

/// Write-side table: object to the key of its first occurrence.
#[derive(Debug)]
pub struct WriteReferences {
    mode: ReferenceMode,
    seen: AHashMap<ObjectId, ReferenceKey>,
    next_id: u64,
}

impl WriteReferences {
    /// Empty table for `mode`.
    pub fn new(mode: ReferenceMode) -> Self {
        Self {
            mode,
            seen: AHashMap::new(),
            next_id: 1,
        }
    }

    /// Reference mode of the table.
    pub fn mode(&self) -> ReferenceMode {
        self.mode
    }

    /// Key of the first occurrence of `object`.
    pub fn lookup(&self, object: ObjectId) -> Option<&ReferenceKey> {
        self.seen.get(&object)
    }

    /// Record the first occurrence of `object`, written at `path`.
    pub fn register(&mut self, object: ObjectId, path: &Path) -> ReferenceKey {
        let key = match self.mode {
            ReferenceMode::Id | ReferenceMode::NoReferences => {
                let id = self.next_id;
                self.next_id += 1;
                ReferenceKey::Id(id.to_string())
            }
            ReferenceMode::RelativePath | ReferenceMode::AbsolutePath => ReferenceKey::Path(path.clone()),
        };
        self.seen.insert(object, key.clone());
        key
    }

    /// Marker text pointing at `key` from the node at `current`.
    pub fn marker(&self, key: &ReferenceKey, current: &Path) -> String {
        match (key, self.mode) {
            (ReferenceKey::Id(id), _) => id.clone(),
            (ReferenceKey::Path(target), ReferenceMode::RelativePath) => current.relative_to(target).to_string(),
            (ReferenceKey::Path(target), _) => target.to_string(),
        }
    }
}

/// Read-side table: key to the value read for it.
#[derive(Debug)]
pub struct ReadReferences {
    mode: ReferenceMode,
    values: AHashMap<ReferenceKey, Value>,
}

impl ReadReferences {
    /// Empty table for `mode`.
    pub fn new(mode: ReferenceMode) -> Self {
        Self {
            mode,
            values: AHashMap::new(),
        }
    }

    /// Reference mode of the table.
    pub fn mode(&self) -> ReferenceMode {
        self.mode
    }

    /// Key a marker found on the node at `current` points at.
    ///
    /// Path markers starting with `/` are absolute, anything else is
    /// resolved against `current`.
    pub fn key_for_marker(&self, marker: &str, current: &Path) -> ReferenceKey {
        match self.mode {
            ReferenceMode::Id | ReferenceMode::NoReferences => ReferenceKey::Id(marker.to_string()),
            ReferenceMode::RelativePath | ReferenceMode::AbsolutePath => {
                let path = Path::new(marker);
                if path.is_absolute() {
                    ReferenceKey::Path(path)
                } else {
                    ReferenceKey::Path(current.apply(&path))
                }
            }
        }
    }

    /// Remember `value` under `key` unless the key is already taken.
    pub fn register(&mut self, key: ReferenceKey, value: Value) {
        self.values.entry(key).or_insert(value);
    }

    /// Value registered under `key`.
    pub fn get(&self, key: &ReferenceKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of registered values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_count_from_one() {
        let mut references = WriteReferences::new(ReferenceMode::Id);
        let root = Path::new("/a");
        let first = references.register(ObjectId::from_index(4), &root);
        let second = references.register(ObjectId::from_index(9), &root);
        assert_eq!(first, ReferenceKey::Id("1".to_string()));
        assert_eq!(second, ReferenceKey::Id("2".to_string()));
        assert_eq!(references.lookup(ObjectId::from_index(9)), Some(&second));
        assert_eq!(references.marker(&second, &root), "2");
    }

    #[test]
    fn test_path_markers_resolve_back() {
        let mut write = WriteReferences::new(ReferenceMode::RelativePath);
        let target = Path::new("/zoo/keeper");
        let key = write.register(ObjectId::from_index(0), &target);
        let current = Path::new("/zoo/animals/dog[2]/keeper");
        let marker = write.marker(&key, &current);
        assert_eq!(marker, "../../../keeper");

        let read = ReadReferences::new(ReferenceMode::RelativePath);
        assert_eq!(read.key_for_marker(&marker, &current), ReferenceKey::Path(target.clone()));

        let write = WriteReferences::new(ReferenceMode::AbsolutePath);
        assert_eq!(write.marker(&ReferenceKey::Path(target.clone()), &current), "/zoo/keeper");
        let read = ReadReferences::new(ReferenceMode::AbsolutePath);
        assert_eq!(read.key_for_marker("/zoo/keeper", &current), ReferenceKey::Path(target));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut read = ReadReferences::new(ReferenceMode::Id);
        let key = ReferenceKey::Id("1".to_string());
        read.register(key.clone(), Value::Int(1));
        read.register(key.clone(), Value::Int(2));
        assert_eq!(read.get(&key), Some(&Value::Int(1)));
        assert_eq!(read.len(), 1);
    }

    #[test]
    fn test_mode_from_config_names() {
        let mode: ReferenceMode = serde_json::from_str("\"relative-path\"").unwrap();
        assert_eq!(mode, ReferenceMode::RelativePath);
        assert_eq!(ReferenceMode::default(), ReferenceMode::Id);
        assert!(!ReferenceMode::NoReferences.tracks_references());
    }
}
