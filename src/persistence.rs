//! Durable snapshot storage.
//!
//! The whole store is serialized into one JSON object under a single slot key:
//! `{ departments, designations, processExpertise, operations, machines,
//! skillMetrics, staffSalaryGrades }`. Every save overwrites the slot wholesale.
//!
//! Loading is a defensive merge: each field present in the stored object
//! replaces the matching in-memory collection, and anything missing or
//! unreadable keeps what is already in memory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::types::{
    Collection, Department, Designation, Machine, Operation, ProcessExpertise, SalaryGrade,
    SkillMetric,
};

/// In-memory state of the store; also the exact shape of the durable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collections {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub designations: Vec<Designation>,
    #[serde(default)]
    pub process_expertise: Vec<ProcessExpertise>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub skill_metrics: Vec<SkillMetric>,
    #[serde(default)]
    pub staff_salary_grades: Vec<SalaryGrade>,
}

impl Collections {
    /// (active, total) record counts for one collection.
    pub fn counts(&self, collection: Collection) -> (usize, usize) {
        fn tally<T: crate::types::Record>(items: &[T]) -> (usize, usize) {
            (items.iter().filter(|r| r.is_active()).count(), items.len())
        }
        match collection {
            Collection::Departments => tally(&self.departments),
            Collection::Designations => tally(&self.designations),
            Collection::ProcessExpertise => tally(&self.process_expertise),
            Collection::Operations => tally(&self.operations),
            Collection::Machines => tally(&self.machines),
            Collection::SkillMetrics => tally(&self.skill_metrics),
            Collection::StaffSalaryGrades => tally(&self.staff_salary_grades),
        }
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// A single durable key/value slot shared by every context using the store.
pub trait Slot: Send + Sync {
    /// The fixed key the snapshot lives under.
    fn key(&self) -> &str;

    /// Raw slot contents, or `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the slot contents.
    fn write(&self, contents: &str) -> Result<(), StoreError>;

    /// Backing file, for slots other processes can observe on disk.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Slot backed by `<dir>/<key>.json`, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileSlot {
    key: String,
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = dir.into().join(format!("{}.json", key));
        Self { key, path }
    }
}

impl Slot for FileSlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| StoreError::Config(format!("{} has no parent", self.path.display())))?;
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }

        // Write beside the target so the rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-process slot. Clones share the same contents, so two stores built on
/// clones of one `MemorySlot` behave like two contexts sharing storage.
#[derive(Debug, Clone)]
pub struct MemorySlot {
    key: String,
    contents: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            contents: Arc::new(Mutex::new(None)),
        }
    }

    /// Drop whatever is stored, as if the slot was never written.
    pub fn clear(&self) {
        *self.contents.lock() = None;
    }
}

impl Slot for MemorySlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.contents.lock().clone())
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot encode / merge
// ---------------------------------------------------------------------------

/// SHA-256 of raw slot contents, used to recognize our own writes.
pub type Fingerprint = [u8; 32];

pub fn fingerprint(contents: &str) -> Fingerprint {
    Sha256::digest(contents.as_bytes()).into()
}

/// Short hex form for log lines.
pub fn short_hex(fp: &Fingerprint) -> String {
    hex::encode(&fp[..6])
}

/// Serialize the full snapshot.
pub fn encode(collections: &Collections) -> Result<String, StoreError> {
    Ok(serde_json::to_string(collections)?)
}

/// Merge a raw snapshot into `target`, returning the collections replaced.
///
/// Fails only when the snapshot is not a JSON object at all; in that case
/// `target` is untouched. A field whose array cannot be read is skipped with a
/// warning and the in-memory collection is kept.
pub fn merge_snapshot(target: &mut Collections, raw: &str) -> Result<Vec<Collection>, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(StoreError::InvalidSnapshot)?;

    let mut replaced = Vec::new();
    for collection in Collection::ALL {
        let Some(field) = object.get(collection.field_name()) else {
            continue;
        };
        let applied = match collection {
            Collection::Departments => replace_field(&mut target.departments, field, collection),
            Collection::Designations => replace_field(&mut target.designations, field, collection),
            Collection::ProcessExpertise => {
                replace_field(&mut target.process_expertise, field, collection)
            }
            Collection::Operations => replace_field(&mut target.operations, field, collection),
            Collection::Machines => replace_field(&mut target.machines, field, collection),
            Collection::SkillMetrics => replace_field(&mut target.skill_metrics, field, collection),
            Collection::StaffSalaryGrades => {
                replace_field(&mut target.staff_salary_grades, field, collection)
            }
        };
        if applied {
            replaced.push(collection);
        }
    }
    Ok(replaced)
}

fn replace_field<T: DeserializeOwned>(
    slot: &mut Vec<T>,
    field: &serde_json::Value,
    collection: Collection,
) -> bool {
    match Vec::<T>::deserialize(field) {
        Ok(items) => {
            *slot = items;
            true
        }
        Err(e) => {
            log::warn!("Store: ignoring unreadable '{}' in snapshot: {}", collection, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::builtin_collections;
    use tempfile::TempDir;

    #[test]
    fn test_encode_has_exact_top_level_fields() {
        let raw = encode(&builtin_collections()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "departments",
                "designations",
                "machines",
                "operations",
                "processExpertise",
                "skillMetrics",
                "staffSalaryGrades",
            ]
        );
    }

    #[test]
    fn test_merge_into_empty_reproduces_snapshot() {
        let original = builtin_collections();
        let raw = encode(&original).unwrap();

        let mut fresh = Collections::default();
        let replaced = merge_snapshot(&mut fresh, &raw).unwrap();
        assert_eq!(replaced.len(), 7);
        assert_eq!(fresh, original);
    }

    #[test]
    fn test_merge_keeps_missing_fields() {
        let mut target = builtin_collections();
        let raw = r#"{ "operations": [ { "id": 1, "name": "Pocket Attach", "isActive": true } ] }"#;

        let replaced = merge_snapshot(&mut target, raw).unwrap();
        assert_eq!(replaced, vec![Collection::Operations]);
        assert_eq!(target.operations.len(), 1);
        assert_eq!(target.departments.len(), 7);
    }

    #[test]
    fn test_merge_skips_unreadable_field() {
        let mut target = builtin_collections();
        let raw = r#"{ "departments": "oops", "machines": [] }"#;

        let replaced = merge_snapshot(&mut target, raw).unwrap();
        assert_eq!(replaced, vec![Collection::Machines]);
        assert_eq!(target.departments.len(), 7);
        assert!(target.machines.is_empty());
    }

    #[test]
    fn test_merge_rejects_garbage() {
        let mut target = builtin_collections();
        assert!(matches!(
            merge_snapshot(&mut target, "{truncated"),
            Err(StoreError::Json(_))
        ));
        assert!(matches!(
            merge_snapshot(&mut target, "[1, 2]"),
            Err(StoreError::InvalidSnapshot)
        ));
        assert_eq!(target, builtin_collections());
    }

    #[test]
    fn test_file_slot_round_trip() {
        let temp = TempDir::new().unwrap();
        let slot = FileSlot::new(temp.path().join("data"), "organizationData");
        assert_eq!(slot.read().unwrap(), None);

        slot.write("{\"departments\":[]}").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("{\"departments\":[]}"));
        assert_eq!(
            slot.path().unwrap(),
            temp.path().join("data").join("organizationData.json")
        );
    }

    #[test]
    fn test_memory_slot_clones_share_contents() {
        let a = MemorySlot::new("organizationData");
        let b = a.clone();
        a.write("{}").unwrap();
        assert_eq!(b.read().unwrap().as_deref(), Some("{}"));
        b.clear();
        assert_eq!(a.read().unwrap(), None);
    }

    #[test]
    fn test_fingerprint_distinguishes_contents() {
        assert_eq!(fingerprint("{}"), fingerprint("{}"));
        assert_ne!(fingerprint("{}"), fingerprint("{ }"));
        assert_eq!(short_hex(&fingerprint("{}")).len(), 12);
    }
}
