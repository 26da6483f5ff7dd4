//! The organizational reference-data store.
//!
//! `OrgStore` is constructed once at startup and shared as `Arc<OrgStore>`.
//! Every getter returns active records only. Every successful mutation saves
//! the full snapshot to the slot and then publishes a [`StoreEvent`].
//!
//! Query and mutation methods never fail: unknown ids yield `None`/`false`,
//! input is stored as given, and save failures are logged rather than
//! returned. An add into a collection whose highest stored id is `u64::MAX`
//! hands the record back with [`UNASSIGNED_ID`] and stores nothing. Only
//! setup paths and [`OrgStore::save`] return `Result`.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::{ReferencePolicy, StoreConfig, UniquenessPolicy};
use crate::dedup::{dedupe_collections, Pruned, Resolution};
use crate::defaults::builtin_collections;
use crate::error::StoreError;
use crate::notifier::{ChangeBus, StoreEvent};
use crate::persistence::{
    encode, fingerprint, merge_snapshot, short_hex, Collections, FileSlot, Fingerprint, Slot,
};
use crate::types::{
    Collection, Department, DepartmentDraft, DepartmentPatch, Designation, DesignationDraft,
    DesignationPatch, Draft, GradeType, Machine, MachineDraft, MachinePatch, Named, Operation,
    OperationDraft, OperationPatch, Patch, ProcessExpertise, ProcessExpertiseDraft,
    ProcessExpertisePatch, Record, RecordId, SalaryGrade, SalaryGradeDraft, SalaryGradePatch,
    SkillMetric, SkillMetricDraft, SkillMetricPatch, UNASSIGNED_ID,
};

struct Inner {
    collections: Collections,
    /// Fingerprint of the slot contents this store last wrote or loaded.
    last_seen: Option<Fingerprint>,
    last_saved_at: Option<DateTime<Utc>>,
    last_reloaded_at: Option<DateTime<Utc>>,
}

pub struct OrgStore {
    slot: Box<dyn Slot>,
    uniqueness: UniquenessPolicy,
    reference_policy: ReferencePolicy,
    bus: ChangeBus,
    inner: Mutex<Inner>,
}

/// Active/total record counts for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCount {
    pub collection: Collection,
    pub active: usize,
    pub total: usize,
}

/// Diagnostic view of the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub slot_key: String,
    pub counts: Vec<CollectionCount>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_reloaded_at: Option<DateTime<Utc>>,
}

/// Which side of a process-expertise row a referenced entity sits on.
#[derive(Debug, Clone, Copy)]
enum RefSide {
    Operation,
    Machine,
}

impl RefSide {
    fn collection(self) -> Collection {
        match self {
            RefSide::Operation => Collection::Operations,
            RefSide::Machine => Collection::Machines,
        }
    }

    fn name_in<'a>(self, pe: &'a ProcessExpertise) -> &'a str {
        match self {
            RefSide::Operation => &pe.operation,
            RefSide::Machine => &pe.machine,
        }
    }

    fn rename_in(self, pe: &mut ProcessExpertise, name: &str) {
        match self {
            RefSide::Operation => pe.operation = name.to_string(),
            RefSide::Machine => pe.machine = name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Collection helpers
// ---------------------------------------------------------------------------

fn next_id<T: Record>(items: &[T]) -> Option<RecordId> {
    items.iter().map(|r| r.id()).max().unwrap_or(0).checked_add(1)
}

fn active<T: Record>(items: &[T]) -> Vec<T> {
    items.iter().filter(|r| r.is_active()).cloned().collect()
}

fn find_active<T: Record>(items: &[T], id: RecordId) -> Option<T> {
    items.iter().find(|r| r.id() == id && r.is_active()).cloned()
}

/// Active names in first-seen order, each at most once.
fn active_names<T: Named>(items: &[T]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in items.iter().filter(|r| r.is_active()) {
        if !names.iter().any(|n| n == record.name()) {
            names.push(record.name().to_string());
        }
    }
    names
}

/// Append `draft` under the next id. `Err` carries the record back with
/// [`UNASSIGNED_ID`] when a stored id already sits at the top of the id space.
fn add_record<T: Record, D: Draft<Record = T>>(
    items: &mut Vec<T>,
    draft: D,
    collection: Collection,
) -> Result<T, T> {
    let Some(id) = next_id(items) else {
        log::error!("Store: no id left in {}, add not persisted", collection);
        return Err(draft.into_record(UNASSIGNED_ID));
    };
    let record = draft.into_record(id);
    items.push(record.clone());
    Ok(record)
}

fn update_record<T: Record, P: Patch<Record = T>>(
    items: &mut [T],
    id: RecordId,
    patch: P,
) -> Option<T> {
    let record = items.iter_mut().find(|r| r.id() == id)?;
    patch.apply(record);
    Some(record.clone())
}

fn soft_delete<T: Record>(items: &mut [T], id: RecordId) -> bool {
    match items.iter_mut().find(|r| r.id() == id) {
        Some(record) => {
            record.set_active(false);
            true
        }
        None => false,
    }
}

/// Another active record (not `id`) already holding `name`.
fn name_taken<T: Named>(items: &[T], name: &str, id: Option<RecordId>) -> Option<T> {
    items
        .iter()
        .find(|r| r.is_active() && r.name() == name && Some(r.id()) != id)
        .cloned()
}

fn pair_taken(
    items: &[ProcessExpertise],
    operation: &str,
    machine: &str,
    id: Option<RecordId>,
) -> Option<ProcessExpertise> {
    items
        .iter()
        .find(|pe| {
            pe.is_active && pe.operation == operation && pe.machine == machine && Some(pe.id) != id
        })
        .cloned()
}

impl OrgStore {
    /// Open the file-backed store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let dir = config.resolve_data_dir()?;
        let slot = FileSlot::new(dir, config.slot_key.clone());
        Ok(Self::with_slot(slot, config))
    }

    /// Build a store over any slot: seed defaults, overlay the stored
    /// snapshot, deduplicate, and write the result back.
    pub fn with_slot(slot: impl Slot + 'static, config: &StoreConfig) -> Self {
        let store = Self {
            slot: Box::new(slot),
            uniqueness: config.uniqueness,
            reference_policy: config.reference_policy,
            bus: ChangeBus::new(),
            inner: Mutex::new(Inner {
                collections: builtin_collections(),
                last_seen: None,
                last_saved_at: None,
                last_reloaded_at: None,
            }),
        };
        store.initialize();
        store
    }

    fn initialize(&self) {
        let mut inner = self.inner.lock();

        match self.slot.read() {
            Ok(Some(raw)) => match merge_snapshot(&mut inner.collections, &raw) {
                Ok(replaced) => {
                    log::info!(
                        "Store: loaded {} collection(s) from slot '{}'",
                        replaced.len(),
                        self.slot.key()
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Store: slot '{}' unreadable, keeping defaults: {}",
                        self.slot.key(),
                        e
                    );
                }
            },
            Ok(None) => {
                log::info!("Store: slot '{}' empty, seeding defaults", self.slot.key());
            }
            Err(e) => {
                log::warn!("Store: failed to read slot '{}': {}", self.slot.key(), e);
            }
        }

        dedupe_collections(&mut inner.collections, Resolution::Remove);

        if let Err(e) = self.save_locked(&mut inner) {
            log::warn!("Store: initial save failed: {}", e);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence & notification plumbing
    // -----------------------------------------------------------------------

    fn save_locked(&self, inner: &mut Inner) -> Result<(), StoreError> {
        let raw = encode(&inner.collections)?;
        self.slot.write(&raw)?;
        let fp = fingerprint(&raw);
        log::debug!("Store: saved snapshot {}", short_hex(&fp));
        inner.last_seen = Some(fp);
        inner.last_saved_at = Some(Utc::now());
        Ok(())
    }

    /// Save, release the lock, then notify, so subscribers can re-query.
    fn commit(&self, mut inner: MutexGuard<'_, Inner>, touched: &[Collection]) {
        if let Err(e) = self.save_locked(&mut inner) {
            log::warn!("Store: save after {:?} failed: {}", touched, e);
        }
        drop(inner);
        for collection in touched {
            self.bus.publish(StoreEvent::Updated(*collection));
        }
    }

    /// Write the current snapshot to the slot.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        self.save_locked(&mut inner)
    }

    /// Re-hydrate from the slot. Returns true when in-memory state changed.
    ///
    /// An empty or unreadable slot leaves memory untouched.
    pub fn reload(&self) -> bool {
        self.reload_from_slot(false)
    }

    /// Entry point for cross-context change signals. Only `key` is consulted;
    /// contents this store wrote itself are ignored.
    pub fn on_storage_event(&self, key: &str) -> bool {
        if key != self.slot.key() {
            return false;
        }
        self.reload_from_slot(true)
    }

    fn reload_from_slot(&self, skip_own: bool) -> bool {
        let raw = match self.slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("Store: slot '{}' empty, nothing to reload", self.slot.key());
                return false;
            }
            Err(e) => {
                log::warn!("Store: failed to read slot '{}': {}", self.slot.key(), e);
                return false;
            }
        };

        let fp = fingerprint(&raw);
        {
            let mut inner = self.inner.lock();
            if skip_own && inner.last_seen == Some(fp) {
                log::trace!("Store: slot {} already applied", short_hex(&fp));
                return false;
            }
            if let Err(e) = merge_snapshot(&mut inner.collections, &raw) {
                log::warn!("Store: ignoring unreadable slot contents: {}", e);
                return false;
            }
            inner.last_seen = Some(fp);
            inner.last_reloaded_at = Some(Utc::now());
        }

        log::info!("Store: reloaded from slot {}", short_hex(&fp));
        self.bus.publish(StoreEvent::Reloaded);
        true
    }

    /// Run the deduplication pass on demand, saving if anything changed.
    ///
    /// Unlike the startup pass, losing duplicates are soft-deleted rather than
    /// removed, so their ids are never handed out again.
    pub fn run_dedup_pass(&self) -> Vec<Pruned> {
        let mut inner = self.inner.lock();
        let pruned = dedupe_collections(&mut inner.collections, Resolution::Retire);
        if !pruned.is_empty() {
            let touched: Vec<Collection> = pruned.iter().map(|p| p.collection).collect();
            self.commit(inner, &touched);
        }
        pruned
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.bus.subscribe()
    }

    pub fn slot(&self) -> &dyn Slot {
        self.slot.as_ref()
    }

    /// Full snapshot including soft-deleted rows.
    pub fn snapshot(&self) -> Collections {
        self.inner.lock().collections.clone()
    }

    pub fn status(&self) -> StoreStatus {
        let inner = self.inner.lock();
        let counts = Collection::ALL
            .iter()
            .map(|&collection| {
                let (active, total) = inner.collections.counts(collection);
                CollectionCount {
                    collection,
                    active,
                    total,
                }
            })
            .collect();
        StoreStatus {
            slot_key: self.slot.key().to_string(),
            counts,
            last_saved_at: inner.last_saved_at,
            last_reloaded_at: inner.last_reloaded_at,
        }
    }

    fn enforce_unique(&self) -> bool {
        self.uniqueness == UniquenessPolicy::Enforced
    }

    // -----------------------------------------------------------------------
    // Departments
    // -----------------------------------------------------------------------

    pub fn get_departments(&self) -> Vec<Department> {
        active(&self.inner.lock().collections.departments)
    }

    pub fn get_department(&self, id: RecordId) -> Option<Department> {
        find_active(&self.inner.lock().collections.departments, id)
    }

    pub fn get_department_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.departments)
    }

    pub fn add_department(&self, draft: DepartmentDraft) -> Department {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            if let Some(existing) = name_taken(&inner.collections.departments, &draft.name, None) {
                log::debug!("Store: department '{}' exists, merging add", draft.name);
                return existing;
            }
        }
        match add_record(&mut inner.collections.departments, draft, Collection::Departments) {
            Ok(record) => {
                self.commit(inner, &[Collection::Departments]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_department(&self, id: RecordId, patch: DepartmentPatch) -> Option<Department> {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            if let Some(name) = &patch.name {
                if name_taken(&inner.collections.departments, name, Some(id)).is_some() {
                    log::warn!("Store: rename of department {} to '{}' rejected", id, name);
                    return None;
                }
            }
        }
        let record = update_record(&mut inner.collections.departments, id, patch)?;
        self.commit(inner, &[Collection::Departments]);
        Some(record)
    }

    pub fn delete_department(&self, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        if !soft_delete(&mut inner.collections.departments, id) {
            return false;
        }
        self.commit(inner, &[Collection::Departments]);
        true
    }

    // -----------------------------------------------------------------------
    // Designations
    // -----------------------------------------------------------------------

    pub fn get_designations(&self) -> Vec<Designation> {
        active(&self.inner.lock().collections.designations)
    }

    pub fn get_designation(&self, id: RecordId) -> Option<Designation> {
        find_active(&self.inner.lock().collections.designations, id)
    }

    pub fn get_designation_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.designations)
    }

    pub fn add_designation(&self, draft: DesignationDraft) -> Designation {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            if let Some(existing) = name_taken(&inner.collections.designations, &draft.name, None) {
                log::debug!("Store: designation '{}' exists, merging add", draft.name);
                return existing;
            }
        }
        match add_record(&mut inner.collections.designations, draft, Collection::Designations) {
            Ok(record) => {
                self.commit(inner, &[Collection::Designations]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_designation(&self, id: RecordId, patch: DesignationPatch) -> Option<Designation> {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            if let Some(name) = &patch.name {
                if name_taken(&inner.collections.designations, name, Some(id)).is_some() {
                    log::warn!("Store: rename of designation {} to '{}' rejected", id, name);
                    return None;
                }
            }
        }
        let record = update_record(&mut inner.collections.designations, id, patch)?;
        self.commit(inner, &[Collection::Designations]);
        Some(record)
    }

    pub fn delete_designation(&self, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        if !soft_delete(&mut inner.collections.designations, id) {
            return false;
        }
        self.commit(inner, &[Collection::Designations]);
        true
    }

    // -----------------------------------------------------------------------
    // Operations & machines
    // -----------------------------------------------------------------------

    pub fn get_operations(&self) -> Vec<Operation> {
        active(&self.inner.lock().collections.operations)
    }

    pub fn get_operation(&self, id: RecordId) -> Option<Operation> {
        find_active(&self.inner.lock().collections.operations, id)
    }

    pub fn get_operation_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.operations)
    }

    pub fn add_operation(&self, draft: OperationDraft) -> Operation {
        let mut inner = self.inner.lock();
        match add_record(&mut inner.collections.operations, draft, Collection::Operations) {
            Ok(record) => {
                self.commit(inner, &[Collection::Operations]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    /// Renames are carried into every process-expertise row naming the
    /// operation, unless another active operation still holds the old name.
    pub fn update_operation(&self, id: RecordId, patch: OperationPatch) -> Option<Operation> {
        let mut inner = self.inner.lock();
        let old_name = inner
            .collections
            .operations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.name.clone())?;
        let shared = name_taken(&inner.collections.operations, &old_name, Some(id)).is_some();
        let record = update_record(&mut inner.collections.operations, id, patch)?;
        let renamed = if shared {
            log::debug!("Store: '{}' still names another operation, rows kept", old_name);
            0
        } else {
            cascade_rename(
                &mut inner.collections.process_expertise,
                RefSide::Operation,
                &old_name,
                &record.name,
            )
        };
        self.commit_with_cascade(inner, Collection::Operations, renamed);
        Some(record)
    }

    /// Soft-delete an operation, applying the configured [`ReferencePolicy`]
    /// to process-expertise rows that name it.
    pub fn delete_operation(&self, id: RecordId) -> bool {
        self.delete_referenced(RefSide::Operation, id)
    }

    pub fn get_machines(&self) -> Vec<Machine> {
        active(&self.inner.lock().collections.machines)
    }

    pub fn get_machine(&self, id: RecordId) -> Option<Machine> {
        find_active(&self.inner.lock().collections.machines, id)
    }

    pub fn get_machine_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.machines)
    }

    pub fn add_machine(&self, draft: MachineDraft) -> Machine {
        let mut inner = self.inner.lock();
        match add_record(&mut inner.collections.machines, draft, Collection::Machines) {
            Ok(record) => {
                self.commit(inner, &[Collection::Machines]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_machine(&self, id: RecordId, patch: MachinePatch) -> Option<Machine> {
        let mut inner = self.inner.lock();
        let old_name = inner
            .collections
            .machines
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.name.clone())?;
        let shared = name_taken(&inner.collections.machines, &old_name, Some(id)).is_some();
        let record = update_record(&mut inner.collections.machines, id, patch)?;
        let renamed = if shared {
            log::debug!("Store: '{}' still names another machine, rows kept", old_name);
            0
        } else {
            cascade_rename(
                &mut inner.collections.process_expertise,
                RefSide::Machine,
                &old_name,
                &record.name,
            )
        };
        self.commit_with_cascade(inner, Collection::Machines, renamed);
        Some(record)
    }

    pub fn delete_machine(&self, id: RecordId) -> bool {
        self.delete_referenced(RefSide::Machine, id)
    }

    fn delete_referenced(&self, side: RefSide, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        let name = match side {
            RefSide::Operation => inner
                .collections
                .operations
                .iter()
                .find(|o| o.id == id)
                .map(|o| o.name.clone()),
            RefSide::Machine => inner
                .collections
                .machines
                .iter()
                .find(|m| m.id == id)
                .map(|m| m.name.clone()),
        };
        let Some(name) = name else {
            return false;
        };

        let referencing = inner
            .collections
            .process_expertise
            .iter()
            .filter(|pe| pe.is_active && side.name_in(pe) == name)
            .count();

        if referencing > 0 && self.reference_policy == ReferencePolicy::Block {
            log::warn!(
                "Store: delete of {} '{}' blocked, {} process expertise row(s) reference it",
                side.collection(),
                name,
                referencing
            );
            return false;
        }

        match side {
            RefSide::Operation => soft_delete(&mut inner.collections.operations, id),
            RefSide::Machine => soft_delete(&mut inner.collections.machines, id),
        };

        let mut cascaded = 0;
        if referencing > 0 && self.reference_policy == ReferencePolicy::Cascade {
            for pe in inner
                .collections
                .process_expertise
                .iter_mut()
                .filter(|pe| pe.is_active && side.name_in(pe) == name)
            {
                pe.is_active = false;
                cascaded += 1;
            }
            log::info!(
                "Store: deleting {} '{}' retired {} process expertise row(s)",
                side.collection(),
                name,
                cascaded
            );
        }

        self.commit_with_cascade(inner, side.collection(), cascaded);
        true
    }

    fn commit_with_cascade(
        &self,
        inner: MutexGuard<'_, Inner>,
        primary: Collection,
        cascaded: usize,
    ) {
        if cascaded > 0 {
            self.commit(inner, &[primary, Collection::ProcessExpertise]);
        } else {
            self.commit(inner, &[primary]);
        }
    }

    // -----------------------------------------------------------------------
    // Process expertise
    // -----------------------------------------------------------------------

    pub fn get_process_expertise(&self) -> Vec<ProcessExpertise> {
        active(&self.inner.lock().collections.process_expertise)
    }

    pub fn get_process_expertise_entry(&self, id: RecordId) -> Option<ProcessExpertise> {
        find_active(&self.inner.lock().collections.process_expertise, id)
    }

    /// Machine names paired with `operation_name`, computed on every call.
    pub fn get_machines_for_operation(&self, operation_name: &str) -> Vec<String> {
        self.inner
            .lock()
            .collections
            .process_expertise
            .iter()
            .filter(|pe| pe.is_active && pe.operation == operation_name)
            .map(|pe| pe.machine.clone())
            .collect()
    }

    pub fn add_process_expertise(&self, draft: ProcessExpertiseDraft) -> ProcessExpertise {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            if let Some(existing) = pair_taken(
                &inner.collections.process_expertise,
                &draft.operation,
                &draft.machine,
                None,
            ) {
                log::debug!(
                    "Store: expertise '{}' on '{}' exists, merging add",
                    draft.operation,
                    draft.machine
                );
                return existing;
            }
        }
        match add_record(
            &mut inner.collections.process_expertise,
            draft,
            Collection::ProcessExpertise,
        ) {
            Ok(record) => {
                self.commit(inner, &[Collection::ProcessExpertise]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_process_expertise(
        &self,
        id: RecordId,
        patch: ProcessExpertisePatch,
    ) -> Option<ProcessExpertise> {
        let mut inner = self.inner.lock();
        if self.enforce_unique() {
            let current = inner
                .collections
                .process_expertise
                .iter()
                .find(|pe| pe.id == id)?;
            let operation = patch.operation.as_deref().unwrap_or(&current.operation);
            let machine = patch.machine.as_deref().unwrap_or(&current.machine);
            if pair_taken(&inner.collections.process_expertise, operation, machine, Some(id))
                .is_some()
            {
                log::warn!(
                    "Store: expertise {} update to '{}' on '{}' rejected",
                    id,
                    operation,
                    machine
                );
                return None;
            }
        }
        let record = update_record(&mut inner.collections.process_expertise, id, patch)?;
        self.commit(inner, &[Collection::ProcessExpertise]);
        Some(record)
    }

    pub fn delete_process_expertise(&self, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        if !soft_delete(&mut inner.collections.process_expertise, id) {
            return false;
        }
        self.commit(inner, &[Collection::ProcessExpertise]);
        true
    }

    // -----------------------------------------------------------------------
    // Skill metrics
    // -----------------------------------------------------------------------

    pub fn get_skill_metrics(&self) -> Vec<SkillMetric> {
        active(&self.inner.lock().collections.skill_metrics)
    }

    pub fn get_skill_metric(&self, id: RecordId) -> Option<SkillMetric> {
        find_active(&self.inner.lock().collections.skill_metrics, id)
    }

    pub fn get_skill_metric_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.skill_metrics)
    }

    pub fn add_skill_metric(&self, draft: SkillMetricDraft) -> SkillMetric {
        let mut inner = self.inner.lock();
        match add_record(&mut inner.collections.skill_metrics, draft, Collection::SkillMetrics) {
            Ok(record) => {
                self.commit(inner, &[Collection::SkillMetrics]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_skill_metric(&self, id: RecordId, patch: SkillMetricPatch) -> Option<SkillMetric> {
        let mut inner = self.inner.lock();
        let record = update_record(&mut inner.collections.skill_metrics, id, patch)?;
        self.commit(inner, &[Collection::SkillMetrics]);
        Some(record)
    }

    pub fn delete_skill_metric(&self, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        if !soft_delete(&mut inner.collections.skill_metrics, id) {
            return false;
        }
        self.commit(inner, &[Collection::SkillMetrics]);
        true
    }

    // -----------------------------------------------------------------------
    // Salary grades
    // -----------------------------------------------------------------------

    pub fn get_staff_salary_grades(&self) -> Vec<SalaryGrade> {
        active(&self.inner.lock().collections.staff_salary_grades)
    }

    pub fn get_staff_salary_grade(&self, id: RecordId) -> Option<SalaryGrade> {
        find_active(&self.inner.lock().collections.staff_salary_grades, id)
    }

    pub fn get_staff_salary_grade_names(&self) -> Vec<String> {
        active_names(&self.inner.lock().collections.staff_salary_grades)
    }

    pub fn get_salary_grades_by_type(&self, grade_type: GradeType) -> Vec<SalaryGrade> {
        self.inner
            .lock()
            .collections
            .staff_salary_grades
            .iter()
            .filter(|g| g.is_active && g.grade_type == grade_type)
            .cloned()
            .collect()
    }

    /// Stores `grossSalary` exactly as supplied; a mismatch with the
    /// component total is logged, never corrected.
    pub fn add_staff_salary_grade(&self, draft: SalaryGradeDraft) -> SalaryGrade {
        let mut inner = self.inner.lock();
        match add_record(
            &mut inner.collections.staff_salary_grades,
            draft,
            Collection::StaffSalaryGrades,
        ) {
            Ok(record) => {
                warn_gross_divergence(&record);
                self.commit(inner, &[Collection::StaffSalaryGrades]);
                record
            }
            Err(unassigned) => unassigned,
        }
    }

    pub fn update_staff_salary_grade(
        &self,
        id: RecordId,
        patch: SalaryGradePatch,
    ) -> Option<SalaryGrade> {
        let mut inner = self.inner.lock();
        let record = update_record(&mut inner.collections.staff_salary_grades, id, patch)?;
        warn_gross_divergence(&record);
        self.commit(inner, &[Collection::StaffSalaryGrades]);
        Some(record)
    }

    pub fn delete_staff_salary_grade(&self, id: RecordId) -> bool {
        let mut inner = self.inner.lock();
        if !soft_delete(&mut inner.collections.staff_salary_grades, id) {
            return false;
        }
        self.commit(inner, &[Collection::StaffSalaryGrades]);
        true
    }
}

fn cascade_rename(
    rows: &mut [ProcessExpertise],
    side: RefSide,
    old_name: &str,
    new_name: &str,
) -> usize {
    if old_name == new_name {
        return 0;
    }
    let mut renamed = 0;
    for pe in rows.iter_mut().filter(|pe| side.name_in(pe) == old_name) {
        side.rename_in(pe, new_name);
        renamed += 1;
    }
    if renamed > 0 {
        log::info!(
            "Store: renamed '{}' to '{}' in {} process expertise row(s)",
            old_name,
            new_name,
            renamed
        );
    }
    renamed
}

fn warn_gross_divergence(grade: &SalaryGrade) {
    if !grade.is_gross_consistent() {
        log::warn!(
            "Store: salary grade '{}' gross {} differs from component total {}",
            grade.name,
            grade.gross_salary,
            grade.component_total()
        );
    }
}
