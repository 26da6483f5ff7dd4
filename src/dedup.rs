//! Deduplication pass.
//!
//! Inserts do not enforce uniqueness under the deferred policy, so on load the
//! store collapses departments and designations by `name` and process
//! expertise by its (operation, machine) pair. The first active occurrence in
//! array order wins regardless of id. Soft-deleted rows are never touched and
//! never claim a key, so a deleted record cannot evict a live one.
//!
//! The pair is compared as a tuple rather than as the concatenated string
//! `operation + machine`. Rows such as ("ab", "c") and ("a", "bc") are
//! therefore distinct here, where a concatenated key would collapse them.
//!
//! At startup losers are removed outright. Once the store is serving, a pass
//! retires them instead so their ids stay occupied and are never handed out
//! again.

use std::collections::HashSet;
use std::hash::Hash;

use crate::persistence::Collections;
use crate::types::{Collection, Record};

/// What happens to a duplicate that loses to an earlier record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Drop it from the collection.
    Remove,
    /// Keep the row but mark it inactive.
    Retire,
}

/// Records removed or retired in one collection by a deduplication pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pruned {
    pub collection: Collection,
    pub removed: usize,
}

/// Keep the first active record per key; returns how many lost.
pub fn dedupe_by_key<T, K, F>(items: &mut Vec<T>, key: F, resolution: Resolution) -> usize
where
    T: Record,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = HashSet::new();
    match resolution {
        Resolution::Remove => {
            let before = items.len();
            items.retain(|item| !item.is_active() || seen.insert(key(item)));
            before - items.len()
        }
        Resolution::Retire => {
            let mut retired = 0;
            for item in items.iter_mut().filter(|item| item.is_active()) {
                if !seen.insert(key(&*item)) {
                    item.set_active(false);
                    retired += 1;
                }
            }
            retired
        }
    }
}

/// Run the pass over every keyed collection.
pub fn dedupe_collections(collections: &mut Collections, resolution: Resolution) -> Vec<Pruned> {
    let mut pruned = Vec::new();

    let removed = dedupe_by_key(&mut collections.departments, |d| d.name.clone(), resolution);
    if removed > 0 {
        pruned.push(Pruned {
            collection: Collection::Departments,
            removed,
        });
    }

    let removed = dedupe_by_key(&mut collections.designations, |d| d.name.clone(), resolution);
    if removed > 0 {
        pruned.push(Pruned {
            collection: Collection::Designations,
            removed,
        });
    }

    let removed = dedupe_by_key(
        &mut collections.process_expertise,
        |pe| pe.pair_key(),
        resolution,
    );
    if removed > 0 {
        pruned.push(Pruned {
            collection: Collection::ProcessExpertise,
            removed,
        });
    }

    let verb = match resolution {
        Resolution::Remove => "removed",
        Resolution::Retire => "retired",
    };
    for p in &pruned {
        log::info!("Store: dedup {} {} duplicate(s) in {}", verb, p.removed, p.collection);
    }

    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::builtin_collections;
    use crate::types::{Department, DepartmentDraft, Draft, ProcessExpertiseDraft};

    fn dept(id: u64, name: &str, active: bool) -> Department {
        let mut d = DepartmentDraft::named(name).into_record(id);
        d.is_active = active;
        d
    }

    #[test]
    fn test_first_seen_wins_over_lower_id() {
        let mut items = vec![dept(9, "Sewing Department", true), dept(2, "Sewing Department", true)];
        let removed = dedupe_by_key(&mut items, |d| d.name.clone(), Resolution::Remove);
        assert_eq!(removed, 1);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 9);
    }

    #[test]
    fn test_inactive_rows_survive_and_do_not_claim_key() {
        let mut items = vec![
            dept(1, "Washing", false),
            dept(2, "Washing", true),
            dept(3, "Washing", true),
        ];
        let removed = dedupe_by_key(&mut items, |d| d.name.clone(), Resolution::Remove);
        assert_eq!(removed, 1);
        let ids: Vec<u64> = items.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_pair_key_is_not_plain_concatenation() {
        let mut items = vec![
            ProcessExpertiseDraft::pair("ab", "c").into_record(1),
            ProcessExpertiseDraft::pair("a", "bc").into_record(2),
        ];
        assert_eq!(dedupe_by_key(&mut items, |pe| pe.pair_key(), Resolution::Remove), 0);
    }

    #[test]
    fn test_dedupe_collections_reports_pruned() {
        let mut collections = builtin_collections();
        collections.departments.push(dept(8, "Sewing Department", true));
        collections
            .process_expertise
            .push(ProcessExpertiseDraft::pair("Hemming", "Flatlock").into_record(8));

        let pruned = dedupe_collections(&mut collections, Resolution::Remove);
        assert_eq!(
            pruned,
            vec![
                Pruned {
                    collection: Collection::Departments,
                    removed: 1
                },
                Pruned {
                    collection: Collection::ProcessExpertise,
                    removed: 1
                },
            ]
        );
        assert_eq!(collections, builtin_collections());
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let mut collections = builtin_collections();
        collections.designations.push(collections.designations[0].clone());
        collections.departments.insert(0, dept(10, "Cutting Department", true));

        dedupe_collections(&mut collections, Resolution::Remove);
        let once = collections.clone();
        let second = dedupe_collections(&mut collections, Resolution::Remove);
        assert!(second.is_empty());
        assert_eq!(collections, once);
    }

    #[test]
    fn test_retire_keeps_rows_and_ids() {
        let mut items = vec![
            dept(1, "Washing", true),
            dept(2, "Washing", true),
            dept(3, "Packing", true),
        ];
        let retired = dedupe_by_key(&mut items, |d| d.name.clone(), Resolution::Retire);
        assert_eq!(retired, 1);
        assert_eq!(items.len(), 3);
        let active: Vec<u64> = items.iter().filter(|d| d.is_active).map(|d| d.id).collect();
        assert_eq!(active, vec![1, 3]);

        assert_eq!(dedupe_by_key(&mut items, |d| d.name.clone(), Resolution::Retire), 0);
    }
}
