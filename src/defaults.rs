//! Built-in reference data seeded before the durable slot is read.

use crate::persistence::Collections;

const ORGANIZATION_DEFAULTS: &str = include_str!("../defaults/organization.json");

/// Parse the embedded defaults. A broken embed degrades to empty collections.
pub fn builtin_collections() -> Collections {
    match serde_json::from_str::<Collections>(ORGANIZATION_DEFAULTS) {
        Ok(collections) => collections,
        Err(e) => {
            log::error!("Store: embedded defaults failed to parse: {}", e);
            Collections::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    #[test]
    fn test_embedded_defaults_parse() {
        serde_json::from_str::<Collections>(ORGANIZATION_DEFAULTS)
            .expect("embedded defaults must parse");
    }

    #[test]
    fn test_defaults_have_seven_active_departments() {
        let defaults = builtin_collections();
        assert_eq!(defaults.departments.len(), 7);
        assert!(defaults.departments.iter().all(|d| d.is_active()));
        let ids: Vec<u64> = defaults.departments.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_default_expertise_references_known_names() {
        let defaults = builtin_collections();
        for pe in &defaults.process_expertise {
            assert!(
                defaults.operations.iter().any(|o| o.name == pe.operation),
                "unknown operation {}",
                pe.operation
            );
            assert!(
                defaults.machines.iter().any(|m| m.name == pe.machine),
                "unknown machine {}",
                pe.machine
            );
        }
    }

    #[test]
    fn test_default_salary_grades_are_consistent() {
        let defaults = builtin_collections();
        assert!(!defaults.staff_salary_grades.is_empty());
        assert!(defaults
            .staff_salary_grades
            .iter()
            .all(|g| g.is_gross_consistent()));
    }
}
