//! Reference-data entities shared by every HR screen.
//!
//! Each entity is a flat record `{ id, ...attributes, isActive }` serialized in
//! camelCase. Attributes default to empty values so hand-edited or partially
//! written snapshots still load; the store never validates them.

use serde::{Deserialize, Serialize};

/// Record identifier, unique within its collection.
pub type RecordId = u64;

/// Never assigned by the store; marks a record that was not persisted.
pub const UNASSIGNED_ID: RecordId = 0;

/// Common shape of every stored record.
pub trait Record: Clone {
    fn id(&self) -> RecordId;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

/// Records that carry a display name.
pub trait Named: Record {
    fn name(&self) -> &str;
}

/// Caller-supplied fields for a new record.
pub trait Draft {
    type Record: Record;

    fn into_record(self, id: RecordId) -> Self::Record;
}

/// Caller-supplied fields for an update. Absent fields are left untouched.
pub trait Patch {
    type Record: Record;

    fn apply(self, record: &mut Self::Record);
}

/// The seven collections held by the store, in snapshot field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Departments,
    Designations,
    ProcessExpertise,
    Operations,
    Machines,
    SkillMetrics,
    StaffSalaryGrades,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Departments,
        Collection::Designations,
        Collection::ProcessExpertise,
        Collection::Operations,
        Collection::Machines,
        Collection::SkillMetrics,
        Collection::StaffSalaryGrades,
    ];

    /// Field name used in the durable snapshot.
    pub fn field_name(self) -> &'static str {
        match self {
            Collection::Departments => "departments",
            Collection::Designations => "designations",
            Collection::ProcessExpertise => "processExpertise",
            Collection::Operations => "operations",
            Collection::Machines => "machines",
            Collection::SkillMetrics => "skillMetrics",
            Collection::StaffSalaryGrades => "staffSalaryGrades",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub head: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Designation {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form seniority label, e.g. "Mid" or "Senior".
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Pairs an operation with a machine it is performed on.
///
/// Both sides are stored by name, matching `Operation::name` and
/// `Machine::name`. Renames through the store rewrite these references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExpertise {
    pub id: RecordId,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub is_active: bool,
}

impl ProcessExpertise {
    /// Uniqueness key: the (operation, machine) pair.
    pub fn pair_key(&self) -> (String, String) {
        (self.operation.clone(), self.machine.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMetric {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Which payroll population a salary grade applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeType {
    Worker,
    #[default]
    Staff,
}

/// A salary grade schedule.
///
/// Worker grades carry `foodAllowance`, staff grades carry `mobileBill`.
/// `grossSalary` is whatever the caller stored; see [`SalaryGrade::is_gross_consistent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryGrade {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub basic_salary: f64,
    #[serde(default)]
    pub house_rent: f64,
    #[serde(default)]
    pub medical_allowance: f64,
    #[serde(default)]
    pub conveyance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_allowance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_bill: Option<f64>,
    #[serde(default)]
    pub gross_salary: f64,
    #[serde(rename = "type", default)]
    pub grade_type: GradeType,
    #[serde(default)]
    pub is_active: bool,
}

impl SalaryGrade {
    /// Sum of every salary component (excluding `grossSalary` itself).
    pub fn component_total(&self) -> f64 {
        self.basic_salary
            + self.house_rent
            + self.medical_allowance
            + self.conveyance
            + self.food_allowance.unwrap_or_default()
            + self.mobile_bill.unwrap_or_default()
    }

    /// Whether the stored gross matches the component total (to the cent).
    pub fn is_gross_consistent(&self) -> bool {
        (self.component_total() - self.gross_salary).abs() < 0.005
    }
}

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn id(&self) -> RecordId {
                    self.id
                }

                fn is_active(&self) -> bool {
                    self.is_active
                }

                fn set_active(&mut self, active: bool) {
                    self.is_active = active;
                }
            }
        )*
    };
}

macro_rules! impl_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Named for $ty {
                fn name(&self) -> &str {
                    &self.name
                }
            }
        )*
    };
}

impl_record!(
    Department,
    Designation,
    Operation,
    Machine,
    ProcessExpertise,
    SkillMetric,
    SalaryGrade,
);

impl_named!(Department, Designation, Operation, Machine, SkillMetric, SalaryGrade);

// =============================================================================
// Drafts (add) and patches (update)
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartmentDraft {
    pub name: String,
    pub description: String,
    pub head: String,
}

impl DepartmentDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Draft for DepartmentDraft {
    type Record = Department;

    fn into_record(self, id: RecordId) -> Department {
        Department {
            id,
            name: self.name,
            description: self.description,
            head: self.head,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub head: Option<String>,
}

impl Patch for DepartmentPatch {
    type Record = Department;

    fn apply(self, record: &mut Department) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(head) = self.head {
            record.head = head;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignationDraft {
    pub name: String,
    pub description: String,
    pub level: String,
}

impl DesignationDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Draft for DesignationDraft {
    type Record = Designation;

    fn into_record(self, id: RecordId) -> Designation {
        Designation {
            id,
            name: self.name,
            description: self.description,
            level: self.level,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
}

impl Patch for DesignationPatch {
    type Record = Designation;

    fn apply(self, record: &mut Designation) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(level) = self.level {
            record.level = level;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationDraft {
    pub name: String,
}

impl OperationDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Draft for OperationDraft {
    type Record = Operation;

    fn into_record(self, id: RecordId) -> Operation {
        Operation {
            id,
            name: self.name,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineDraft {
    pub name: String,
}

impl MachineDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Draft for MachineDraft {
    type Record = Machine;

    fn into_record(self, id: RecordId) -> Machine {
        Machine {
            id,
            name: self.name,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationPatch {
    pub name: Option<String>,
}

impl Patch for OperationPatch {
    type Record = Operation;

    fn apply(self, record: &mut Operation) {
        if let Some(name) = self.name {
            record.name = name;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachinePatch {
    pub name: Option<String>,
}

impl Patch for MachinePatch {
    type Record = Machine;

    fn apply(self, record: &mut Machine) {
        if let Some(name) = self.name {
            record.name = name;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessExpertiseDraft {
    pub operation: String,
    pub machine: String,
}

impl ProcessExpertiseDraft {
    pub fn pair(operation: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            machine: machine.into(),
        }
    }
}

impl Draft for ProcessExpertiseDraft {
    type Record = ProcessExpertise;

    fn into_record(self, id: RecordId) -> ProcessExpertise {
        ProcessExpertise {
            id,
            operation: self.operation,
            machine: self.machine,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessExpertisePatch {
    pub operation: Option<String>,
    pub machine: Option<String>,
}

impl Patch for ProcessExpertisePatch {
    type Record = ProcessExpertise;

    fn apply(self, record: &mut ProcessExpertise) {
        if let Some(operation) = self.operation {
            record.operation = operation;
        }
        if let Some(machine) = self.machine {
            record.machine = machine;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillMetricDraft {
    pub name: String,
    pub description: String,
    pub category: String,
}

impl Draft for SkillMetricDraft {
    type Record = SkillMetric;

    fn into_record(self, id: RecordId) -> SkillMetric {
        SkillMetric {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillMetricPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl Patch for SkillMetricPatch {
    type Record = SkillMetric;

    fn apply(self, record: &mut SkillMetric) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryGradeDraft {
    pub name: String,
    pub basic_salary: f64,
    pub house_rent: f64,
    pub medical_allowance: f64,
    pub conveyance: f64,
    pub food_allowance: Option<f64>,
    pub mobile_bill: Option<f64>,
    pub gross_salary: f64,
    #[serde(rename = "type")]
    pub grade_type: GradeType,
}

impl Draft for SalaryGradeDraft {
    type Record = SalaryGrade;

    fn into_record(self, id: RecordId) -> SalaryGrade {
        SalaryGrade {
            id,
            name: self.name,
            basic_salary: self.basic_salary,
            house_rent: self.house_rent,
            medical_allowance: self.medical_allowance,
            conveyance: self.conveyance,
            food_allowance: self.food_allowance,
            mobile_bill: self.mobile_bill,
            gross_salary: self.gross_salary,
            grade_type: self.grade_type,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryGradePatch {
    pub name: Option<String>,
    pub basic_salary: Option<f64>,
    pub house_rent: Option<f64>,
    pub medical_allowance: Option<f64>,
    pub conveyance: Option<f64>,
    pub food_allowance: Option<f64>,
    pub mobile_bill: Option<f64>,
    pub gross_salary: Option<f64>,
    #[serde(rename = "type")]
    pub grade_type: Option<GradeType>,
}

impl Patch for SalaryGradePatch {
    type Record = SalaryGrade;

    fn apply(self, record: &mut SalaryGrade) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(v) = self.basic_salary {
            record.basic_salary = v;
        }
        if let Some(v) = self.house_rent {
            record.house_rent = v;
        }
        if let Some(v) = self.medical_allowance {
            record.medical_allowance = v;
        }
        if let Some(v) = self.conveyance {
            record.conveyance = v;
        }
        if let Some(v) = self.food_allowance {
            record.food_allowance = Some(v);
        }
        if let Some(v) = self.mobile_bill {
            record.mobile_bill = Some(v);
        }
        if let Some(v) = self.gross_salary {
            record.gross_salary = v;
        }
        if let Some(t) = self.grade_type {
            record.grade_type = t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_serializes_camel_case() {
        let dept = DepartmentDraft::named("Cutting").into_record(4);
        let json = serde_json::to_value(&dept).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["name"], "Cutting");
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn test_missing_attributes_load_as_blank() {
        let dept: Department = serde_json::from_str(r#"{"id": 9, "isActive": true}"#).unwrap();
        assert_eq!(dept.name, "");
        assert_eq!(dept.head, "");
        assert!(dept.is_active);
    }

    #[test]
    fn test_missing_is_active_reads_as_inactive() {
        let op: Operation = serde_json::from_str(r#"{"id": 1, "name": "Hemming"}"#).unwrap();
        assert!(!op.is_active);
    }

    #[test]
    fn test_salary_grade_type_field() {
        let grade: SalaryGrade = serde_json::from_str(
            r#"{"id": 1, "name": "W-1", "basicSalary": 100, "houseRent": 50,
                "medicalAllowance": 10, "conveyance": 5, "foodAllowance": 15,
                "grossSalary": 180, "type": "Worker", "isActive": true}"#,
        )
        .unwrap();
        assert_eq!(grade.grade_type, GradeType::Worker);
        assert_eq!(grade.component_total(), 180.0);
        assert!(grade.is_gross_consistent());

        let json = serde_json::to_value(&grade).unwrap();
        assert_eq!(json["type"], "Worker");
        assert!(json.get("mobileBill").is_none());
    }

    #[test]
    fn test_gross_divergence_detected() {
        let mut grade = SalaryGradeDraft {
            name: "S-1".into(),
            basic_salary: 1000.0,
            house_rent: 500.0,
            gross_salary: 1500.0,
            ..Default::default()
        }
        .into_record(1);
        assert!(grade.is_gross_consistent());

        SalaryGradePatch {
            basic_salary: Some(1200.0),
            ..Default::default()
        }
        .apply(&mut grade);
        assert_eq!(grade.gross_salary, 1500.0);
        assert!(!grade.is_gross_consistent());
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let mut dept = DepartmentDraft {
            name: "Sewing".into(),
            description: "Lines 1-6".into(),
            head: "R. Karim".into(),
        }
        .into_record(2);
        DepartmentPatch {
            head: Some("S. Akter".into()),
            ..Default::default()
        }
        .apply(&mut dept);
        assert_eq!(dept.name, "Sewing");
        assert_eq!(dept.description, "Lines 1-6");
        assert_eq!(dept.head, "S. Akter");
    }

    #[test]
    fn test_collection_field_names() {
        let names: Vec<&str> = Collection::ALL.iter().map(|c| c.field_name()).collect();
        assert_eq!(
            names,
            vec![
                "departments",
                "designations",
                "processExpertise",
                "operations",
                "machines",
                "skillMetrics",
                "staffSalaryGrades",
            ]
        );
    }
}
