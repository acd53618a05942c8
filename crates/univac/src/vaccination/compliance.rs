use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{EmployeeRecord, VaccineType, VaccineTypeId};

/// Outcome of comparing an employee's applied vaccines against the mandatory catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceStatus {
    pub in_compliance: bool,
    pub missing: Vec<MissingVaccine>,
}

impl ComplianceStatus {
    pub fn missing_names(&self) -> Vec<&str> {
        self.missing.iter().map(|vaccine| vaccine.name.as_str()).collect()
    }
}

/// Mandatory vaccine the employee has not received yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingVaccine {
    pub id: VaccineTypeId,
    pub name: String,
}

impl From<&VaccineType> for MissingVaccine {
    fn from(vaccine: &VaccineType) -> Self {
        Self {
            id: vaccine.id,
            name: vaccine.name.clone(),
        }
    }
}

/// Filter a catalog down to the vaccine types that drive compliance.
pub fn mandatory_vaccines(catalog: &[VaccineType]) -> Vec<&VaccineType> {
    catalog.iter().filter(|vaccine| vaccine.mandatory).collect()
}

/// Missing vaccines keep the order of `mandatory`.
pub fn evaluate_compliance(
    applied: &BTreeSet<VaccineTypeId>,
    mandatory: &[&VaccineType],
) -> ComplianceStatus {
    let missing: Vec<MissingVaccine> = mandatory
        .iter()
        .filter(|vaccine| !applied.contains(&vaccine.id))
        .map(|vaccine| MissingVaccine::from(*vaccine))
        .collect();

    ComplianceStatus {
        in_compliance: missing.is_empty(),
        missing,
    }
}

/// Convenience wrapper over [`evaluate_compliance`] for a derived record.
pub fn evaluate_record(record: &EmployeeRecord, mandatory: &[&VaccineType]) -> ComplianceStatus {
    evaluate_compliance(&record.applied_vaccine_ids, mandatory)
}

/// Rounded percentage of compliant employees, or `None` for an empty roster.
pub fn compliance_rate<'a, I>(statuses: I) -> Option<u8>
where
    I: IntoIterator<Item = &'a ComplianceStatus>,
{
    let (total, compliant) = statuses
        .into_iter()
        .fold((0usize, 0usize), |(total, compliant), status| {
            (total + 1, compliant + usize::from(status.in_compliance))
        });

    if total == 0 {
        return None;
    }

    let rate = (100.0 * compliant as f64 / total as f64).round();
    Some(rate.clamp(0.0, 100.0) as u8)
}
