//! Offline evaluation of an exported JSON snapshot, without a running store.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::vaccination::alerts::{Alert, AlertEngine, AlertPolicy};
use crate::vaccination::compliance::mandatory_vaccines;
use crate::vaccination::domain::{
    Appointment, Employee, EmployeeRecord, VaccineApplication, VaccineType,
};
use crate::vaccination::report::{
    pendency_rows, todays_scheduled_appointments, write_pendency_csv, PendencyRow,
};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to open snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to render pendency CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Point-in-time export of everything the evaluators read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub vaccines: Vec<VaccineType>,
    #[serde(default)]
    pub applications: Vec<VaccineApplication>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl Snapshot {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Active employees with their derived vaccine sets, in roster order.
    pub fn records(&self) -> Vec<EmployeeRecord> {
        self.employees
            .iter()
            .filter(|employee| employee.active)
            .cloned()
            .map(|employee| EmployeeRecord::derive(employee, &self.applications))
            .collect()
    }

    pub fn pendency(&self) -> Vec<PendencyRow> {
        let mandatory = mandatory_vaccines(&self.vaccines);
        pendency_rows(&self.records(), &mandatory)
    }

    pub fn pendency_csv(&self) -> Result<String, SnapshotError> {
        Ok(write_pendency_csv(&self.pendency())?)
    }

    pub fn alerts(&self, today: NaiveDate, policy: AlertPolicy) -> Vec<Alert> {
        let todays = todays_scheduled_appointments(&self.appointments, today);
        AlertEngine::new(policy).evaluate(&self.vaccines, today, todays)
    }
}
