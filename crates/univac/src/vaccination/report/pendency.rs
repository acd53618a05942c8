use serde::Serialize;

use super::super::compliance::{evaluate_record, ComplianceStatus};
use super::super::domain::{Employee, EmployeeRecord, VaccineType};

pub const PENDENCY_HEADER: [&str; 5] = ["Nome", "Email", "Registro", "Status", "Vacinas Pendentes"];
pub const PENDING_STATUS: &str = "Pendente";

/// One non-compliant employee and the mandatory vaccines they still need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendencyRow {
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub status: &'static str,
    pub pending_vaccines: Vec<String>,
}

impl PendencyRow {
    fn from_status(employee: &Employee, status: &ComplianceStatus) -> Self {
        Self {
            name: employee.name.clone(),
            email: employee.email.clone(),
            registration_number: employee.registration_number.clone(),
            status: PENDING_STATUS,
            pending_vaccines: status
                .missing_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    fn leading_fields(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.email.as_str(),
            self.registration_number.as_str(),
            self.status,
        ]
    }
}

/// Rows follow the order of `records`; compliant employees are skipped.
pub fn pendency_rows(records: &[EmployeeRecord], mandatory: &[&VaccineType]) -> Vec<PendencyRow> {
    records
        .iter()
        .filter_map(|record| {
            let status = evaluate_record(record, mandatory);
            if status.in_compliance {
                None
            } else {
                Some(PendencyRow::from_status(&record.employee, &status))
            }
        })
        .collect()
}

/// Render the pendency report as CSV text, header included.
///
/// The pending-vaccine column is always quoted; the other fields only when needed.
pub fn write_pendency_csv(rows: &[PendencyRow]) -> Result<String, csv::Error> {
    let mut bytes = encode_record(csv::QuoteStyle::Necessary, PENDENCY_HEADER)?;
    for row in rows {
        let mut leading = encode_record(csv::QuoteStyle::Necessary, row.leading_fields())?;
        // Continue the same line: swap the record terminator for a delimiter.
        leading.pop();
        leading.push(b',');
        bytes.extend(leading);
        bytes.extend(encode_record(
            csv::QuoteStyle::Always,
            [row.pending_vaccines.join(", ")],
        )?);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn encode_record<I, T>(quote_style: csv::QuoteStyle, fields: I) -> Result<Vec<u8>, csv::Error>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(quote_style)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|error| csv::Error::from(error.into_error()))
}
