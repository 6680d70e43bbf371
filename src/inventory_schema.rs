//! Inventory reconciliation value types.
//!
//! Input statuses ([`PermittedStatus`]) and output statuses ([`ExcelStatus`])
//! are separate types: the "Faltante" sentinel only exists on the output side.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Equipment states accepted from the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermittedStatus {
    #[serde(rename = "Available")]
    Available,
    #[serde(rename = "Awaiting Disposal")]
    AwaitingDisposal,
    #[serde(rename = "Reserved")]
    Reserved,
    #[serde(rename = "Preparación")]
    Preparacion,
}

impl PermittedStatus {
    /// Every permitted status, in reporting order.
    pub const ALL: [PermittedStatus; 4] = [
        PermittedStatus::Available,
        PermittedStatus::AwaitingDisposal,
        PermittedStatus::Reserved,
        PermittedStatus::Preparacion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::AwaitingDisposal => "Awaiting Disposal",
            Self::Reserved => "Reserved",
            Self::Preparacion => "Preparación",
        }
    }

    /// Parse an already-trimmed cell value. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for PermittedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shown next to a comparison result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExcelStatus {
    Permitted(PermittedStatus),
    /// Manual serial that is absent from the spreadsheet.
    Missing,
}

impl ExcelStatus {
    pub const MISSING_LABEL: &'static str = "Faltante";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permitted(status) => status.as_str(),
            Self::Missing => Self::MISSING_LABEL,
        }
    }
}

impl fmt::Display for ExcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExcelStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A validated spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetRecord {
    pub serial_number: String,
    pub status: PermittedStatus,
}

/// A serial typed by the operator in the manual table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualSerialEntry {
    pub id: String,
    pub serial: String,
    pub note: String,
}

/// Three-way classification of a compared serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Found,
    NotFound,
    Missing,
}

impl MatchOutcome {
    /// Label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found => "Encontrado",
            Self::NotFound => "No Encontrado",
            Self::Missing => "Faltante",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Serial as spelled in its source (spreadsheet or manual table).
    pub serial: String,
    pub excel_status: ExcelStatus,
    pub outcome: MatchOutcome,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusStatistics {
    pub status: PermittedStatus,
    pub total: usize,
    pub found_count: usize,
    pub not_found_count: usize,
    pub found_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStatistics {
    /// Includes missing results, unlike the per-status totals.
    pub total_records: usize,
    pub total_found: usize,
    pub total_not_found: usize,
    pub found_percentage: f64,
    pub by_status: Vec<StatusStatistics>,
}

/// Why a spreadsheet row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    InvalidStatus { value: String },
    EmptySerial,
    NamePrefix { name: String },
    NameSerialMismatch { name: String, serial: String },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStatus { value } => write!(f, "invalid or empty status: \"{}\"", value),
            Self::EmptySerial => f.write_str("empty or invalid serial number"),
            Self::NamePrefix { name } => write!(f, "name without a permitted prefix: \"{}\"", name),
            Self::NameSerialMismatch { name, serial } => {
                write!(f, "name \"{}\" does not end with serial \"{}\"", name, serial)
            }
        }
    }
}

/// Audit entry for a dropped row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// 1-indexed row in the sheet.
    pub row: usize,
    /// Trimmed serial, or "Fila N" when the serial is blank.
    pub label: String,
    pub reason: ExclusionReason,
}

/// Successful extractor output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub records: Vec<SpreadsheetRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

/// Manual serial typed more than once (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSerial {
    pub serial: String,
    pub count: usize,
}

/// Output of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub results: Vec<ComparisonResult>,
    pub statistics: OverallStatistics,
}
