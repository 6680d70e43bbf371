//! Inventory page state.
//!
//! Loading a spreadsheet replaces the records and clears the last comparison;
//! the manual serial table survives uploads. A failed load changes nothing.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::comparator::{attach_notes, compare};
use crate::config::ReconcileConfig;
use crate::error::{ExtractError, SessionError};
use crate::export::{self, ExportFormat, ExportedFile};
use crate::extractor::extract_records;
use crate::inventory_schema::{
    ComparisonReport, DuplicateSerial, Exclusion, ManualSerialEntry, SpreadsheetRecord,
};
use crate::sheet_parser::RawGrid;
use crate::statistics::{aggregate_by_status, aggregate_overall};

/// Editable field of a manual row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Serial,
    Note,
}

/// What a successful upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub source_file: String,
    pub record_count: usize,
    pub exclusions: Vec<Exclusion>,
}

#[derive(Debug)]
pub struct InventorySession {
    config: ReconcileConfig,
    source_file: Option<String>,
    records: Vec<SpreadsheetRecord>,
    exclusions: Vec<Exclusion>,
    rows: Vec<ManualSerialEntry>,
    report: Option<ComparisonReport>,
}

fn new_row() -> ManualSerialEntry {
    ManualSerialEntry {
        id: format!("row_{}", Uuid::new_v4().simple()),
        serial: String::new(),
        note: String::new(),
    }
}

impl InventorySession {
    /// Fresh session with a single empty manual row.
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            source_file: None,
            records: Vec::new(),
            exclusions: Vec::new(),
            rows: vec![new_row()],
            report: None,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn records(&self) -> &[SpreadsheetRecord] {
        &self.records
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn rows(&self) -> &[ManualSerialEntry] {
        &self.rows
    }

    pub fn report(&self) -> Option<&ComparisonReport> {
        self.report.as_ref()
    }

    /// Extract `grid` and, on success, replace the spreadsheet state.
    pub fn load_spreadsheet(
        &mut self,
        source_file: &str,
        grid: &RawGrid,
    ) -> Result<LoadSummary, ExtractError> {
        let extraction = extract_records(grid, &self.config)?;

        self.source_file = Some(source_file.to_string());
        self.records = extraction.records;
        self.exclusions = extraction.exclusions;
        self.report = None;

        info!(
            "Loaded '{}': {} records, {} exclusions",
            source_file,
            self.records.len(),
            self.exclusions.len()
        );
        Ok(LoadSummary {
            source_file: source_file.to_string(),
            record_count: self.records.len(),
            exclusions: self.exclusions.clone(),
        })
    }

    /// Insert an empty row after `after`, or at the end when `after` is
    /// `None` or unknown.
    pub fn add_row(&mut self, after: Option<&str>) -> &ManualSerialEntry {
        let row = new_row();
        let index = after
            .and_then(|id| self.rows.iter().position(|r| r.id == id))
            .map(|i| i + 1)
            .unwrap_or(self.rows.len());
        self.rows.insert(index, row);
        &self.rows[index]
    }

    pub fn update_row(
        &mut self,
        id: &str,
        field: RowField,
        value: impl Into<String>,
    ) -> Result<&ManualSerialEntry, SessionError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SessionError::UnknownRow(id.to_string()))?;
        match field {
            RowField::Serial => row.serial = value.into(),
            RowField::Note => row.note = value.into(),
        }
        Ok(&*row)
    }

    /// Rows whose serial is not blank.
    pub fn filled_serial_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.serial.trim().is_empty()).count()
    }

    /// Serials typed more than once, compared trimmed and lowercased. Each
    /// group reports the first spelling seen, in first-occurrence order.
    pub fn duplicate_serials(&self) -> Vec<DuplicateSerial> {
        let mut order: Vec<(String, &str)> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for serial in self.rows.iter().map(|r| r.serial.trim()) {
            if serial.is_empty() {
                continue;
            }
            let key = serial.to_lowercase();
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                order.push((key, serial));
            }
            *count += 1;
        }

        order
            .into_iter()
            .filter_map(|(key, serial)| {
                let count = counts[&key];
                (count > 1).then(|| DuplicateSerial {
                    serial: serial.to_string(),
                    count,
                })
            })
            .collect()
    }

    /// Compare the loaded records against the trimmed, non-blank manual
    /// serials and keep the report.
    pub fn run_comparison(&mut self) -> Result<&ComparisonReport, SessionError> {
        if self.records.is_empty() {
            return Err(SessionError::NoSpreadsheet);
        }
        let manual: Vec<&str> = self
            .rows
            .iter()
            .map(|r| r.serial.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if manual.is_empty() {
            return Err(SessionError::NoManualSerials);
        }

        let results = attach_notes(compare(&self.records, &manual[..]), &self.rows);
        let by_status = aggregate_by_status(&results);
        let statistics = aggregate_overall(&results, by_status);

        info!(
            "Comparison: {} results, {} found ({}%)",
            statistics.total_records, statistics.total_found, statistics.found_percentage
        );
        Ok(&*self.report.insert(ComparisonReport {
            results,
            statistics,
        }))
    }

    /// Render the last comparison. Session state is never modified.
    pub fn export(
        &self,
        format: ExportFormat,
        date: NaiveDate,
    ) -> Result<ExportedFile, SessionError> {
        let report = self
            .report
            .as_ref()
            .filter(|r| !r.results.is_empty())
            .ok_or(SessionError::NothingToExport)?;
        export::export(&report.results, format, date).map_err(|e| {
            warn!("Export failed: {}", e);
            SessionError::from(e)
        })
    }
}
