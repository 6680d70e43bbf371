//! Three-way serial comparison between spreadsheet records and the manual table.

use std::collections::HashSet;

use crate::inventory_schema::{
    ComparisonResult, ExcelStatus, ManualSerialEntry, MatchOutcome, SpreadsheetRecord,
};
use crate::normalize::{match_key, serials_match};

/// Classify every record as found / not found, then append one missing
/// result per non-blank manual serial that matches no record.
///
/// Record results come first in record order, missing results follow in
/// manual order. Matching goes through [`match_key`], which is equivalent to
/// testing every pair with [`serials_match`].
pub fn compare<S: AsRef<str>>(
    records: &[SpreadsheetRecord],
    manual_serials: &[S],
) -> Vec<ComparisonResult> {
    let manual_keys: HashSet<String> = manual_serials
        .iter()
        .map(|s| match_key(s.as_ref()))
        .collect();
    let record_keys: HashSet<String> = records
        .iter()
        .map(|r| match_key(&r.serial_number))
        .collect();

    let mut results: Vec<ComparisonResult> = records
        .iter()
        .map(|record| ComparisonResult {
            serial: record.serial_number.clone(),
            excel_status: ExcelStatus::Permitted(record.status),
            outcome: if manual_keys.contains(&match_key(&record.serial_number)) {
                MatchOutcome::Found
            } else {
                MatchOutcome::NotFound
            },
            note: String::new(),
        })
        .collect();

    for serial in manual_serials.iter().map(|s| s.as_ref()) {
        if serial.trim().is_empty() {
            continue;
        }
        if !record_keys.contains(&match_key(serial)) {
            results.push(ComparisonResult {
                serial: serial.to_string(),
                excel_status: ExcelStatus::Missing,
                outcome: MatchOutcome::Missing,
                note: String::new(),
            });
        }
    }

    tracing::debug!(
        "Compared {} records against {} manual serials: {} results",
        records.len(),
        manual_serials.len(),
        results.len()
    );
    results
}

/// Copy the note of the first matching manual entry onto found and missing
/// results. Not-found results keep an empty note.
pub fn attach_notes(
    results: Vec<ComparisonResult>,
    entries: &[ManualSerialEntry],
) -> Vec<ComparisonResult> {
    results
        .into_iter()
        .map(|result| match result.outcome {
            MatchOutcome::Found | MatchOutcome::Missing => {
                let note = entries
                    .iter()
                    .find(|entry| serials_match(&entry.serial, &result.serial))
                    .map(|entry| entry.note.clone())
                    .unwrap_or_default();
                ComparisonResult { note, ..result }
            }
            MatchOutcome::NotFound => result,
        })
        .collect()
}
