//! Spreadsheet row extraction: header resolution, row validation and
//! name/serial consistency filtering.

use crate::config::ReconcileConfig;
use crate::error::ExtractError;
use crate::inventory_schema::{
    Exclusion, ExclusionReason, Extraction, PermittedStatus, SpreadsheetRecord,
};
use crate::sheet_parser::{CellValue, RawGrid};
use tracing::{debug, info};

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Column indices resolved once from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub serial: usize,
    pub status: usize,
    /// `None` disables name filtering.
    pub name: Option<usize>,
}

impl ColumnMap {
    /// Resolve required and optional columns. The status column is checked
    /// before the serial column.
    pub fn resolve(header: &[CellValue], config: &ReconcileConfig) -> Result<Self, ExtractError> {
        let status = find_column(header, &config.status_column).ok_or_else(|| {
            ExtractError::MissingColumn {
                column: config.status_column.clone(),
            }
        })?;
        let serial = find_column(header, &config.serial_column).ok_or_else(|| {
            ExtractError::MissingColumn {
                column: config.serial_column.clone(),
            }
        })?;
        let name = find_column(header, &config.name_column);

        Ok(Self {
            serial,
            status,
            name,
        })
    }
}

/// First header cell whose trimmed text equals `name`, ignoring case.
fn find_column(header: &[CellValue], name: &str) -> Option<usize> {
    let wanted = name.to_lowercase();
    header.iter().position(|cell| {
        cell.as_text()
            .map(|h| h.trim().to_lowercase() == wanted)
            .unwrap_or(false)
    })
}

fn cell(row: &[CellValue], index: usize) -> &CellValue {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// The serial must close the name as its own `-`-separated segment:
/// "01-XJ200" and "01-LAP-XJ200" bind to "XJ200", "01-ABXJ200" does not.
fn name_ends_with_serial(name: &str, serial: &str) -> bool {
    match name.strip_suffix(serial) {
        Some("") => true,
        Some(head) => head.ends_with('-'),
        None => false,
    }
}

/// Name text used for the prefix and serial checks. Zero and `false` cells
/// count as no name, the same as a blank cell.
fn name_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Int(0) | CellValue::Bool(false) => String::new(),
        CellValue::Float(f) if *f == 0.0 => String::new(),
        other => other.display_text(),
    }
}

fn row_label(sheet_row: usize) -> String {
    format!("Fila {}", sheet_row)
}

/// Extract validated records from a decoded sheet.
///
/// Rows above `config.header_row` are ignored. Rejected rows are dropped and
/// reported in [`Extraction::exclusions`]; if nothing survives the call fails
/// with [`ExtractError::NoValidRows`].
pub fn extract_records(grid: &RawGrid, config: &ReconcileConfig) -> Result<Extraction, ExtractError> {
    let skip = config.header_row.saturating_sub(1);
    let data = grid.rows.get(skip..).unwrap_or_default();

    let Some(header) = data.first() else {
        return Err(ExtractError::NoValidRows {
            exclusions: Vec::new(),
        });
    };
    let columns = ColumnMap::resolve(header, config)?;
    debug!("Resolved columns in sheet '{}': {:?}", grid.sheet_name, columns);

    let mut records = Vec::new();
    let mut exclusions = Vec::new();

    for (offset, row) in data.iter().enumerate().skip(1) {
        let sheet_row = skip + offset + 1;
        let status_cell = cell(row, columns.status);
        let serial_cell = cell(row, columns.serial);

        let Some(status) = status_cell
            .as_text()
            .map(str::trim)
            .and_then(PermittedStatus::parse)
        else {
            // Blank rows are dropped silently.
            if !serial_cell.is_empty() {
                let serial_text = serial_cell.display_text().trim().to_string();
                exclusions.push(Exclusion {
                    row: sheet_row,
                    label: if serial_text.is_empty() {
                        row_label(sheet_row)
                    } else {
                        serial_text
                    },
                    reason: ExclusionReason::InvalidStatus {
                        value: status_cell.display_text(),
                    },
                });
            }
            continue;
        };

        let serial = match serial_cell.as_text().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                exclusions.push(Exclusion {
                    row: sheet_row,
                    label: row_label(sheet_row),
                    reason: ExclusionReason::EmptySerial,
                });
                continue;
            }
        };

        if let Some(name_index) = columns.name {
            let name = name_text(cell(row, name_index));
            let name = name.trim();
            if !name.is_empty() {
                if !config
                    .name_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
                {
                    exclusions.push(Exclusion {
                        row: sheet_row,
                        label: serial.to_string(),
                        reason: ExclusionReason::NamePrefix {
                            name: name.to_string(),
                        },
                    });
                    continue;
                }
                if !name_ends_with_serial(name, serial) {
                    exclusions.push(Exclusion {
                        row: sheet_row,
                        label: serial.to_string(),
                        reason: ExclusionReason::NameSerialMismatch {
                            name: name.to_string(),
                            serial: serial.to_string(),
                        },
                    });
                    continue;
                }
            }
        }

        records.push(SpreadsheetRecord {
            serial_number: serial.to_string(),
            status,
        });
    }

    for exclusion in &exclusions {
        debug!(
            "Excluded row {} ({}): {}",
            exclusion.row, exclusion.label, exclusion.reason
        );
    }
    info!(
        "Extracted {} records from sheet '{}' ({} rows excluded)",
        records.len(),
        grid.sheet_name,
        exclusions.len()
    );

    if records.is_empty() {
        return Err(ExtractError::NoValidRows { exclusions });
    }

    Ok(Extraction {
        records,
        exclusions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two preamble rows, then `rows` starting with the header at sheet row 3.
    fn grid(rows: &[&[&str]]) -> RawGrid {
        let mut all = vec![
            vec![CellValue::Text("Reporte de inventario".to_string())],
            Vec::new(),
        ];
        all.extend(rows.iter().map(|row| {
            row.iter()
                .map(|v| {
                    if v.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect()
        }));
        RawGrid {
            sheet_name: "Hoja1".to_string(),
            rows: all,
        }
    }

    const HEADER: &[&str] = &["nombre", "Número de serie", "Estado"];

    fn extract(rows: &[&[&str]]) -> Result<Extraction, ExtractError> {
        extract_records(&grid(rows), &ReconcileConfig::default())
    }

    #[test]
    fn test_accepts_prefixed_name_ending_with_serial() {
        let extraction = extract(&[HEADER, &["01-XJ200", "XJ200", "Available"]]).unwrap();
        assert_eq!(
            extraction.records,
            vec![SpreadsheetRecord {
                serial_number: "XJ200".to_string(),
                status: PermittedStatus::Available,
            }]
        );
        assert!(extraction.exclusions.is_empty());
    }

    #[test]
    fn test_rejects_disallowed_prefix() {
        let extraction = extract(&[
            HEADER,
            &["03-XJ200", "XJ200", "Available"],
            &["02-KL1", "KL1", "Reserved"],
        ])
        .unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].serial_number, "KL1");
        assert_eq!(
            extraction.exclusions,
            vec![Exclusion {
                row: 4,
                label: "XJ200".to_string(),
                reason: ExclusionReason::NamePrefix {
                    name: "03-XJ200".to_string()
                },
            }]
        );
    }

    #[test]
    fn test_rejects_name_not_ending_with_serial() {
        let err = extract(&[HEADER, &["01-ABXJ200", "XJ200", "Available"]]).unwrap_err();
        let ExtractError::NoValidRows { exclusions } = err else {
            panic!("expected NoValidRows");
        };
        assert!(matches!(
            exclusions[0].reason,
            ExclusionReason::NameSerialMismatch { .. }
        ));
    }

    #[test]
    fn test_serial_must_close_the_name() {
        assert!(name_ends_with_serial("01-XJ200", "XJ200"));
        assert!(name_ends_with_serial("02-LAPTOP-XJ200", "XJ200"));
        assert!(name_ends_with_serial("01-AB-12", "AB-12"));
        assert!(!name_ends_with_serial("01-ABXJ200", "XJ200"));
        assert!(!name_ends_with_serial("01-XJ200X", "XJ200"));

        // Byte-for-byte: case differences do not bind.
        let err = extract(&[HEADER, &["01-xj200", "XJ200", "Available"]]).unwrap_err();
        assert!(matches!(err, ExtractError::NoValidRows { .. }));
    }

    #[test]
    fn test_rejects_unknown_status() {
        let err = extract(&[HEADER, &["01-XJ200", "XJ200", "Broken"]]).unwrap_err();
        let ExtractError::NoValidRows { exclusions } = err else {
            panic!("expected NoValidRows");
        };
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions[0].label, "XJ200");
        assert_eq!(
            exclusions[0].reason,
            ExclusionReason::InvalidStatus {
                value: "Broken".to_string()
            }
        );
    }

    #[test]
    fn test_status_and_serial_are_trimmed() {
        let extraction = extract(&[HEADER, &["", "  XJ200 ", " Preparación "]]).unwrap();
        assert_eq!(extraction.records[0].serial_number, "XJ200");
        assert_eq!(extraction.records[0].status, PermittedStatus::Preparacion);
    }

    #[test]
    fn test_blank_rows_dropped_without_diagnostics() {
        let extraction = extract(&[
            HEADER,
            &["", "", ""],
            &["01-A1", "A1", "Reserved"],
            &[],
        ])
        .unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert!(extraction.exclusions.is_empty());
    }

    #[test]
    fn test_empty_serial_reports_row_label() {
        let extraction = extract(&[
            HEADER,
            &["01-A1", "   ", "Reserved"],
            &["01-A1", "A1", "Reserved"],
        ])
        .unwrap();
        assert_eq!(extraction.exclusions[0].label, "Fila 4");
        assert_eq!(extraction.exclusions[0].reason, ExclusionReason::EmptySerial);
    }

    #[test]
    fn test_non_text_serial_rejected() {
        let mut raw = grid(&[HEADER, &["01-A1", "A1", "Reserved"]]);
        raw.rows.push(vec![
            CellValue::Empty,
            CellValue::Int(12345),
            CellValue::Text("Available".to_string()),
        ]);
        let extraction = extract_records(&raw, &ReconcileConfig::default()).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.exclusions[0].reason, ExclusionReason::EmptySerial);
    }

    #[test]
    fn test_numeric_name_is_rendered_for_checks() {
        let mut raw = grid(&[&["nombre", "Número de serie", "Estado"]]);
        raw.rows.push(vec![
            CellValue::Float(1200.0),
            CellValue::Text("1200".to_string()),
            CellValue::Text("Available".to_string()),
        ]);
        raw.rows.push(vec![
            CellValue::Empty,
            CellValue::Text("B2".to_string()),
            CellValue::Text("Available".to_string()),
        ]);
        let extraction = extract_records(&raw, &ReconcileConfig::default()).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(
            extraction.exclusions[0].reason,
            ExclusionReason::NamePrefix {
                name: "1200".to_string()
            }
        );
    }

    #[test]
    fn test_zero_and_false_names_skip_name_checks() {
        let mut raw = grid(&[HEADER]);
        for (i, name) in [
            CellValue::Int(0),
            CellValue::Float(0.0),
            CellValue::Bool(false),
        ]
        .into_iter()
        .enumerate()
        {
            raw.rows.push(vec![
                name,
                CellValue::Text(format!("Z{}", i)),
                CellValue::Text("Reserved".to_string()),
            ]);
        }
        raw.rows.push(vec![
            CellValue::Bool(true),
            CellValue::Text("Z9".to_string()),
            CellValue::Text("Reserved".to_string()),
        ]);

        let extraction = extract_records(&raw, &ReconcileConfig::default()).unwrap();
        assert_eq!(extraction.records.len(), 3);
        assert_eq!(extraction.exclusions.len(), 1);
        assert_eq!(
            extraction.exclusions[0].reason,
            ExclusionReason::NamePrefix {
                name: "true".to_string()
            }
        );
    }

    #[test]
    fn test_without_name_column_rows_accepted_unconditionally() {
        let extraction = extract(&[
            &["Estado", "Número de serie"],
            &["Awaiting Disposal", "ZZ-1"],
        ])
        .unwrap();
        assert_eq!(extraction.records[0].status, PermittedStatus::AwaitingDisposal);
    }

    #[test]
    fn test_header_match_is_case_insensitive_and_trimmed() {
        let extraction = extract(&[
            &[" NOMBRE ", "número DE SERIE", "  estado"],
            &["02-Q9", "Q9", "Reserved"],
        ])
        .unwrap();
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn test_missing_status_column_reported_first() {
        let err = extract(&[&["nombre", "Serial"], &["01-A", "A"]]).unwrap_err();
        match err {
            ExtractError::MissingColumn { column } => assert_eq!(column, "Estado"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_serial_column() {
        let err = extract(&[&["Estado"], &["Available"]]).unwrap_err();
        assert!(err.to_string().contains("Número de serie"));
    }

    #[test]
    fn test_rows_above_header_are_ignored() {
        let mut raw = grid(&[HEADER, &["01-A1", "A1", "Reserved"]]);
        raw.rows[0] = vec![
            CellValue::Text("Estado".to_string()),
            CellValue::Text("Número de serie".to_string()),
        ];
        let extraction = extract_records(&raw, &ReconcileConfig::default()).unwrap();
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn test_empty_grid_has_no_valid_rows() {
        let err = extract_records(&RawGrid::default(), &ReconcileConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::NoValidRows { .. }));
    }

    #[test]
    fn test_custom_header_row_and_prefixes() {
        let config = ReconcileConfig {
            header_row: 1,
            name_prefixes: vec!["03-".to_string()],
            ..ReconcileConfig::default()
        };
        let raw = RawGrid {
            sheet_name: "s".to_string(),
            rows: vec![
                vec![
                    CellValue::Text("nombre".to_string()),
                    CellValue::Text("Número de serie".to_string()),
                    CellValue::Text("Estado".to_string()),
                ],
                vec![
                    CellValue::Text("03-XJ200".to_string()),
                    CellValue::Text("XJ200".to_string()),
                    CellValue::Text("Available".to_string()),
                ],
            ],
        };
        let extraction = extract_records(&raw, &config).unwrap();
        assert_eq!(extraction.records.len(), 1);
    }
}
