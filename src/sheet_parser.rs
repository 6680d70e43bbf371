//! Uploaded file decoding: Excel (.xlsx/.xlsm/.xlsb/.xls) and CSV into a raw grid.
//!
//! Only the first worksheet is read. The grid is absolute from cell A1, so
//! row and column indices match what the operator sees in the workbook.

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsb, Xlsx};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use std::io::Cursor;

/// One decoded cell. Text and non-text cells stay distinct because the
/// extractor only accepts text for serials and statuses.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Date/time rendered as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    DateTime(String),
    Error(String),
}

impl CellValue {
    /// The cell's text, only for text cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render any cell as display text. Whole floats drop their ".0".
    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) | Self::DateTime(s) | Self::Error(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    format!("{}", *f as i64)
                } else {
                    format!("{}", f)
                }
            }
            Self::Bool(b) => b.to_string(),
        }
    }
}

pub type RawRow = Vec<CellValue>;

/// All rows of the first sheet, header rows included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub sheet_name: String,
    pub rows: Vec<RawRow>,
}

/// Dispatch file parsing by extension.
pub fn parse_file(filename: &str, data: &[u8]) -> Result<RawGrid> {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    let grid = match ext.as_str() {
        "csv" => parse_csv(filename, data)?,
        "xlsx" | "xlsm" => {
            let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
                .context("Failed to open Excel workbook")?;
            first_sheet(workbook)?
        }
        "xlsb" => {
            let workbook: Xlsb<_> = open_workbook_from_rs(Cursor::new(data))
                .context("Failed to open Excel workbook")?;
            first_sheet(workbook)?
        }
        "xls" => {
            let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(data))
                .context("Failed to open Excel workbook")?;
            first_sheet(workbook)?
        }
        _ => anyhow::bail!(
            "Unsupported file type: .{}. Supported: .xlsx, .xlsm, .xlsb, .xls, .csv",
            ext
        ),
    };

    tracing::debug!(
        "Decoded '{}' sheet '{}' into {} rows",
        filename,
        grid.sheet_name,
        grid.rows.len()
    );
    Ok(grid)
}

/// Read the first worksheet of any calamine reader.
fn first_sheet<RS, R>(mut workbook: R) -> Result<RawGrid>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| anyhow::anyhow!("Failed to read sheet '{}': {}", name, e))?;

    Ok(RawGrid {
        rows: range_to_rows(&range),
        sheet_name: name,
    })
}

/// Convert a calamine Range into rows anchored at A1.
///
/// calamine starts a range at the first used cell, so leading empty rows and
/// columns are re-inserted as empty cells.
fn range_to_rows(range: &Range<Data>) -> Vec<RawRow> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<RawRow> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut values: RawRow = (0..start_col).map(|_| CellValue::Empty).collect();
        values.extend(row.iter().map(cell_value));
        rows.push(values);
    }
    rows
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(excel_serial_to_string(dt.as_f64())),
        Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
        Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        Data::Error(e) => CellValue::Error(format!("#ERR:{:?}", e)),
    }
}

/// Render an Excel serial date (1900 date system).
fn excel_serial_to_string(serial: f64) -> String {
    // 1899-12-30 absorbs the fictional 1900-02-29 for every date after it.
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let seconds = (serial * 86_400.0).round() as i64;
    let Some(datetime) = epoch
        .and_hms_opt(0, 0, 0)
        .and_then(|base| base.checked_add_signed(TimeDelta::try_seconds(seconds)?))
    else {
        return serial.to_string();
    };

    if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parse a CSV file. Every record, header rows included, lands in the grid.
/// The csv reader skips fully blank lines, so they are put back as empty rows
/// to keep grid row N on file line N.
fn parse_csv(filename: &str, data: &[u8]) -> Result<RawGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(data);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        if let Some(line) = record.position().map(|p| p.line() as usize) {
            while rows.len() + 1 < line {
                rows.push(RawRow::new());
            }
        }
        let row: RawRow = record
            .iter()
            .map(|f| {
                if f.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(f.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim_end_matches(".csv")
        .to_string();

    Ok(RawGrid {
        sheet_name: name,
        rows,
    })
}
