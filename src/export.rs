//! Comparison export to xlsx or csv.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;

use crate::error::ExportError;
use crate::inventory_schema::ComparisonResult;

pub const EXPORT_SHEET_NAME: &str = "Comparación";
pub const EXPORT_HEADERS: [&str; 4] = ["Número de serie", "Estado Excel", "Coincidencia", "Observación"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A rendered export ready to be downloaded.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// `inventario_comparacion_YYYY-MM-DD.<ext>`
pub fn export_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "inventario_comparacion_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

fn export_row(result: &ComparisonResult) -> [&str; 4] {
    [
        &result.serial,
        result.excel_status.as_str(),
        result.outcome.label(),
        &result.note,
    ]
}

/// Single-sheet workbook, bold header row, one row per result.
pub fn write_xlsx(results: &[ComparisonResult]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (index, result) in results.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, value) in export_row(result).iter().enumerate() {
            sheet.write_string(row, col as u16, *value)?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

pub fn write_csv(results: &[ComparisonResult]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for result in results {
        writer.write_record(export_row(result))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Render `results` in `format`, named after `date`.
pub fn export(
    results: &[ComparisonResult],
    format: ExportFormat,
    date: NaiveDate,
) -> Result<ExportedFile, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => write_xlsx(results)?,
        ExportFormat::Csv => write_csv(results)?,
    };
    let filename = export_filename(format, date);
    tracing::info!(
        "Exported {} results to {} ({} bytes)",
        results.len(),
        filename,
        bytes.len()
    );
    Ok(ExportedFile {
        filename,
        format,
        bytes,
    })
}
