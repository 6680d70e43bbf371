//! Error types for the reconciliation pipeline and the inventory session.

use crate::inventory_schema::Exclusion;
use thiserror::Error;

/// Failures of [`crate::extractor::extract_records`].
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required header is absent. Fatal, no partial result.
    #[error("column \"{column}\" was not found in the spreadsheet header")]
    MissingColumn { column: String },

    /// Every data row was rejected.
    #[error(
        "no valid rows found. Check that:\n\
         1. rows carry a permitted status (Available, Awaiting Disposal, Reserved, Preparación)\n\
         2. when a 'nombre' column exists, names start with '01-' or '02-'\n\
         3. each 'nombre' ends with its 'Número de serie'\n\
         4. rows have a non-empty 'Número de serie'"
    )]
    NoValidRows { exclusions: Vec<Exclusion> },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export buffer: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("load a spreadsheet before running the comparison")]
    NoSpreadsheet,
    #[error("enter at least one serial in the table")]
    NoManualSerials,
    #[error("unknown row: {0}")]
    UnknownRow(String),
    #[error("nothing to export, run the comparison first")]
    NothingToExport,
    #[error(transparent)]
    Export(#[from] ExportError),
}
