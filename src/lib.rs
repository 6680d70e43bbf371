//! Inventory Reconciler - spreadsheet vs. manual serial reconciliation.
//!
//! Pipeline: [`sheet_parser`] decodes the upload, [`extractor`] validates
//! rows, [`comparator`] classifies serials, [`statistics`] aggregates and
//! [`export`] renders the result. [`session`] holds the page state between
//! steps.

pub mod comparator;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod inventory_schema;
pub mod normalize;
pub mod session;
pub mod sheet_parser;
pub mod statistics;

pub use comparator::{attach_notes, compare};
pub use error::{ExportError, ExtractError, SessionError};
pub use extractor::extract_records;
pub use normalize::{normalize, serials_match};
pub use statistics::{aggregate_by_status, aggregate_overall};
