//! Inventory Reconciler - local service behind the inventory reconciliation page.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use inventory_reconciler::{
    config::{ReconcileConfig, ServerConfig},
    error::{ExtractError, SessionError},
    export::ExportFormat,
    inventory_schema::{
        ComparisonReport, DuplicateSerial, Exclusion, ManualSerialEntry, SpreadsheetRecord,
    },
    session::{InventorySession, LoadSummary, RowField},
    sheet_parser,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ApiError = (StatusCode, String);

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<RwLock<InventorySession>>,
}

impl AppState {
    fn read(&self) -> RwLockReadGuard<'_, InventorySession> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InventorySession> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "inventory_reconciler=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_config = ServerConfig::from_env()?;
    let reconcile_config = ReconcileConfig::load_or_default(&server_config.reconcile_config_path)?;
    info!(
        "Header row {}, columns: serial='{}', status='{}', name='{}', prefixes={:?}",
        reconcile_config.header_row,
        reconcile_config.serial_column,
        reconcile_config.status_column,
        reconcile_config.name_column,
        reconcile_config.name_prefixes
    );

    let state = AppState {
        session: Arc::new(RwLock::new(InventorySession::new(reconcile_config))),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/inventory/upload", post(upload_spreadsheet))
        .route("/inventory/records", get(get_records))
        .route("/inventory/rows", get(list_rows).post(add_row))
        .route("/inventory/rows/:id", put(update_row))
        .route("/inventory/compare", post(run_comparison))
        .route("/inventory/results", get(get_results))
        .route("/inventory/export", get(export_results))
        .layer(DefaultBodyLimit::max(server_config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr).await?;
    info!("Server listening on http://{}", server_config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upload a spreadsheet and replace the loaded records.
async fn upload_spreadsheet(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoadSummary>, ApiError> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("inventario.xlsx").to_string();
            file_data = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
            })?.to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    let grid = sheet_parser::parse_file(&filename, &file_data).map_err(|e| {
        warn!("Could not decode {}: {:#}", filename, e);
        (
            StatusCode::BAD_REQUEST,
            format!("Could not read the spreadsheet, check that the file is valid: {:#}", e),
        )
    })?;

    let summary = state
        .write()
        .load_spreadsheet(&filename, &grid)
        .map_err(extract_error)?;
    Ok(Json(summary))
}

#[derive(Serialize)]
struct RecordsView {
    source_file: Option<String>,
    records: Vec<SpreadsheetRecord>,
    exclusions: Vec<Exclusion>,
}

/// Loaded records and the rows excluded from the last upload.
async fn get_records(State(state): State<AppState>) -> Json<RecordsView> {
    let session = state.read();
    let view = RecordsView {
        source_file: session.source_file().map(str::to_string),
        records: session.records().to_vec(),
        exclusions: session.exclusions().to_vec(),
    };
    Json(view)
}

#[derive(Serialize)]
struct RowsView {
    rows: Vec<ManualSerialEntry>,
    filled_serials: usize,
    duplicates: Vec<DuplicateSerial>,
}

fn rows_view(session: &InventorySession) -> RowsView {
    RowsView {
        rows: session.rows().to_vec(),
        filled_serials: session.filled_serial_count(),
        duplicates: session.duplicate_serials(),
    }
}

/// Manual rows with the filled count and duplicate serials.
async fn list_rows(State(state): State<AppState>) -> Json<RowsView> {
    let view = rows_view(&state.read());
    Json(view)
}

#[derive(Deserialize)]
struct AddRowRequest {
    after: Option<String>,
}

/// Append a manual row, or insert it after `after`.
async fn add_row(
    State(state): State<AppState>,
    body: Option<Json<AddRowRequest>>,
) -> (StatusCode, Json<ManualSerialEntry>) {
    let after = body.and_then(|Json(req)| req.after);
    let row = state.write().add_row(after.as_deref()).clone();
    (StatusCode::CREATED, Json(row))
}

#[derive(Deserialize)]
struct UpdateRowRequest {
    serial: Option<String>,
    note: Option<String>,
}

/// Edit the serial and/or note of a manual row.
async fn update_row(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRowRequest>,
) -> Result<Json<RowsView>, ApiError> {
    let mut session = state.write();
    if let Some(serial) = req.serial {
        session
            .update_row(&id, RowField::Serial, serial)
            .map_err(session_error)?;
    }
    if let Some(note) = req.note {
        session
            .update_row(&id, RowField::Note, note)
            .map_err(session_error)?;
    }
    let view = rows_view(&session);
    Ok(Json(view))
}

/// Compare the manual serials against the loaded records.
async fn run_comparison(
    State(state): State<AppState>,
) -> Result<Json<ComparisonReport>, ApiError> {
    let mut session = state.write();
    let report = session.run_comparison().map_err(session_error)?.clone();
    Ok(Json(report))
}

/// Last comparison report, 404 before the first run.
async fn get_results(State(state): State<AppState>) -> Result<Json<ComparisonReport>, StatusCode> {
    let report = state.read().report().cloned();
    report.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<ExportFormat>,
}

/// Download the last comparison as xlsx (default) or csv.
async fn export_results(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = query.format.unwrap_or_default();
    let today = chrono::Utc::now().date_naive();
    let file = state.read().export(format, today).map_err(session_error)?;

    let headers = [
        (header::CONTENT_TYPE, file.format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    Ok((headers, file.bytes))
}

// ============================================================================
// Error mapping
// ============================================================================

fn extract_error(err: ExtractError) -> ApiError {
    match &err {
        ExtractError::MissingColumn { .. } => {
            warn!("Upload rejected: {}", err);
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        ExtractError::NoValidRows { exclusions } => {
            warn!("Upload rejected: no valid rows ({} exclusions)", exclusions.len());
            let mut message = err.to_string();
            if !exclusions.is_empty() {
                message.push_str("\n\nExcluded rows:");
                for exclusion in exclusions {
                    message.push_str(&format!(
                        "\n- row {} ({}): {}",
                        exclusion.row, exclusion.label, exclusion.reason
                    ));
                }
            }
            (StatusCode::UNPROCESSABLE_ENTITY, message)
        }
    }
}

fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::UnknownRow(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SessionError::Export(e) => {
            error!("Export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to export the file, please try again".to_string(),
            )
        }
        SessionError::NoSpreadsheet
        | SessionError::NoManualSerials
        | SessionError::NothingToExport => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}
