//! HTTP server for the recordsync API.
//!
//! # API Endpoints
//!
//! | Method | Path                      | Description                         |
//! |--------|---------------------------|-------------------------------------|
//! | GET    | `/health`                 | Health check                        |
//! | POST   | `/api/{entity}/import`    | Upload a CSV and import its rows    |
//! | GET    | `/api/{entity}/export`    | Download records as CSV             |
//! | GET    | `/api/{entity}/records`   | List records as JSON                |
//! | GET    | `/api/logs`               | SSE stream for real-time logs       |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, missing_fields_response, nothing_to_export_response, ImportResponse};
use crate::collection::{Collection, RecordCollection};
use crate::config::{Config, MAX_FILE_SIZE};
use crate::error::{ExportError, ImportError, SchemaError, ServerError};
use crate::models::{EntitySchema, SCHEMAS};
use crate::parser::{decode_bytes, ensure_csv_name};
use crate::pipeline::{export_collection, parse_selection, ImportOptions, Importer};

type ApiError = (StatusCode, Json<Value>);

/// Shared server state: configuration plus one collection per entity.
pub struct AppState {
    config: Config,
    collections: HashMap<&'static str, Collection>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let collections = SCHEMAS
            .iter()
            .map(|schema| (schema.entity, Collection::for_schema(&config, schema)))
            .collect();
        Self { config, collections }
    }

    fn resolve(&self, entity: &str) -> Result<(&'static EntitySchema, &Collection), ApiError> {
        let schema = EntitySchema::by_name(entity).map_err(|e| reject(&ServerError::from(e)))?;
        let collection = self
            .collections
            .get(schema.entity)
            .ok_or_else(|| reject(&ServerError::Internal(format!("No collection for {}", schema.entity))))?;
        Ok((schema, collection))
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/logs", get(sse_logs))
        .route("/api/{entity}/import", post(import_csv))
        .route("/api/{entity}/export", get(export_csv))
        .route("/api/{entity}/records", get(list_records))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let state = Arc::new(AppState::new(config));
    for (entity, collection) in &state.collections {
        log_info(format!("{} → {}", entity, collection.describe()));
    }

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Recordsync server running on http://localhost:{}", port);
    println!("   POST /api/{{entity}}/import  - Upload CSV file");
    println!("   GET  /api/{{entity}}/export  - Download CSV");
    println!("   GET  /api/{{entity}}/records - List records");
    println!("   GET  /api/logs             - SSE log stream");
    println!("   GET  /health               - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Map an error to its HTTP status and JSON body.
fn reject(err: &ServerError) -> ApiError {
    let message = err.to_string();
    match err {
        ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, Json(error_response(&message))),
        ServerError::Import(ImportError::Schema(SchemaError::MissingFields { missing, expected })) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(missing_fields_response(&message, missing, expected)),
        ),
        ServerError::Import(ImportError::Schema(SchemaError::UnknownEntity(_))) => {
            (StatusCode::NOT_FOUND, Json(error_response(&message)))
        }
        ServerError::Import(_) => (StatusCode::BAD_REQUEST, Json(error_response(&message))),
        ServerError::Export(ExportError::EmptyInput) => {
            (StatusCode::NOT_FOUND, Json(error_response(&message)))
        }
        ServerError::Export(ExportError::Source(_)) => {
            (StatusCode::BAD_GATEWAY, Json(error_response(&message)))
        }
        ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(&message))),
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "recordsync",
        "version": env!("CARGO_PKG_VERSION"),
        "entities": SCHEMAS.iter().map(|s| s.entity).collect::<Vec<_>>()
    }))
}

/// SSE endpoint: recent log entries, then live ones
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (recent, rx) = LOG_BROADCASTER.follow();
    let backlog = tokio_stream::iter(recent);

    let stream = backlog
        .chain(BroadcastStream::new(rx).filter_map(Result::ok))
        .filter_map(|entry| {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Import endpoint: multipart upload with a `file` field.
async fn import_csv(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let (schema, collection) = state.resolve(&entity)?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(&ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| reject(&ServerError::BadRequest(format!("Read error: {}", e))))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| reject(&ServerError::BadRequest("No file provided".into())))?;
    let name = file_name.as_deref().unwrap_or_default();
    ensure_csv_name(name).map_err(|e| reject(&ServerError::from(e)))?;

    log_info(format!(
        "📄 Upload: {} ({} bytes) → {}",
        name,
        bytes.len(),
        schema.entity
    ));

    let decoded = decode_bytes(&bytes, state.config.decode_mode).map_err(|e| {
        log_error(format!("Decode failed: {}", e));
        reject(&ServerError::from(e))
    })?;

    let options = ImportOptions {
        strict_fields: state.config.strict_fields,
        batch_mode: state.config.batch_mode.clone(),
        ..ImportOptions::default()
    };
    let importer = Importer::new(schema, options).map_err(|e| reject(&ServerError::from(e)))?;
    let report = importer
        .import_decoded(collection, &decoded)
        .await
        .map_err(|e| reject(&ServerError::from(e)))?;

    Ok(Json(ImportResponse::from(report)))
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    /// Comma-separated record indexes; everything when absent.
    selected: Option<String>,
}

/// Export endpoint: CSV download.
async fn export_csv(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let (schema, collection) = state.resolve(&entity)?;
    let selected = parse_selection(query.selected.as_deref());

    let file = match export_collection(collection, schema, &selected).await {
        Ok(file) => file,
        Err(ExportError::EmptyInput) => {
            return Err((StatusCode::NOT_FOUND, Json(nothing_to_export_response(schema.entity))))
        }
        Err(e) => return Err(reject(&ServerError::from(e))),
    };

    let disposition = format!("attachment; filename=\"{}\"", file.file_name());
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| reject(&ServerError::Internal(e.to_string())))?;
    let content_type = HeaderValue::from_str(&file.mime_type)
        .map_err(|e| reject(&ServerError::Internal(e.to_string())))?;

    Ok((
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        file.content,
    )
        .into_response())
}

/// List endpoint: records as JSON.
async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (_, collection) = state.resolve(&entity)?;
    let records = collection
        .list()
        .await
        .map_err(|e| reject(&ServerError::Export(ExportError::Source(e))))?;
    Ok(Json(json!(records)))
}
