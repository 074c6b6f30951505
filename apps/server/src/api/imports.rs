use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{extract::State, routing::post, Json, Router};
use chrono::{Local, NaiveDate};
use income_clarity_core::import::{
    Broker, ColumnMapping, HoldingInput, ImportMethod, ImportRecord, ImportSession, ImportSummary,
    RawRow, SourceRows, StatusFilter,
};
use serde::{Deserialize, Serialize};

/// Reference date for the future-date check: the server's local date.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Deserialize)]
struct ParseBody {
    method: String,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseResponse {
    #[serde(flatten)]
    source: SourceRows,
    detected_broker: Option<Broker>,
}

async fn parse_import(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParseBody>,
) -> ApiResult<Json<ParseResponse>> {
    let method: ImportMethod = body.method.parse()?;
    let outcome = state.import_service.read_source(method, &body.content)?;
    Ok(Json(ParseResponse {
        source: outcome.source,
        detected_broker: outcome.detected_broker,
    }))
}

#[derive(Deserialize)]
struct MappingBody {
    headers: Vec<String>,
}

async fn infer_mapping(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MappingBody>,
) -> ApiResult<Json<ColumnMapping>> {
    if body.headers.is_empty() {
        return Err(ApiError::BadRequest("headers must not be empty".to_string()));
    }
    Ok(Json(state.import_service.infer_mapping(&body.headers)))
}

#[derive(Deserialize)]
struct PreviewBody {
    method: String,
    content: String,
    #[serde(default)]
    mapping: Option<ColumnMapping>,
}

async fn preview_import(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PreviewBody>,
) -> ApiResult<Json<ImportSession>> {
    let method: ImportMethod = body.method.parse()?;
    let today = today();
    let session = state
        .import_service
        .start_session(method, &body.content, today)?;
    let session = match body.mapping {
        Some(mapping) => state.import_service.remap(session, mapping, today)?,
        None => session,
    };
    Ok(Json(session))
}

#[derive(Deserialize)]
struct RemapBody {
    session: ImportSession,
    mapping: ColumnMapping,
}

async fn remap_import(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RemapBody>,
) -> ApiResult<Json<ImportSession>> {
    let session = state
        .import_service
        .remap(body.session, body.mapping, today())?;
    Ok(Json(session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviseBody {
    session: ImportSession,
    row_index: usize,
    row: RawRow,
}

async fn revise_import_row(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReviseBody>,
) -> ApiResult<Json<ImportSession>> {
    let session = state
        .import_service
        .revise_row(body.session, body.row_index, body.row)?;
    Ok(Json(session))
}

#[derive(Deserialize)]
struct RecordsBody {
    session: ImportSession,
    #[serde(default)]
    status: StatusFilter,
}

async fn list_import_records(Json(body): Json<RecordsBody>) -> ApiResult<Json<Vec<ImportRecord>>> {
    let records = body
        .session
        .records_with_status(body.status)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(records))
}

#[derive(Deserialize)]
struct CommitBody {
    session: ImportSession,
}

#[derive(Serialize)]
struct CommitResponse {
    holdings: Vec<HoldingInput>,
    summary: ImportSummary,
}

/// Re-validates the client's session before selecting holdings, so only
/// statuses computed here decide what is forwarded.
async fn commit_import(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommitBody>,
) -> ApiResult<Json<CommitResponse>> {
    let mapping = body.session.mapping.clone();
    let session = state
        .import_service
        .remap(body.session, mapping, today())?;
    let policy = state.import_service.config().warning_policy;
    let holdings = state.import_service.committable(&session, policy)?;
    tracing::info!(
        "Committing {} of {} imported records ({:?} policy)",
        holdings.len(),
        session.summary.total_records,
        policy
    );
    Ok(Json(CommitResponse {
        holdings,
        summary: session.summary,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/imports/parse", post(parse_import))
        .route("/imports/mapping", post(infer_mapping))
        .route("/imports/preview", post(preview_import))
        .route("/imports/remap", post(remap_import))
        .route("/imports/revise", post(revise_import_row))
        .route("/imports/records", post(list_import_records))
        .route("/imports/commit", post(commit_import))
}
