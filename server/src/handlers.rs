use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::{
    read_csv_table, report_csv_string, run_pipeline, table_from_json, PipelineError,
    RunErrorBody, RunInfo, Table, CSV_MIME, DOWNLOAD_FILE_NAME,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::state::{AppState, StoredRun};

const SCHEMA_ERROR_MESSAGE: &str = "The uploaded file does not have the required columns.";

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/api/v1/runs", post(create_run))
        .route("/api/v1/runs/:id", get(get_run))
        .route("/api/v1/runs/:id/download", get(download_run))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- errores ---------------- */

#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    NotFound,
    BadRequest(String),
    UnsupportedMediaType(String),
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(PipelineError::Schema { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(PipelineError::Csv(_)) | ApiError::Pipeline(PipelineError::Json(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Pipeline(PipelineError::Io(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Pipeline(PipelineError::Schema { .. }) => SCHEMA_ERROR_MESSAGE.to_string(),
            ApiError::Pipeline(e) => e.to_string(),
            ApiError::NotFound => "run not found".to_string(),
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
            ApiError::UnsupportedMediaType(ct) => format!("unsupported content type: {ct}"),
        }
    }

    fn missing(&self) -> Vec<String> {
        match self {
            ApiError::Pipeline(e) => e.missing_columns().to_vec(),
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = RunErrorBody {
            error: self.message(),
            missing: self.missing(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/* ---------------- pipeline ---------------- */

/// Corre el pipeline sobre una tabla ya validada y guarda la corrida.
fn store_run(state: &AppState, file_name: Option<String>, table: Table) -> RunInfo {
    let output = run_pipeline(table);
    let info = RunInfo::new(file_name, &output);

    info!(
        "corrida {} creada: {} filas, {} reports",
        info.id, info.total_rows, info.report_count
    );

    let evicted = state.runs().insert(StoredRun {
        info: info.clone(),
        groups: output.groups,
    });
    if let Some(old) = evicted {
        info!("corrida {} desalojada de memoria", old);
    }

    info
}

fn log_rejected(err: &ApiError) {
    match err {
        ApiError::Pipeline(e) if e.is_schema() => {
            warn!("archivo rechazado, faltan columnas: {:?}", e.missing_columns())
        }
        ApiError::Internal(msg) => error!("error interno: {}", msg),
        other => warn!("petición rechazada: {}", other.message()),
    }
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Response {
    match state.views.index() {
        Ok(html) => Html(html).into_response(),
        Err(e) => render_failure(e),
    }
}

fn render_failure(e: tera::Error) -> Response {
    error!("error renderizando plantilla: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
}

/// Lee el campo `file` del formulario multipart.
async fn read_upload(mut multipart: Multipart) -> Result<(Option<String>, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok((file_name, data));
    }

    Err(ApiError::BadRequest("no file uploaded".to_string()))
}

// Formulario HTML: sube un CSV y devuelve la página con las tres tablas
async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let result = async {
        let (file_name, data) = read_upload(multipart).await?;
        let table = read_csv_table(data.as_ref())?;
        Ok::<_, ApiError>(store_run(&state, file_name, table))
    }
    .await;

    match result {
        Ok(run) => match state.views.results(&run) {
            Ok(html) => Html(html).into_response(),
            Err(e) => render_failure(e),
        },
        Err(err) => {
            log_rejected(&err);
            match state.views.error(&err.message(), &err.missing()) {
                Ok(html) => (err.status(), Html(html)).into_response(),
                Err(e) => render_failure(e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRunParams {
    /// Nombre del archivo de origen, sólo informativo
    pub file_name: Option<String>,
}

// API: el cuerpo es el CSV crudo (text/csv) o un arreglo de objetos (application/json)
async fn create_run(
    State(state): State<AppState>,
    Query(params): Query<CreateRunParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RunInfo>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = if content_type.starts_with(CSV_MIME) {
        read_csv_table(body.as_ref())
    } else if content_type.starts_with("application/json") {
        serde_json::from_slice::<Vec<Map<String, Value>>>(&body)
            .map_err(PipelineError::from)
            .and_then(table_from_json)
    } else {
        let err = ApiError::UnsupportedMediaType(content_type);
        log_rejected(&err);
        return Err(err);
    };

    let table = parsed.map_err(|e| {
        let err = ApiError::from(e);
        log_rejected(&err);
        err
    })?;

    let info = store_run(&state, params.file_name, table);
    Ok((StatusCode::CREATED, Json(info)))
}

// Devuelve las tres tablas de una corrida
async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunInfo>, ApiError> {
    let info = state.runs().get(&id).map(|run| run.info.clone());
    info.map(Json).ok_or(ApiError::NotFound)
}

// Descarga el resultado agregado como CSV
async fn download_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let groups = state.runs().get(&id).map(|run| run.groups.clone());
    let groups = groups.ok_or(ApiError::NotFound)?;

    let csv = report_csv_string(&groups).map_err(|e| ApiError::Internal(e.to_string()))?;
    let disposition = format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME);

    Ok((
        [
            (header::CONTENT_TYPE, CSV_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
