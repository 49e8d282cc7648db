use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use billsync_core::BillView;
use billsync_import::{IngestError, Reconciler};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Multipart field carrying the CSV upload.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/bills", get(list_bills).post(upload_bills))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn list_bills(State(state): State<AppState>) -> Result<Json<Vec<BillView>>, ApiError> {
    Ok(Json(state.reconciler.list_all().await?))
}

async fn upload_bills(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Vec<BillView>>), ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::MissingFile)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::Multipart)? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await.map_err(ApiError::Multipart)?);
            break;
        }
    }
    let data = upload.ok_or(ApiError::MissingFile)?;

    let bills = state.reconciler.ingest(&data).await?;
    info!(bytes = data.len(), bills = bills.len(), "Processed bill upload");
    Ok((StatusCode::CREATED, Json(bills)))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
}

#[derive(Debug)]
pub enum ApiError {
    MissingFile,
    Multipart(MultipartError),
    Ingest(IngestError),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "No file uploaded" }),
            ),
            ApiError::Multipart(e) => (e.status(), json!({ "message": e.body_text() })),
            ApiError::Ingest(e) if e.is_bad_input() => {
                warn!(error = %e, "Rejected bill upload");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "File is not properly formatted or processable" }),
                )
            }
            ApiError::Ingest(e) => {
                error!(error = %e, "Bill store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal Server Error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
