use crate::AppState;
use crate::api::error::AppError;
use crate::models::{UnzipRequest, UnzipResult};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

#[utoipa::path(
    post,
    path = "/unzip",
    request_body = UnzipRequest,
    responses(
        (status = 200, description = "Per-file upload outcomes in archive order", body = UnzipResult),
        (status = 400, description = "Rejected command or source, unreachable source, or corrupt archive")
    ),
    tag = "unzip"
)]
pub async fn unzip(
    State(state): State<AppState>,
    payload: Result<Json<UnzipRequest>, JsonRejection>,
) -> Result<Json<UnzipResult>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let result = state.unzip.unzip(&request).await?;
    Ok(Json(result))
}
