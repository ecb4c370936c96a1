use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::imports::{CreateImportRequest, ImportList, ImportWithDetails},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::import_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_imports).post(import_books))
        .route("/{id}", get(get_import))
}

#[utoipa::path(
    post,
    path = "/api/imports",
    request_body = CreateImportRequest,
    responses(
        (status = 201, description = "Import receipt recorded, stock raised", body = ApiResponse<ImportWithDetails>),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Batch violates the minimum total or the per-book cap")
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn import_books(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateImportRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ImportWithDetails>>)> {
    let resp = import_service::import_books(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/imports",
    params(Pagination),
    responses(
        (status = 200, description = "Import receipts, newest first", body = ApiResponse<ImportList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn list_imports(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ImportList>>> {
    let resp = import_service::list_imports(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/imports/{id}",
    params(
        ("id" = Uuid, Path, description = "Import receipt ID")
    ),
    responses(
        (status = 200, description = "Import receipt with its lines", body = ApiResponse<ImportWithDetails>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn get_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ImportWithDetails>>> {
    let resp = import_service::get_import(&state, &user, id).await?;
    Ok(Json(resp))
}
