use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};

use super::AppState;
use super::dto::{CategoriesResponse, CategoryResponse, CreateCategoryRequest, MessageResponse};
use super::response::{ApiError, ApiResponse};
use crate::auth::RequireUser;
use crate::service::categories;
use crate::store::CategoryOrder;

/// POST /api/categories/create
pub async fn create_category(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<ApiResponse<CategoryResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let category = categories::create(
        state.store.as_ref(),
        &auth.user,
        &req.name,
        req.icon.as_deref(),
    )?;

    Ok(ApiResponse::success(CategoryResponse { category }))
}

/// DELETE /api/categories/{id}/delete
pub async fn delete_category(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::bad_request(e.body_text()))?;
    categories::delete(state.store.as_ref(), &auth.user, id)?;
    Ok(ApiResponse::success(MessageResponse::new("Category deleted")))
}

/// GET /api/categories/user
pub async fn list_categories(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<CategoriesResponse>, ApiError> {
    let categories = categories::list(state.store.as_ref(), &auth.user, CategoryOrder::ByName)?;
    Ok(ApiResponse::success(CategoriesResponse { categories }))
}
