use axum::{
    Extension,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    utils::{
        Claims, UserRole, error_codes, error_to_api_response, success_to_api_response,
        validation_error_to_api_response,
    },
};

use super::model::{ArtisanProfile, ArtisanProfileForm};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteArtisanProfileResponse {}

fn page_params(query: &PageQuery) -> (i64, i64) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    (page, limit)
}

fn permission_denied() -> Response {
    (
        StatusCode::FORBIDDEN,
        error_to_api_response::<()>(
            error_codes::PERMISSION_DENIED,
            "仅艺匠可管理店铺档案".to_string(),
        ),
    )
        .into_response()
}

#[axum::debug_handler]
pub async fn find_all(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let (page, limit) = page_params(&query);

    match ArtisanProfile::find_all(&state.pool, page, limit).await {
        Ok(result) => (StatusCode::OK, success_to_api_response(result)),
        Err(e) => {
            tracing::error!("Failed to fetch artisan profiles: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取艺匠列表失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn find_for_list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let (page, limit) = page_params(&query);

    match ArtisanProfile::find_for_list(&state.pool, page, limit).await {
        Ok(artisans) => (StatusCode::OK, success_to_api_response(artisans)),
        Err(e) => {
            tracing::error!("Failed to fetch artisan display list: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取艺匠列表失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn top_artisans(State(state): State<AppState>) -> impl IntoResponse {
    match ArtisanProfile::top_for_homepage(&state.pool).await {
        Ok(artisans) => (StatusCode::OK, success_to_api_response(artisans)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取置顶艺匠失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn find_by_user(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> impl IntoResponse {
    match ArtisanProfile::find_display_by_user_id(&state.pool, &query.user_id).await {
        Ok(Some(artisan)) => (StatusCode::OK, success_to_api_response(artisan)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "艺匠档案不存在".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to fetch artisan {}: {}", query.user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取艺匠档案失败".to_string()),
            )
        }
    }
}

/// 当前艺匠的自有档案（工作台表单用）
#[axum::debug_handler]
pub async fn my_artisan_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match ArtisanProfile::find_by_user_id(&state.pool, &claims.sub).await {
        Ok(Some(profile)) => (StatusCode::OK, success_to_api_response(profile)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "艺匠档案不存在".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to fetch artisan profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取艺匠档案失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn create_artisan_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ArtisanProfileForm>,
) -> Response {
    if claims.role != UserRole::Artisan {
        return permission_denied();
    }

    let form = form.normalized();

    let errors = form.validate(true);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            validation_error_to_api_response(errors),
        )
            .into_response();
    }

    match ArtisanProfile::create(&state.pool, &claims.sub, form).await {
        Ok(profile) => (StatusCode::CREATED, success_to_api_response(profile)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create artisan profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(
                    error_codes::INTERNAL_ERROR,
                    "创建艺匠档案失败".to_string(),
                ),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn update_artisan_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ArtisanProfileForm>,
) -> Response {
    if claims.role != UserRole::Artisan {
        return permission_denied();
    }

    let form = form.normalized();

    let errors = form.validate(false);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            validation_error_to_api_response(errors),
        )
            .into_response();
    }

    match ArtisanProfile::update(&state.pool, &claims.sub, form).await {
        Ok(profile) => (StatusCode::OK, success_to_api_response(profile)).into_response(),
        Err(e) => {
            tracing::error!("Failed to update artisan profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(
                    error_codes::INTERNAL_ERROR,
                    "更新艺匠档案失败".to_string(),
                ),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn delete_artisan_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    if claims.role != UserRole::Artisan {
        return permission_denied();
    }

    match ArtisanProfile::delete(&state.pool, &claims.sub).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(DeleteArtisanProfileResponse {}),
        )
            .into_response(),
        Err(sqlx::Error::RowNotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response::<()>(error_codes::NOT_FOUND, "艺匠档案不存在".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete artisan profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(
                    error_codes::INTERNAL_ERROR,
                    "删除艺匠档案失败".to_string(),
                ),
            )
                .into_response()
        }
    }
}
