use axum::{
    Extension,
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    AppState,
    utils::{
        Claims, error_codes, error_to_api_response, success_to_api_response,
        validation_error_to_api_response,
    },
};

use super::model::{Profile, ProfileForm};

/// 档案变更接口的响应约定
#[derive(Debug, Serialize)]
pub struct ProfileMutationResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteProfileResponse {}

#[axum::debug_handler]
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let form = form.normalized();

    let errors = form.validate();
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            validation_error_to_api_response(errors),
        )
            .into_response();
    }

    match Profile::create(&state.pool, &claims.sub, form).await {
        Ok(_) => (
            StatusCode::OK,
            axum::Json(ProfileMutationResponse { success: true }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to create profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "创建档案失败".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let form = form.normalized();

    let errors = form.validate();
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            validation_error_to_api_response(errors),
        )
            .into_response();
    }

    match Profile::update(&state.pool, &claims.sub, form).await {
        Ok(_) => (
            StatusCode::OK,
            axum::Json(ProfileMutationResponse { success: true }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "更新档案失败".to_string()),
            )
                .into_response()
        }
    }
}

/// 查询当前用户档案。尚未创建档案时返回未找到，便于前端区分
#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match Profile::find_by_user_id(&state.pool, &claims.sub).await {
        Ok(Some(profile)) => (StatusCode::OK, success_to_api_response(profile)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response::<()>(error_codes::NOT_FOUND, "档案不存在".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "获取档案失败".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match Profile::delete(&state.pool, &claims.sub).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(DeleteProfileResponse {}),
        )
            .into_response(),
        Err(sqlx::Error::RowNotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response::<()>(error_codes::NOT_FOUND, "档案不存在".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete profile for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "删除档案失败".to_string()),
            )
                .into_response()
        }
    }
}
