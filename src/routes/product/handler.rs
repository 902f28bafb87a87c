use axum::{
    Extension,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    utils::{
        Claims, UserRole, error_codes, error_to_api_response, success_to_api_response,
        validation_error_to_api_response,
    },
};

use super::model::{DeleteOutcome, Product, ProductForm, SortBy};

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub sort_by: Option<SortBy>,
}

#[derive(Debug, Deserialize)]
pub struct ProductIdQuery {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SellerQuery {
    pub seller_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub already_deleted: bool,
}

fn permission_denied() -> Response {
    (
        StatusCode::FORBIDDEN,
        error_to_api_response::<()>(
            error_codes::PERMISSION_DENIED,
            "仅艺匠可管理产品".to_string(),
        ),
    )
        .into_response()
}

fn can_manage_products(role: UserRole) -> bool {
    matches!(role, UserRole::Artisan | UserRole::Admin)
}

#[axum::debug_handler]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    let sort = query.sort_by.unwrap_or_default();

    // 查询串里的空白检索词与无效分类ID一律当作未筛选
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let category_id = query
        .category_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    match Product::find_all(&state.pool, page, limit, search, category_id, sort).await {
        Ok(result) => (StatusCode::OK, success_to_api_response(result)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取产品列表失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn find_by_id(
    State(state): State<AppState>,
    Query(query): Query<ProductIdQuery>,
) -> impl IntoResponse {
    match Product::find_by_id(&state.pool, query.product_id).await {
        Ok(Some(product)) => (StatusCode::OK, success_to_api_response(product)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "产品不存在".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to fetch product {}: {}", query.product_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取产品失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn find_featured(State(state): State<AppState>) -> impl IntoResponse {
    match Product::find_featured(&state.pool).await {
        Ok(products) => (StatusCode::OK, success_to_api_response(products)),
        Err(e) => {
            tracing::error!("Failed to fetch featured products: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取精选产品失败".to_string()),
            )
        }
    }
}

/// 指定卖家的产品列表，附带店铺名称（艺匠主页用）
#[axum::debug_handler]
pub async fn find_by_seller(
    State(state): State<AppState>,
    Query(query): Query<SellerQuery>,
) -> impl IntoResponse {
    match Product::find_by_seller_with_shop_info(&state.pool, &query.seller_id).await {
        Ok(products) => (StatusCode::OK, success_to_api_response(products)),
        Err(e) => {
            tracing::error!("Failed to fetch products of {}: {}", query.seller_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取产品失败".to_string()),
            )
        }
    }
}

/// 当前艺匠的自有产品列表（工作台用）
#[axum::debug_handler]
pub async fn my_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Product::find_by_seller(&state.pool, &claims.sub).await {
        Ok(products) => (StatusCode::OK, success_to_api_response(products)),
        Err(e) => {
            tracing::error!("Failed to fetch products of {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取产品失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn seller_rating(
    State(state): State<AppState>,
    Query(query): Query<SellerQuery>,
) -> impl IntoResponse {
    match Product::seller_average_rating(&state.pool, &query.seller_id).await {
        Ok(rating) => (StatusCode::OK, success_to_api_response(rating)),
        Err(e) => {
            tracing::error!("Failed to fetch seller rating of {}: {}", query.seller_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "获取卖家评分失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProductForm>,
) -> Response {
    if claims.role != UserRole::Artisan {
        return permission_denied();
    }

    let data = match form.parse(true) {
        Ok(data) => data,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                validation_error_to_api_response(errors),
            )
                .into_response();
        }
    };

    match Product::create(&state.pool, &claims.sub, data).await {
        Ok(product) => (StatusCode::CREATED, success_to_api_response(product)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create product for {}: {}", claims.sub, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "创建产品失败".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProductIdQuery>,
    Form(form): Form<ProductForm>,
) -> Response {
    if !can_manage_products(claims.role) {
        return permission_denied();
    }

    // 卖家只能修改自己的产品，管理员除外
    let existing = match Product::find_by_id(&state.pool, query.product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response::<()>(error_codes::NOT_FOUND, "产品不存在".to_string()),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Failed to fetch product {}: {}", query.product_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "获取产品失败".to_string()),
            )
                .into_response();
        }
    };

    if existing.seller_id != claims.sub && claims.role != UserRole::Admin {
        return permission_denied();
    }

    let data = match form.parse(false) {
        Ok(data) => data,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                validation_error_to_api_response(errors),
            )
                .into_response();
        }
    };

    match Product::update(&state.pool, query.product_id, data).await {
        Ok(product) => (StatusCode::OK, success_to_api_response(product)).into_response(),
        Err(e) => {
            tracing::error!("Failed to update product {}: {}", query.product_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "更新产品失败".to_string()),
            )
                .into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProductIdQuery>,
) -> Response {
    if !can_manage_products(claims.role) {
        return permission_denied();
    }

    let existing = match Product::find_by_id(&state.pool, query.product_id).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!("Failed to fetch product {}: {}", query.product_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "获取产品失败".to_string()),
            )
                .into_response();
        }
    };

    let Some(existing) = existing else {
        // 目标行已不存在，重复删除按成功处理
        return (
            StatusCode::OK,
            success_to_api_response(DeleteProductResponse {
                already_deleted: true,
            }),
        )
            .into_response();
    };

    if existing.seller_id != claims.sub && claims.role != UserRole::Admin {
        return permission_denied();
    }

    match Product::delete(&state.pool, query.product_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            success_to_api_response(DeleteProductResponse {
                already_deleted: outcome == DeleteOutcome::AlreadyDeleted,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to delete product {}: {}", query.product_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "删除产品失败".to_string()),
            )
                .into_response()
        }
    }
}
