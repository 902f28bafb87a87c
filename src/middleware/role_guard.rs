// 路由守卫
// 在路由分发之前按角色拦截受限路径，未授权时重定向

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    utils::{UserRole, verify_token},
};

/// 受保护路径规则
pub struct RouteRule {
    pub path_prefix: &'static str,
    pub allowed_roles: &'static [UserRole],
    pub redirect_to: Option<&'static str>,
}

/// 未配置重定向目标时使用的默认拒绝页
pub const DENIED_REDIRECT: &str = "/dashboard?message=Access%20Denied";

// 按声明顺序匹配，前缀最先命中者生效；更具体的前缀排在前面
pub const PROTECTED_ROUTES: &[RouteRule] = &[
    RouteRule {
        path_prefix: "/dashboard/categories",
        allowed_roles: &[UserRole::Artisan, UserRole::Admin],
        redirect_to: Some("/dashboard?message=Access%20Denied%20to%20Categories"),
    },
    RouteRule {
        path_prefix: "/products/categories",
        allowed_roles: &[UserRole::Artisan, UserRole::Admin],
        redirect_to: Some("/dashboard?message=Access%20Denied%20to%20Product%20Categories"),
    },
    RouteRule {
        path_prefix: "/admin",
        allowed_roles: &[UserRole::Admin],
        redirect_to: Some("/dashboard?message=Administrator%20Access%20Required"),
    },
    RouteRule {
        path_prefix: "/products/manage",
        allowed_roles: &[UserRole::Artisan, UserRole::Admin],
        redirect_to: Some("/dashboard?message=Access%20Denied%20to%20Product%20Management"),
    },
    RouteRule {
        path_prefix: "/artisan",
        allowed_roles: &[UserRole::Artisan],
        redirect_to: Some("/dashboard?message=Access%20Denied%20to%20Product%20Management"),
    },
    RouteRule {
        path_prefix: "/products/create",
        allowed_roles: &[UserRole::Artisan],
        redirect_to: Some("/dashboard?message=Access%20Denied%20to%20Product%20Management"),
    },
];

/// 判定请求是否需要重定向。放行时返回 None，否则返回重定向目标
pub fn guard_decision(path: &str, role: Option<UserRole>) -> Option<&'static str> {
    let rule = PROTECTED_ROUTES
        .iter()
        .find(|rule| path.starts_with(rule.path_prefix))?;

    match role {
        Some(role) if rule.allowed_roles.contains(&role) => None,
        _ => Some(rule.redirect_to.unwrap_or(DENIED_REDIRECT)),
    }
}

pub async fn role_guard(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // API 路径由认证中间件负责，这里只拦截页面导航
    if path.starts_with(state.config.api_base_uri.as_str()) {
        return next.run(request).await;
    }

    // 匿名访客没有令牌，解码失败同样按匿名处理
    let role = match &bearer {
        Some(TypedHeader(Authorization(bearer))) => verify_token(bearer.token(), &state.config)
            .ok()
            .map(|claims| claims.role),
        None => None,
    };

    if let Some(target) = guard_decision(&path, role) {
        tracing::info!("Access denied: path={}, role={:?}", path, role);
        return Redirect::to(target).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_redirected_from_admin() {
        assert_eq!(
            guard_decision("/admin/users", Some(UserRole::Buyer)),
            Some("/dashboard?message=Administrator%20Access%20Required")
        );
    }

    #[test]
    fn test_admin_passes_admin_paths() {
        assert_eq!(guard_decision("/admin/users", Some(UserRole::Admin)), None);
    }

    #[test]
    fn test_anonymous_redirected_from_protected_prefix() {
        assert!(guard_decision("/products/create", None).is_some());
        assert!(guard_decision("/artisan/dashboard", None).is_some());
    }

    #[test]
    fn test_unprotected_path_passes_for_everyone() {
        assert_eq!(guard_decision("/products", None), None);
        assert_eq!(guard_decision("/", Some(UserRole::Buyer)), None);
    }

    #[test]
    fn test_first_prefix_match_wins() {
        // /products/categories 在 /products/manage 之前声明
        assert_eq!(
            guard_decision("/products/categories/wood", Some(UserRole::Buyer)),
            Some("/dashboard?message=Access%20Denied%20to%20Product%20Categories")
        );
    }

    #[test]
    fn test_artisan_only_prefix() {
        assert_eq!(
            guard_decision("/products/create", Some(UserRole::Artisan)),
            None
        );
        assert!(guard_decision("/products/create", Some(UserRole::Buyer)).is_some());
    }
}
