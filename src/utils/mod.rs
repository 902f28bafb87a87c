use std::collections::BTreeMap;

use axum::Json;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 用户角色，由身份提供方在令牌中下发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Buyer,
    Artisan,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // 用户ID
    pub exp: i64,        // 过期时间
    pub iat: i64,        // 签发时间
    pub role: UserRole,  // 用户角色
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub first_login: bool, // 首次登录标识
    #[serde(default)]
    pub has_profile: bool, // 档案完善标识
}

/// 校验身份提供方签发的令牌。本服务只读取令牌，从不签发
pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

/// 表单校验失败时返回按字段分组的错误信息
pub fn validation_error_to_api_response(
    errors: BTreeMap<&'static str, String>,
) -> Json<ApiResponse<BTreeMap<&'static str, String>>> {
    Json(ApiResponse {
        code: error_codes::VALIDATION_ERROR,
        msg: "表单校验失败".to_string(),
        resp_data: Some(errors),
    })
}

/// 评分统一保留一位小数
pub fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 空白表单值一律按缺省处理
pub fn normalize_form_field(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// 总页数向上取整
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const ALREADY_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            auth_secret: "test-secret".into(),
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
        }
    }

    #[test]
    fn test_round_to_one_decimal() {
        assert_eq!(round_to_one_decimal(13.0 / 3.0), 4.3);
        assert_eq!(round_to_one_decimal(5.0), 5.0);
        assert_eq!(round_to_one_decimal(0.0), 0.0);
        assert_eq!(round_to_one_decimal(4.25), 4.3);
    }

    #[test]
    fn test_normalize_form_field() {
        assert_eq!(normalize_form_field(None), None);
        assert_eq!(normalize_form_field(Some("".into())), None);
        assert_eq!(normalize_form_field(Some("   ".into())), None);
        assert_eq!(
            normalize_form_field(Some("  hand carved  ".into())),
            Some("hand carved".into())
        );
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(24, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
        assert_eq!(total_pages(1, 12), 1);
        assert_eq!(total_pages(10, 0), 0);
    }

    #[test]
    fn test_role_deserializes_lowercase() {
        assert_eq!(
            serde_json::from_str::<UserRole>("\"artisan\"").unwrap(),
            UserRole::Artisan
        );
        assert_eq!(
            serde_json::from_str::<UserRole>("\"admin\"").unwrap(),
            UserRole::Admin
        );
        assert!(serde_json::from_str::<UserRole>("\"superuser\"").is_err());
    }

    #[test]
    fn test_verify_token_roundtrip() {
        let config = test_config();
        let claims = Claims {
            sub: "user-1".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
            role: UserRole::Buyer,
            name: Some("测试用户".into()),
            email: Some("buyer@example.com".into()),
            first_login: false,
            has_profile: true,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.auth_secret.as_bytes()),
        )
        .unwrap();

        let decoded = verify_token(&token, &config).unwrap();
        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.role, UserRole::Buyer);
        assert!(decoded.has_profile);
    }

    #[test]
    fn test_verify_token_rejects_wrong_secret() {
        let config = test_config();
        let claims = Claims {
            sub: "user-1".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
            role: UserRole::Buyer,
            name: None,
            email: None,
            first_login: false,
            has_profile: false,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }
}
