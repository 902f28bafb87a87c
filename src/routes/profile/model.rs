use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::utils::normalize_form_field;

/// 买家通用档案，与用户一对一
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub profile_id: Uuid,
    pub user_id: String,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 档案表单，缺省字段在更新时保持原值
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileForm {
    pub fn normalized(self) -> Self {
        Self {
            bio: normalize_form_field(self.bio),
            profile_image_url: normalize_form_field(self.profile_image_url),
            address: normalize_form_field(self.address),
            city: normalize_form_field(self.city),
            state: normalize_form_field(self.state),
            postal_code: normalize_form_field(self.postal_code),
            country: normalize_form_field(self.country),
            phone_number: normalize_form_field(self.phone_number),
        }
    }

    /// 入库前校验，失败时不产生任何写入
    pub fn validate(&self) -> BTreeMap<&'static str, String> {
        let mut errors = BTreeMap::new();

        if let Some(phone) = &self.phone_number {
            let valid = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !valid || phone.len() > 30 {
                errors.insert("phone_number", "电话号码格式无效".to_string());
            }
        }

        if let Some(postal_code) = &self.postal_code {
            if postal_code.len() > 20 {
                errors.insert("postal_code", "邮政编码过长".to_string());
            }
        }

        errors
    }
}

const PROFILE_COLUMNS: &str = "profile_id, user_id, bio, profile_image_url, address, city, \
     state, postal_code, country, phone_number, created_at, updated_at";

impl Profile {
    /// 创建档案。同一用户重复创建会触发唯一约束冲突
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        form: ProfileForm,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO profiles (
                profile_id, user_id, bio, profile_image_url, address, city,
                state, postal_code, country, phone_number, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&form.bio)
            .bind(&form.profile_image_url)
            .bind(&form.address)
            .bind(&form.city)
            .bind(&form.state)
            .bind(&form.postal_code)
            .bind(&form.country)
            .bind(&form.phone_number)
            .fetch_one(pool)
            .await?;

        Ok(profile)
    }

    /// 根据用户ID查找档案，不存在时返回 None 而不是错误
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");

        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// 部分更新，表单中缺省的字段保持原值
    pub async fn update(
        pool: &PgPool,
        user_id: &str,
        form: ProfileForm,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE profiles SET
                bio = COALESCE($2, bio),
                profile_image_url = COALESCE($3, profile_image_url),
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                postal_code = COALESCE($7, postal_code),
                country = COALESCE($8, country),
                phone_number = COALESCE($9, phone_number),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .bind(&form.bio)
            .bind(&form.profile_image_url)
            .bind(&form.address)
            .bind(&form.city)
            .bind(&form.state)
            .bind(&form.postal_code)
            .bind(&form.country)
            .bind(&form.phone_number)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_drops_blank_fields() {
        let form = ProfileForm {
            bio: Some("  木工爱好者  ".into()),
            city: Some("   ".into()),
            phone_number: Some("".into()),
            ..Default::default()
        };

        let normalized = form.normalized();
        assert_eq!(normalized.bio, Some("木工爱好者".into()));
        assert_eq!(normalized.city, None);
        assert_eq!(normalized.phone_number, None);
    }

    #[test]
    fn test_validate_rejects_bad_phone() {
        let form = ProfileForm {
            phone_number: Some("call-me-maybe!".into()),
            ..Default::default()
        };

        let errors = form.validate();
        assert!(errors.contains_key("phone_number"));
    }

    #[test]
    fn test_validate_accepts_reasonable_input() {
        let form = ProfileForm {
            phone_number: Some("+86 138-0000-0000".into()),
            postal_code: Some("100000".into()),
            ..Default::default()
        };

        assert!(form.validate().is_empty());
    }
}
