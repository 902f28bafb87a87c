// 艺匠店铺档案
// 包含档案的增删改查与面向展示的评分聚合查询

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::utils::{normalize_form_field, round_to_one_decimal, total_pages};

/// 艺匠店铺档案实体，与用户一对一
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ArtisanProfile {
    pub artisan_id: Uuid,
    pub user_id: String,
    pub shop_name: String,
    pub shop_description: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub policies: Option<String>,
    pub shipping_info: Option<String>,
    pub return_policy: Option<String>,
    pub is_top_artisan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtisanProfileForm {
    pub shop_name: Option<String>,
    pub shop_description: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub policies: Option<String>,
    pub shipping_info: Option<String>,
    pub return_policy: Option<String>,
}

impl ArtisanProfileForm {
    pub fn normalized(self) -> Self {
        Self {
            shop_name: normalize_form_field(self.shop_name),
            shop_description: normalize_form_field(self.shop_description),
            bio: normalize_form_field(self.bio),
            location: normalize_form_field(self.location),
            website: normalize_form_field(self.website),
            policies: normalize_form_field(self.policies),
            shipping_info: normalize_form_field(self.shipping_info),
            return_policy: normalize_form_field(self.return_policy),
        }
    }

    /// 入库前校验；创建时店铺名称必填
    pub fn validate(&self, require_shop_name: bool) -> BTreeMap<&'static str, String> {
        let mut errors = BTreeMap::new();

        match &self.shop_name {
            None if require_shop_name => {
                errors.insert("shop_name", "店铺名称不能为空".to_string());
            }
            Some(name) if name.chars().count() > 100 => {
                errors.insert("shop_name", "店铺名称过长".to_string());
            }
            _ => {}
        }

        if let Some(website) = &self.website {
            if !website.starts_with("http://") && !website.starts_with("https://") {
                errors.insert("website", "网址必须以 http:// 或 https:// 开头".to_string());
            }
        }

        errors
    }
}

/// 带用户姓名与邮箱的档案（管理列表用）
#[derive(Debug, Serialize, FromRow)]
pub struct ArtisanWithUser {
    pub artisan_id: Uuid,
    pub user_id: String,
    pub shop_name: String,
    pub shop_description: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub policies: Option<String>,
    pub shipping_info: Option<String>,
    pub return_policy: Option<String>,
    pub is_top_artisan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtisanPage {
    pub artisans: Vec<ArtisanWithUser>,
    pub total_pages: i64,
    pub total_artisans: i64,
}

/// 聚合查询的原始行；评分列来自按卖家分组的子查询
#[derive(Debug, FromRow)]
pub struct ArtisanDisplayRow {
    pub artisan_id: Uuid,
    pub user_id: String,
    pub shop_name: String,
    pub shop_description: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub policies: Option<String>,
    pub shipping_info: Option<String>,
    pub return_policy: Option<String>,
    pub is_top_artisan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub profile_image_url: Option<String>,
    pub phone_number: Option<String>,
    pub average_rating: Option<f64>,
    pub review_count: Option<i64>,
}

/// 面向展示的艺匠档案，评分为该艺匠全部产品评价的简单平均
#[derive(Debug, Serialize)]
pub struct ArtisanProfileForDisplay {
    pub artisan_id: Uuid,
    pub user_id: String,
    pub shop_name: String,
    pub shop_description: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub policies: Option<String>,
    pub shipping_info: Option<String>,
    pub return_policy: Option<String>,
    pub is_top_artisan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub profile_image_url: Option<String>,
    pub phone_number: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
}

impl ArtisanDisplayRow {
    /// 原始行到展示结构的转换，无评价时评分为 0
    pub fn into_display(self) -> ArtisanProfileForDisplay {
        ArtisanProfileForDisplay {
            artisan_id: self.artisan_id,
            user_id: self.user_id,
            shop_name: self.shop_name,
            shop_description: self.shop_description,
            bio: self.bio,
            location: self.location,
            website: self.website,
            policies: self.policies,
            shipping_info: self.shipping_info,
            return_policy: self.return_policy,
            is_top_artisan: self.is_top_artisan,
            created_at: self.created_at,
            updated_at: self.updated_at,
            user_name: self.user_name,
            user_email: self.user_email,
            profile_image_url: self.profile_image_url,
            phone_number: self.phone_number,
            average_rating: round_to_one_decimal(self.average_rating.unwrap_or(0.0)),
            review_count: self.review_count.unwrap_or(0),
        }
    }
}

const ARTISAN_COLUMNS: &str = "artisan_id, user_id, shop_name, shop_description, bio, location, \
     website, policies, shipping_info, return_policy, is_top_artisan, created_at, updated_at";

// 展示查询的公共部分：用户信息、档案图片/电话的嵌套连接、按卖家分组的评分聚合。
// 只统计已审核通过的评价
const DISPLAY_SELECT: &str = r#"
    SELECT
        a.artisan_id, a.user_id, a.shop_name, a.shop_description, a.bio,
        a.location, a.website, a.policies, a.shipping_info, a.return_policy,
        a.is_top_artisan, a.created_at, a.updated_at,
        u.name AS user_name, u.email AS user_email,
        p.profile_image_url, p.phone_number,
        r.average_rating, r.review_count
    FROM artisan_profiles a
    JOIN users u ON u.user_id = a.user_id
    LEFT JOIN profiles p ON p.user_id = a.user_id
    LEFT JOIN (
        SELECT pr.seller_id,
               AVG(rv.rating)::float8 AS average_rating,
               COUNT(rv.review_id) AS review_count
        FROM reviews rv
        JOIN products pr ON pr.product_id = rv.product_id
        WHERE rv.is_approved = TRUE
        GROUP BY pr.seller_id
    ) r ON r.seller_id = a.user_id
"#;

impl ArtisanProfile {
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        form: ArtisanProfileForm,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO artisan_profiles (
                artisan_id, user_id, shop_name, shop_description, bio, location,
                website, policies, shipping_info, return_policy, is_top_artisan,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, NOW(), NOW())
            RETURNING {ARTISAN_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ArtisanProfile>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(form.shop_name.unwrap_or_default())
            .bind(&form.shop_description)
            .bind(&form.bio)
            .bind(&form.location)
            .bind(&form.website)
            .bind(&form.policies)
            .bind(&form.shipping_info)
            .bind(&form.return_policy)
            .fetch_one(pool)
            .await
    }

    /// 根据用户ID查找店铺档案，不存在时返回 None
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {ARTISAN_COLUMNS} FROM artisan_profiles WHERE user_id = $1");

        sqlx::query_as::<_, ArtisanProfile>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// 部分更新，表单中缺省的字段保持原值
    pub async fn update(
        pool: &PgPool,
        user_id: &str,
        form: ArtisanProfileForm,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE artisan_profiles SET
                shop_name = COALESCE($2, shop_name),
                shop_description = COALESCE($3, shop_description),
                bio = COALESCE($4, bio),
                location = COALESCE($5, location),
                website = COALESCE($6, website),
                policies = COALESCE($7, policies),
                shipping_info = COALESCE($8, shipping_info),
                return_policy = COALESCE($9, return_policy),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {ARTISAN_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ArtisanProfile>(&sql)
            .bind(user_id)
            .bind(&form.shop_name)
            .bind(&form.shop_description)
            .bind(&form.bio)
            .bind(&form.location)
            .bind(&form.website)
            .bind(&form.policies)
            .bind(&form.shipping_info)
            .bind(&form.return_policy)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM artisan_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    /// 分页返回全部艺匠档案及其用户姓名、邮箱
    pub async fn find_all(pool: &PgPool, page: i64, limit: i64) -> Result<ArtisanPage, sqlx::Error> {
        let offset = (page - 1) * limit;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(artisan_id) FROM artisan_profiles")
            .fetch_one(pool)
            .await?;

        let artisans = sqlx::query_as::<_, ArtisanWithUser>(
            r#"
            SELECT
                a.artisan_id, a.user_id, a.shop_name, a.shop_description, a.bio,
                a.location, a.website, a.policies, a.shipping_info, a.return_policy,
                a.is_top_artisan, a.created_at, a.updated_at,
                u.name, u.email
            FROM artisan_profiles a
            JOIN users u ON u.user_id = a.user_id
            ORDER BY a.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(ArtisanPage {
            artisans,
            total_pages: total_pages(total, limit),
            total_artisans: total,
        })
    }

    /// 展示列表，按店铺名称排序
    pub async fn find_for_list(
        pool: &PgPool,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ArtisanProfileForDisplay>, sqlx::Error> {
        let offset = (page - 1) * limit;
        let sql = format!("{DISPLAY_SELECT} ORDER BY a.shop_name ASC LIMIT $1 OFFSET $2");

        let rows = sqlx::query_as::<_, ArtisanDisplayRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(ArtisanDisplayRow::into_display).collect())
    }

    /// 首页置顶：按计算评分取前三名
    pub async fn top_for_homepage(
        pool: &PgPool,
    ) -> Result<Vec<ArtisanProfileForDisplay>, sqlx::Error> {
        let sql =
            format!("{DISPLAY_SELECT} ORDER BY COALESCE(r.average_rating, 0) DESC LIMIT 3");

        let rows = sqlx::query_as::<_, ArtisanDisplayRow>(&sql)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("查询首页置顶艺匠失败: {}", e);
                e
            })?;

        Ok(rows.into_iter().map(ArtisanDisplayRow::into_display).collect())
    }

    /// 单个艺匠的展示详情，附带用户电话与头像
    pub async fn find_display_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<ArtisanProfileForDisplay>, sqlx::Error> {
        let sql = format!("{DISPLAY_SELECT} WHERE a.user_id = $1");

        let row = sqlx::query_as::<_, ArtisanDisplayRow>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(ArtisanDisplayRow::into_display))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(average_rating: Option<f64>, review_count: Option<i64>) -> ArtisanDisplayRow {
        ArtisanDisplayRow {
            artisan_id: Uuid::new_v4(),
            user_id: "user-1".into(),
            shop_name: "青山木坊".into(),
            shop_description: None,
            bio: None,
            location: None,
            website: None,
            policies: None,
            shipping_info: None,
            return_policy: None,
            is_top_artisan: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_name: Some("张三".into()),
            user_email: Some("zhangsan@example.com".into()),
            profile_image_url: None,
            phone_number: None,
            average_rating,
            review_count,
        }
    }

    #[test]
    fn test_display_rating_rounded_to_one_decimal() {
        // 两条评价共 8 分，再加一条 5 分：(8+5)/3 = 4.333... -> 4.3
        let display = sample_row(Some(13.0 / 3.0), Some(3)).into_display();
        assert_eq!(display.average_rating, 4.3);
        assert_eq!(display.review_count, 3);
    }

    #[test]
    fn test_display_defaults_to_zero_without_reviews() {
        let display = sample_row(None, None).into_display();
        assert_eq!(display.average_rating, 0.0);
        assert_eq!(display.review_count, 0);
    }

    #[test]
    fn test_validate_requires_shop_name_on_create() {
        let form = ArtisanProfileForm::default();
        assert!(form.validate(true).contains_key("shop_name"));
        assert!(form.validate(false).is_empty());
    }

    #[test]
    fn test_validate_checks_website_scheme() {
        let form = ArtisanProfileForm {
            shop_name: Some("青山木坊".into()),
            website: Some("ftp://example.com".into()),
            ..Default::default()
        };

        assert!(form.validate(true).contains_key("website"));
    }
}
