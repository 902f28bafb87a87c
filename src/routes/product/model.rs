// 产品存储
// 产品及其图片、评价的数据库操作，含分页筛选列表与评分聚合

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::utils::{normalize_form_field, round_to_one_decimal, total_pages};

/// 产品图片，每个产品最多一张主图
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductImage {
    pub image_id: Uuid,
    pub image_url: String,
    pub is_primary: bool,
    pub alt_text: Option<String>,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Review {
    pub review_id: Uuid,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>, // 详情查询附带评价人姓名
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub review_date: DateTime<Utc>,
    pub is_approved: bool,
    pub helpful_count: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 产品实体。average_rating/review_count 为读侧投影，列表排序直接信任
#[derive(Debug, Serialize)]
pub struct Product {
    pub product_id: Uuid,
    pub seller_id: String,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity_available: i32,
    pub materials_used: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<Decimal>,
    pub care_instructions: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_featured: bool,
    pub is_active: bool,
    pub average_rating: Option<f64>,
    pub review_count: i32,
    pub creation_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub shop_name: Option<String>,
    pub seller_name: Option<String>,
    pub images: Vec<ProductImage>,
    pub reviews: Vec<Review>,
}

/// 原始查询行，关联数据以 JSON 聚合列附带
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub seller_id: String,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity_available: i32,
    pub materials_used: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<Decimal>,
    pub care_instructions: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub is_featured: bool,
    pub is_active: bool,
    pub average_rating: Option<f64>,
    pub review_count: i32,
    pub creation_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub images_json: Option<serde_json::Value>,
    pub reviews_json: Option<serde_json::Value>,
}

impl ProductRow {
    /// 原始行到产品的显式类型收敛。JSON 聚合与松散类型在这里统一成语义类型，
    /// 省略这一步会悄悄破坏下游的比较与展示
    pub fn into_product(self, shop_name: Option<String>, seller_name: Option<String>) -> Product {
        Product {
            product_id: self.product_id,
            seller_id: self.seller_id,
            category_id: self.category_id,
            name: self.name,
            description: self.description,
            price: self.price,
            quantity_available: self.quantity_available,
            materials_used: self.materials_used,
            dimensions: self.dimensions,
            weight: self.weight,
            care_instructions: self.care_instructions,
            tags: self.tags.and_then(|value| serde_json::from_value(value).ok()),
            is_featured: self.is_featured,
            is_active: self.is_active,
            average_rating: self.average_rating,
            review_count: self.review_count,
            creation_date: self.creation_date,
            last_updated: self.last_updated,
            shop_name,
            seller_name,
            images: decode_json_list(self.images_json),
            reviews: decode_json_list(self.reviews_json),
        }
    }
}

fn decode_json_list<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Vec<T> {
    match value {
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Failed to decode aggregated relation: {}", e);
            Vec::new()
        }),
    }
}

/// 产品表单，全部按原始表单字符串接收，入库前统一解析
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub quantity_available: Option<String>,
    pub category_id: Option<String>,
    pub materials_used: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub care_instructions: Option<String>,
    pub tags: Option<String>, // JSON 字符串数组，如 ["wood","handmade"]
    pub image_url: Option<String>,
    pub is_featured: Option<String>,
    pub is_active: Option<String>,
}

/// 校验解析后的产品数据
#[derive(Debug, Default)]
pub struct ProductData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity_available: Option<i32>,
    pub category_id: Option<Uuid>,
    pub materials_used: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<Decimal>,
    pub care_instructions: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

fn parse_checkbox(value: Option<String>) -> Option<bool> {
    let value = normalize_form_field(value)?;
    Some(!matches!(value.as_str(), "false" | "0" | "off"))
}

impl ProductForm {
    /// 在任何数据库调用之前完成校验；失败时按字段返回错误，不产生任何写入。
    /// 创建时核心字段必填，更新时缺省字段保持原值
    pub fn parse(self, require_core_fields: bool) -> Result<ProductData, BTreeMap<&'static str, String>> {
        let mut errors = BTreeMap::new();
        let mut data = ProductData {
            name: normalize_form_field(self.name),
            description: normalize_form_field(self.description),
            materials_used: normalize_form_field(self.materials_used),
            dimensions: normalize_form_field(self.dimensions),
            care_instructions: normalize_form_field(self.care_instructions),
            image_url: normalize_form_field(self.image_url),
            is_featured: parse_checkbox(self.is_featured),
            is_active: parse_checkbox(self.is_active),
            ..Default::default()
        };

        if require_core_fields && data.name.is_none() {
            errors.insert("name", "产品名称不能为空".to_string());
        }
        if require_core_fields && data.description.is_none() {
            errors.insert("description", "产品描述不能为空".to_string());
        }

        match normalize_form_field(self.price) {
            Some(raw) => match Decimal::from_str(&raw) {
                Ok(price) if price < Decimal::ZERO => {
                    errors.insert("price", "价格不能为负数".to_string());
                }
                Ok(price) => data.price = Some(price),
                Err(_) => {
                    errors.insert("price", "价格格式无效".to_string());
                }
            },
            None if require_core_fields => {
                errors.insert("price", "价格不能为空".to_string());
            }
            None => {}
        }

        if let Some(raw) = normalize_form_field(self.quantity_available) {
            match raw.parse::<i32>() {
                Ok(quantity) if quantity < 0 => {
                    errors.insert("quantity_available", "库存数量不能为负数".to_string());
                }
                Ok(quantity) => data.quantity_available = Some(quantity),
                Err(_) => {
                    errors.insert("quantity_available", "库存数量格式无效".to_string());
                }
            }
        }

        if let Some(raw) = normalize_form_field(self.category_id) {
            match Uuid::parse_str(&raw) {
                Ok(category_id) => data.category_id = Some(category_id),
                Err(_) => {
                    errors.insert("category_id", "分类ID无效".to_string());
                }
            }
        }

        if let Some(raw) = normalize_form_field(self.weight) {
            match Decimal::from_str(&raw) {
                Ok(weight) if weight < Decimal::ZERO => {
                    errors.insert("weight", "重量不能为负数".to_string());
                }
                Ok(weight) => data.weight = Some(weight),
                Err(_) => {
                    errors.insert("weight", "重量格式无效".to_string());
                }
            }
        }

        if let Some(raw) = normalize_form_field(self.tags) {
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(tags) => data.tags = Some(tags),
                Err(_) => {
                    errors.insert("tags", "标签必须是 JSON 字符串数组".to_string());
                }
            }
        }

        if errors.is_empty() { Ok(data) } else { Err(errors) }
    }
}

/// 列表排序方式，默认按上架时间倒序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

pub fn order_by_clause(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Newest => "p.creation_date DESC",
        SortBy::PriceAsc => "p.price ASC",
        SortBy::PriceDesc => "p.price DESC",
        SortBy::Rating => "p.average_rating DESC NULLS LAST, p.review_count DESC",
    }
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_pages: i64,
    pub total_products: i64,
}

#[derive(Debug, Serialize)]
pub struct SellerRating {
    pub average_rating: f64,
    pub review_count: i64,
}

/// 产品删除结果。目标行已不存在视为删除成功，可安全重试
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
}

const PRODUCT_COLUMNS: &str = "p.product_id, p.seller_id, p.category_id, p.name, p.description, \
     p.price, p.quantity_available, p.materials_used, p.dimensions, p.weight, \
     p.care_instructions, p.tags, p.is_featured, p.is_active, \
     p.average_rating, p.review_count, p.creation_date, p.last_updated";

const IMAGE_JSON_FIELDS: &str = "'image_id', img.image_id, 'image_url', img.image_url, \
     'is_primary', img.is_primary, 'alt_text', img.alt_text, \
     'display_order', img.display_order, 'created_at', img.created_at";

const REVIEW_JSON_FIELDS: &str = "'review_id', rv.review_id, 'user_id', rv.user_id, \
     'rating', rv.rating, 'title', rv.title, 'comment', rv.comment, \
     'review_date', rv.review_date, 'is_approved', rv.is_approved, \
     'helpful_count', rv.helpful_count, 'updated_at', rv.updated_at";

// 关联数据通过相关子查询聚合为 JSON，避免一对多连接造成的行数膨胀
fn primary_image_subquery() -> String {
    format!(
        "(SELECT json_agg(json_build_object({IMAGE_JSON_FIELDS})) \
         FROM product_images img \
         WHERE img.product_id = p.product_id AND img.is_primary = TRUE)"
    )
}

fn all_images_subquery() -> String {
    format!(
        "(SELECT json_agg(json_build_object({IMAGE_JSON_FIELDS})) \
         FROM product_images img \
         WHERE img.product_id = p.product_id)"
    )
}

fn reviews_subquery() -> String {
    format!(
        "(SELECT json_agg(json_build_object({REVIEW_JSON_FIELDS})) \
         FROM reviews rv \
         WHERE rv.product_id = p.product_id)"
    )
}

fn reviews_with_user_subquery() -> String {
    format!(
        "(SELECT json_agg(json_build_object({REVIEW_JSON_FIELDS}, 'user_name', u.name)) \
         FROM reviews rv \
         JOIN users u ON u.user_id = rv.user_id \
         WHERE rv.product_id = p.product_id)"
    )
}

// 列表筛选条件按 AND 组合；$1 为模糊匹配串、$2 为小写检索词、$3 为分类ID
const LIST_FILTER: &str = "p.is_active = TRUE \
     AND ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1 OR jsonb_exists(p.tags, $2)) \
     AND ($3::uuid IS NULL OR p.category_id = $3)";

impl Product {
    /// 创建产品；附带主图时在同一事务内写入图片行
    pub async fn create(
        pool: &PgPool,
        seller_id: &str,
        data: ProductData,
    ) -> Result<Self, sqlx::Error> {
        let product_id = Uuid::new_v4();
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                product_id, seller_id, category_id, name, description, price,
                quantity_available, materials_used, dimensions, weight,
                care_instructions, tags, is_featured, is_active,
                review_count, creation_date, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 0, NOW(), NOW())
            "#,
        )
        .bind(product_id)
        .bind(seller_id)
        .bind(data.category_id)
        .bind(data.name.unwrap_or_default())
        .bind(data.description.unwrap_or_default())
        .bind(data.price.unwrap_or_default())
        .bind(data.quantity_available.unwrap_or(1))
        .bind(&data.materials_used)
        .bind(&data.dimensions)
        .bind(data.weight)
        .bind(&data.care_instructions)
        .bind(data.tags.map(sqlx::types::Json))
        .bind(data.is_featured.unwrap_or(false))
        .bind(data.is_active.unwrap_or(false))
        .execute(&mut *tx)
        .await?;

        if let Some(image_url) = &data.image_url {
            sqlx::query(
                r#"
                INSERT INTO product_images (image_id, product_id, image_url, is_primary, created_at)
                VALUES ($1, $2, $3, TRUE, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        // 重新读取，带上关联数据返回
        Self::find_by_id(pool, product_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// 产品详情：全部图片、附带评价人姓名的评价列表、卖家店铺信息
    pub async fn find_by_id(pool: &PgPool, product_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, {images} AS images_json, {reviews} AS reviews_json \
             FROM products p WHERE p.product_id = $1",
            images = all_images_subquery(),
            reviews = reviews_with_user_subquery(),
        );

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let shop: Option<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT a.shop_name, u.name
            FROM artisan_profiles a
            JOIN users u ON u.user_id = a.user_id
            WHERE a.user_id = $1
            "#,
        )
        .bind(&row.seller_id)
        .fetch_optional(pool)
        .await?;

        let (shop_name, seller_name) = match shop {
            Some((shop_name, seller_name)) => (Some(shop_name), seller_name),
            None => (None, None),
        };

        Ok(Some(row.into_product(shop_name, seller_name)))
    }

    /// 分页筛选列表。统计与取数使用同一套筛选谓词
    pub async fn find_all(
        pool: &PgPool,
        page: i64,
        limit: i64,
        search: Option<&str>,
        category_id: Option<Uuid>,
        sort: SortBy,
    ) -> Result<ProductPage, sqlx::Error> {
        let offset = (page - 1) * limit;
        let search_term = search.map(|q| q.to_lowercase());
        let search_pattern = search_term.as_deref().map(|q| format!("%{q}%"));

        let count_sql = format!("SELECT COUNT(p.product_id) FROM products p WHERE {LIST_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&search_pattern)
            .bind(&search_term)
            .bind(category_id)
            .fetch_one(pool)
            .await?;

        let list_sql = format!(
            "SELECT {PRODUCT_COLUMNS}, {images} AS images_json, {reviews} AS reviews_json \
             FROM products p \
             WHERE {LIST_FILTER} \
             ORDER BY {order} \
             LIMIT $4 OFFSET $5",
            images = primary_image_subquery(),
            reviews = reviews_subquery(),
            order = order_by_clause(sort),
        );

        let rows = sqlx::query_as::<_, ProductRow>(&list_sql)
            .bind(&search_pattern)
            .bind(&search_term)
            .bind(category_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch filtered products: {}", e);
                e
            })?;

        let products = Self::attach_shop_names(pool, rows).await?;

        Ok(ProductPage {
            products,
            total_pages: total_pages(total, limit),
            total_products: total,
        })
    }

    /// 卖家自有产品列表（工作台用）
    pub async fn find_by_seller(pool: &PgPool, seller_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, {images} AS images_json, {reviews} AS reviews_json \
             FROM products p \
             WHERE p.seller_id = $1 \
             ORDER BY p.creation_date DESC",
            images = all_images_subquery(),
            reviews = reviews_subquery(),
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(seller_id)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_product(None, None))
            .collect())
    }

    /// 卖家产品列表，附带店铺名称（艺匠主页用）
    pub async fn find_by_seller_with_shop_info(
        pool: &PgPool,
        seller_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, {images} AS images_json, {reviews} AS reviews_json \
             FROM products p \
             WHERE p.seller_id = $1 \
             ORDER BY p.creation_date DESC",
            images = all_images_subquery(),
            reviews = reviews_subquery(),
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(seller_id)
            .fetch_all(pool)
            .await?;

        let shop_name: Option<String> =
            sqlx::query_scalar("SELECT shop_name FROM artisan_profiles WHERE user_id = $1")
                .bind(seller_id)
                .fetch_optional(pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_product(shop_name.clone(), None))
            .collect())
    }

    /// 首页精选：上架且加精的最新 4 个产品
    pub async fn find_featured(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, {images} AS images_json, {reviews} AS reviews_json \
             FROM products p \
             WHERE p.is_active = TRUE AND p.is_featured = TRUE \
             ORDER BY p.creation_date DESC \
             LIMIT 4",
            images = primary_image_subquery(),
            reviews = reviews_subquery(),
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql).fetch_all(pool).await?;

        Self::attach_shop_names(pool, rows).await
    }

    /// 部分更新；附带主图时在同一事务内更新或补建图片行
    pub async fn update(
        pool: &PgPool,
        product_id: Uuid,
        data: ProductData,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                quantity_available = COALESCE($5, quantity_available),
                category_id = COALESCE($6, category_id),
                materials_used = COALESCE($7, materials_used),
                dimensions = COALESCE($8, dimensions),
                weight = COALESCE($9, weight),
                care_instructions = COALESCE($10, care_instructions),
                tags = COALESCE($11, tags),
                is_featured = COALESCE($12, is_featured),
                is_active = COALESCE($13, is_active),
                last_updated = NOW()
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.quantity_available)
        .bind(data.category_id)
        .bind(&data.materials_used)
        .bind(&data.dimensions)
        .bind(data.weight)
        .bind(&data.care_instructions)
        .bind(data.tags.map(sqlx::types::Json))
        .bind(data.is_featured)
        .bind(data.is_active)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        if let Some(image_url) = &data.image_url {
            let touched = sqlx::query(
                "UPDATE product_images SET image_url = $2 \
                 WHERE product_id = $1 AND is_primary = TRUE",
            )
            .bind(product_id)
            .bind(image_url)
            .execute(&mut *tx)
            .await?;

            if touched.rows_affected() == 0 {
                sqlx::query(
                    r#"
                    INSERT INTO product_images (image_id, product_id, image_url, is_primary, created_at)
                    VALUES ($1, $2, $3, TRUE, NOW())
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(product_id)
                .bind(image_url)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Self::find_by_id(pool, product_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// 删除产品及其全部图片。目标行已不存在按幂等成功处理
    pub async fn delete(pool: &PgPool, product_id: Uuid) -> Result<DeleteOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            Ok(DeleteOutcome::AlreadyDeleted)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }

    /// 卖家平均评分，只统计已审核通过的评价
    pub async fn seller_average_rating(
        pool: &PgPool,
        seller_id: &str,
    ) -> Result<SellerRating, sqlx::Error> {
        let row: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rv.rating)::float8, COUNT(rv.review_id)
            FROM reviews rv
            JOIN products p ON p.product_id = rv.product_id
            WHERE p.seller_id = $1 AND rv.is_approved = TRUE
            "#,
        )
        .bind(seller_id)
        .fetch_one(pool)
        .await?;

        Ok(SellerRating {
            average_rating: round_to_one_decimal(row.0.unwrap_or(0.0)),
            review_count: row.1,
        })
    }

    // 店铺名称按本页出现的卖家ID批量查询后在内存合并，避免逐行查询
    async fn attach_shop_names(
        pool: &PgPool,
        rows: Vec<ProductRow>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let seller_ids: Vec<String> = rows
            .iter()
            .map(|row| row.seller_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let shop_map: HashMap<String, String> = if seller_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, (String, String)>(
                "SELECT user_id, shop_name FROM artisan_profiles WHERE user_id = ANY($1)",
            )
            .bind(&seller_ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let shop_name = shop_map.get(&row.seller_id).cloned();
                row.into_product(shop_name, None)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_row() -> ProductRow {
        ProductRow {
            product_id: Uuid::new_v4(),
            seller_id: "seller-1".into(),
            category_id: None,
            name: "胡桃木茶盘".into(),
            description: "手工打磨".into(),
            price: Decimal::from_str("128.50").unwrap(),
            quantity_available: 3,
            materials_used: Some("胡桃木".into()),
            dimensions: None,
            weight: None,
            care_instructions: None,
            tags: Some(json!(["wood", "handmade"])),
            is_featured: false,
            is_active: true,
            average_rating: Some(4.5),
            review_count: 2,
            creation_date: Utc::now(),
            last_updated: Utc::now(),
            images_json: Some(json!([{
                "image_id": "7f3c6f0a-2c8e-4f6e-9e1a-0c9d2b8a4e5f",
                "image_url": "https://img.example.com/1.jpg",
                "is_primary": true,
                "alt_text": null,
                "display_order": 1,
                "created_at": "2026-08-01T08:00:00+00:00"
            }])),
            reviews_json: Some(json!([{
                "review_id": "4e0a1b2c-3d4e-5f60-8192-a3b4c5d6e7f8",
                "user_id": "buyer-1",
                "rating": 5,
                "title": "很好",
                "comment": null,
                "review_date": "2026-08-02T10:30:00+00:00",
                "is_approved": true,
                "helpful_count": 0,
                "updated_at": null
            }])),
        }
    }

    #[test]
    fn test_into_product_decodes_aggregated_relations() {
        let product = sample_row().into_product(Some("青山木坊".into()), None);

        assert_eq!(product.tags.as_deref(), Some(&["wood".to_string(), "handmade".to_string()][..]));
        assert_eq!(product.images.len(), 1);
        assert!(product.images[0].is_primary);
        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.reviews[0].rating, 5);
        assert_eq!(product.reviews[0].user_name, None);
        assert_eq!(product.shop_name.as_deref(), Some("青山木坊"));
    }

    #[test]
    fn test_into_product_tolerates_missing_relations() {
        let mut row = sample_row();
        row.images_json = None;
        row.reviews_json = Some(serde_json::Value::Null);
        row.tags = None;

        let product = row.into_product(None, None);
        assert!(product.images.is_empty());
        assert!(product.reviews.is_empty());
        assert_eq!(product.tags, None);
    }

    #[test]
    fn test_order_by_clause() {
        assert_eq!(order_by_clause(SortBy::Newest), "p.creation_date DESC");
        assert_eq!(order_by_clause(SortBy::PriceAsc), "p.price ASC");
        assert_eq!(order_by_clause(SortBy::PriceDesc), "p.price DESC");
        assert_eq!(
            order_by_clause(SortBy::Rating),
            "p.average_rating DESC NULLS LAST, p.review_count DESC"
        );
    }

    #[test]
    fn test_sort_by_deserializes_kebab_case() {
        assert_eq!(
            serde_json::from_str::<SortBy>("\"price-asc\"").unwrap(),
            SortBy::PriceAsc
        );
        assert_eq!(
            serde_json::from_str::<SortBy>("\"rating\"").unwrap(),
            SortBy::Rating
        );
        assert_eq!(SortBy::default(), SortBy::Newest);
    }

    #[test]
    fn test_parse_accepts_complete_form() {
        let form = ProductForm {
            name: Some("胡桃木茶盘".into()),
            description: Some("手工打磨".into()),
            price: Some("128.50".into()),
            quantity_available: Some("3".into()),
            tags: Some(r#"["wood","handmade"]"#.into()),
            is_featured: Some("on".into()),
            ..Default::default()
        };

        let data = form.parse(true).unwrap();
        assert_eq!(data.price, Some(Decimal::from_str("128.50").unwrap()));
        assert_eq!(data.quantity_available, Some(3));
        assert_eq!(data.tags.as_deref().map(|t| t.len()), Some(2));
        assert_eq!(data.is_featured, Some(true));
        assert_eq!(data.is_active, None);
    }

    #[test]
    fn test_parse_requires_core_fields_on_create() {
        let errors = ProductForm::default().parse(true).unwrap_err();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("description"));
        assert!(errors.contains_key("price"));

        // 更新时允许全部缺省
        assert!(ProductForm::default().parse(false).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let form = ProductForm {
            name: Some("茶盘".into()),
            description: Some("描述".into()),
            price: Some("-1".into()),
            quantity_available: Some("many".into()),
            tags: Some("wood,handmade".into()),
            category_id: Some("not-a-uuid".into()),
            ..Default::default()
        };

        let errors = form.parse(true).unwrap_err();
        assert!(errors.contains_key("price"));
        assert!(errors.contains_key("quantity_available"));
        assert!(errors.contains_key("tags"));
        assert!(errors.contains_key("category_id"));
    }

    #[test]
    fn test_parse_treats_blank_as_absent() {
        let form = ProductForm {
            name: Some("茶盘".into()),
            description: Some("描述".into()),
            price: Some("10".into()),
            materials_used: Some("   ".into()),
            image_url: Some("".into()),
            ..Default::default()
        };

        let data = form.parse(true).unwrap();
        assert_eq!(data.materials_used, None);
        assert_eq!(data.image_url, None);
    }

    #[test]
    fn test_parse_checkbox() {
        assert_eq!(parse_checkbox(Some("on".into())), Some(true));
        assert_eq!(parse_checkbox(Some("true".into())), Some(true));
        assert_eq!(parse_checkbox(Some("false".into())), Some(false));
        assert_eq!(parse_checkbox(Some("0".into())), Some(false));
        assert_eq!(parse_checkbox(Some("  ".into())), None);
        assert_eq!(parse_checkbox(None), None);
    }
}
