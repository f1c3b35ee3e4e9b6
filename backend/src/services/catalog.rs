//! Read-only reference data: products and bottle types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{BottleType, MaterialRatios, Product};

/// Catalog service for products and bottle types
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Database row for product
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    name_th: Option<String>,
    category: String,
    materials: Json<Vec<String>>,
    average_ratios: Option<Json<MaterialRatios>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            name_th: row.name_th,
            category: row.category,
            materials: row.materials.0,
            average_ratios: row.average_ratios.map(|r| r.0),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for bottle type
#[derive(Debug, sqlx::FromRow)]
struct BottleTypeRow {
    id: Uuid,
    name: String,
    size_ml: i32,
    unit_cost: Decimal,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BottleTypeRow> for BottleType {
    fn from(row: BottleTypeRow) -> Self {
        BottleType {
            id: row.id,
            name: row.name,
            size_ml: row.size_ml,
            unit_cost: row.unit_cost,
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, name_th, category, materials, average_ratios, is_active, created_at, updated_at";

const BOTTLE_TYPE_COLUMNS: &str =
    "id, name, size_ml, unit_cost, stock, is_active, created_at, updated_at";

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active products sorted by name
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE is_active ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1 AND is_active",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Active bottle types, smallest first
    pub async fn list_bottle_types(&self) -> AppResult<Vec<BottleType>> {
        let rows = sqlx::query_as::<_, BottleTypeRow>(&format!(
            "SELECT {} FROM bottle_types WHERE is_active ORDER BY size_ml, name",
            BOTTLE_TYPE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every bottle type, including retired ones still referenced by history
    pub async fn list_all_bottle_types(&self) -> AppResult<Vec<BottleType>> {
        let rows = sqlx::query_as::<_, BottleTypeRow>(&format!(
            "SELECT {} FROM bottle_types ORDER BY size_ml, name",
            BOTTLE_TYPE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Replace a product's recorded material ratios
    pub async fn update_average_ratios(
        &self,
        product_id: Uuid,
        ratios: &MaterialRatios,
    ) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET average_ratios = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(Json(ratios))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }
}
