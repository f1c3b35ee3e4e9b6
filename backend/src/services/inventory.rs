//! Raw material inventory: FIFO batch lookups, stock consumption and the
//! movement ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use shared::{
    InventoryBatch, InventoryBatchStatus, InventoryBatchUpdate, InventoryMovement, MaterialStock,
    MovementDirection, MovementReferenceType,
};

/// Inventory service for stock lookups and ledger reads
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Database row for inventory batch
#[derive(Debug, FromRow)]
struct InventoryBatchRow {
    id: Uuid,
    batch_code: String,
    material_type: String,
    supplier: Option<String>,
    purchase_date: NaiveDate,
    quantity: Decimal,
    remaining_quantity: Decimal,
    unit_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl From<InventoryBatchRow> for InventoryBatch {
    fn from(row: InventoryBatchRow) -> Self {
        InventoryBatch {
            id: row.id,
            batch_code: row.batch_code,
            material_type: row.material_type,
            supplier: row.supplier,
            purchase_date: row.purchase_date,
            quantity: row.quantity,
            remaining_quantity: row.remaining_quantity,
            unit_price: row.unit_price,
            status: InventoryBatchStatus::from_str(&row.status)
                .unwrap_or(InventoryBatchStatus::Finished),
            created_at: row.created_at,
            finished_at: row.finished_at,
        }
    }
}

/// Database row for inventory movement
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    material_type: String,
    inventory_batch_id: Uuid,
    direction: String,
    quantity: Decimal,
    previous_quantity: Decimal,
    new_quantity: Decimal,
    reference: String,
    reference_type: String,
    unit_price: Decimal,
    created_at: DateTime<Utc>,
    created_by: Uuid,
}

impl From<MovementRow> for InventoryMovement {
    fn from(row: MovementRow) -> Self {
        InventoryMovement {
            id: row.id,
            material_type: row.material_type,
            inventory_batch_id: row.inventory_batch_id,
            direction: MovementDirection::from_str(&row.direction).unwrap_or(MovementDirection::Out),
            quantity: row.quantity,
            previous_quantity: row.previous_quantity,
            new_quantity: row.new_quantity,
            reference: row.reference,
            reference_type: MovementReferenceType::from_str(&row.reference_type)
                .unwrap_or(MovementReferenceType::Production),
            unit_price: row.unit_price,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

/// Stock on hand for one material
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MaterialAvailability {
    pub material_type: String,
    pub active_batches: i64,
    pub remaining_quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_value: Option<Decimal>,
}

/// Query for listing inventory batches
#[derive(Debug, Default, Deserialize)]
pub struct InventoryBatchQuery {
    pub material_type: Option<String>,
    #[serde(default)]
    pub include_finished: bool,
}

const BATCH_COLUMNS: &str = "id, batch_code, material_type, supplier, purchase_date, quantity, \
     remaining_quantity, unit_price, status, created_at, finished_at";

const MOVEMENT_COLUMNS: &str = "id, material_type, inventory_batch_id, direction, quantity, \
     previous_quantity, new_quantity, reference, reference_type, unit_price, created_at, created_by";

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active batches of a material with stock left, oldest first
    pub async fn fifo_batches(&self, material_type: &str) -> AppResult<Vec<InventoryBatch>> {
        let rows = sqlx::query_as::<_, InventoryBatchRow>(&format!(
            r#"
            SELECT {}
            FROM inventory_batches
            WHERE material_type = $1 AND status = 'active' AND remaining_quantity > 0
            ORDER BY created_at, id
            "#,
            BATCH_COLUMNS
        ))
        .bind(material_type)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// FIFO batches for every material. A material whose lookup fails is left
    /// out of the map, which the requirement calculation treats as no stock.
    pub async fn load_stock(&self, materials: &[String]) -> MaterialStock {
        let mut stock = MaterialStock::new();
        for material in materials {
            match self.fifo_batches(material).await {
                Ok(batches) => {
                    stock.insert(material.clone(), batches);
                }
                Err(e) => {
                    tracing::warn!(
                        material_type = %material,
                        "Inventory lookup failed, treating as unavailable: {}",
                        e
                    );
                }
            }
        }
        stock
    }

    /// List batches, FIFO order within each material
    pub async fn list_batches(&self, query: &InventoryBatchQuery) -> AppResult<Vec<InventoryBatch>> {
        let rows = sqlx::query_as::<_, InventoryBatchRow>(&format!(
            r#"
            SELECT {}
            FROM inventory_batches
            WHERE ($1::text IS NULL OR material_type = $1)
              AND ($2 OR status = 'active')
            ORDER BY material_type, created_at, id
            "#,
            BATCH_COLUMNS
        ))
        .bind(&query.material_type)
        .bind(query.include_finished)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Remaining stock per material across active batches
    pub async fn material_availability(&self, include_cost: bool) -> AppResult<Vec<MaterialAvailability>> {
        let mut rows = sqlx::query_as::<_, MaterialAvailability>(
            r#"
            SELECT material_type,
                   COUNT(*) AS active_batches,
                   COALESCE(SUM(remaining_quantity), 0) AS remaining_quantity,
                   COALESCE(SUM(remaining_quantity * unit_price), 0) AS remaining_value
            FROM inventory_batches
            WHERE status = 'active' AND remaining_quantity > 0
            GROUP BY material_type
            ORDER BY material_type
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        if !include_cost {
            for row in &mut rows {
                row.remaining_value = None;
            }
        }

        Ok(rows)
    }

    /// Movements written for a production batch, in write order
    pub async fn list_movements(&self, reference: &str) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM inventory_movements WHERE reference = $1 ORDER BY seq",
            MOVEMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Transactional helpers used by the execution commit
// ============================================================================

/// Lock a material's active batches for the rest of the transaction and
/// return them oldest first
pub async fn lock_fifo_batches(
    conn: &mut PgConnection,
    material_type: &str,
) -> AppResult<Vec<InventoryBatch>> {
    let rows = sqlx::query_as::<_, InventoryBatchRow>(&format!(
        r#"
        SELECT {}
        FROM inventory_batches
        WHERE material_type = $1 AND status = 'active' AND remaining_quantity > 0
        ORDER BY created_at, id
        FOR UPDATE
        "#,
        BATCH_COLUMNS
    ))
    .bind(material_type)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Write a batch's new remaining quantity; a depleted batch becomes finished
pub async fn apply_batch_update(
    conn: &mut PgConnection,
    update: &InventoryBatchUpdate,
    at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE inventory_batches
        SET remaining_quantity = $2,
            status = CASE WHEN $3 THEN 'finished' ELSE status END,
            finished_at = CASE WHEN $3 THEN $4 ELSE finished_at END
        WHERE id = $1
        "#,
    )
    .bind(update.inventory_batch_id)
    .bind(update.remaining_quantity)
    .bind(update.finished)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_movement(conn: &mut PgConnection, movement: &InventoryMovement) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, material_type, inventory_batch_id, direction, quantity,
            previous_quantity, new_quantity, reference, reference_type,
            unit_price, created_at, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(movement.id)
    .bind(&movement.material_type)
    .bind(movement.inventory_batch_id)
    .bind(movement.direction.as_str())
    .bind(movement.quantity)
    .bind(movement.previous_quantity)
    .bind(movement.new_quantity)
    .bind(&movement.reference)
    .bind(movement.reference_type.as_str())
    .bind(movement.unit_price)
    .bind(movement.created_at)
    .bind(movement.created_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
