//! Batch code allocation

use sqlx::PgPool;

use crate::services::production_batches;
use shared::generate_batch_code;

/// Draws candidate codes until one is not yet in use
#[derive(Clone)]
pub struct BatchCodeService {
    db: PgPool,
    max_attempts: u32,
}

impl BatchCodeService {
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    /// A code for `product_name` that was free at the time of the check.
    ///
    /// When the lookup itself fails the current candidate is returned as is;
    /// the unique constraint on insert catches the rare collision.
    pub async fn generate(&self, product_name: &str) -> String {
        let mut candidate = generate_batch_code(product_name, &mut rand::thread_rng());

        for attempt in 1..=self.max_attempts {
            match production_batches::code_exists(&self.db, &candidate).await {
                Ok(false) => return candidate,
                Ok(true) => {
                    tracing::debug!(attempt, "Batch code {} already taken", candidate);
                    candidate = generate_batch_code(product_name, &mut rand::thread_rng());
                }
                Err(e) => {
                    tracing::warn!("Batch code lookup failed, using {} unchecked: {}", candidate, e);
                    return candidate;
                }
            }
        }

        candidate
    }
}
