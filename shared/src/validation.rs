//! Validation for planning and execution input
//!
//! Every failure carries the offending field plus English and Thai messages
//! so the planning and execution forms can show them directly.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BottleQuantities, BottleType, QUANTITY_DECIMAL_PLACES};
use crate::types::ALLOWED_IMAGE_TYPES;

/// A user-correctable input problem
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
    pub message_th: String,
}

impl ValidationFailure {
    pub fn new(field: &str, message: &str, message_th: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            message_th: message_th.to_string(),
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Check the planning form: product, production date, then bottle mix
pub fn validate_plan_request(
    product_id: Option<Uuid>,
    production_date: Option<NaiveDate>,
    quantities: &BottleQuantities,
) -> Result<(), ValidationFailure> {
    if product_id.is_none() {
        return Err(ValidationFailure::new(
            "product_id",
            "Please select a product",
            "กรุณาเลือกสินค้า",
        ));
    }
    if production_date.is_none() {
        return Err(ValidationFailure::new(
            "production_date",
            "Please select a production date",
            "กรุณาเลือกวันที่ผลิต",
        ));
    }
    validate_bottle_quantities("bottle_quantities", quantities)
}

/// Counts must not be negative and at least one must be positive
pub fn validate_bottle_quantities(
    field: &str,
    quantities: &BottleQuantities,
) -> Result<(), ValidationFailure> {
    if quantities.values().any(|qty| *qty < 0) {
        return Err(ValidationFailure::new(
            field,
            "Bottle quantities cannot be negative",
            "จำนวนขวดต้องไม่ติดลบ",
        ));
    }
    if !quantities.values().any(|qty| *qty > 0) {
        return Err(ValidationFailure::new(
            field,
            "Please enter at least one bottle quantity",
            "กรุณาระบุจำนวนขวดอย่างน้อย 1 รายการ",
        ));
    }
    Ok(())
}

/// Every counted bottle type must exist among the active bottle types
pub fn validate_known_bottle_types(
    field: &str,
    quantities: &BottleQuantities,
    bottle_types: &[BottleType],
) -> Result<(), ValidationFailure> {
    let unknown = quantities
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .any(|(id, _)| !bottle_types.iter().any(|b| b.id == *id));

    if unknown {
        return Err(ValidationFailure::new(
            field,
            "Unknown or inactive bottle type",
            "ไม่พบประเภทขวดหรือประเภทขวดถูกปิดใช้งาน",
        ));
    }
    Ok(())
}

// ============================================================================
// Execution
// ============================================================================

/// Check the execution form: produced bottles and material usage
pub fn validate_execution_request(
    actual_bottles: &BottleQuantities,
    materials_used: &BTreeMap<String, Decimal>,
) -> Result<(), ValidationFailure> {
    validate_bottle_quantities("actual_bottles", actual_bottles)?;

    if materials_used.values().any(|qty| *qty < Decimal::ZERO) {
        return Err(ValidationFailure::new(
            "actual_materials_used",
            "Material quantities cannot be negative",
            "ปริมาณวัตถุดิบต้องไม่ติดลบ",
        ));
    }
    if materials_used
        .values()
        .any(|qty| qty.normalize().scale() > QUANTITY_DECIMAL_PLACES)
    {
        return Err(ValidationFailure::new(
            "actual_materials_used",
            "Material quantities allow at most 3 decimal places",
            "ปริมาณวัตถุดิบระบุทศนิยมได้ไม่เกิน 3 ตำแหน่ง",
        ));
    }
    if materials_used.keys().any(|m| m.trim().is_empty()) {
        return Err(ValidationFailure::new(
            "actual_materials_used",
            "Material type is required",
            "ต้องระบุประเภทวัตถุดิบ",
        ));
    }
    Ok(())
}

// ============================================================================
// Quality test evidence
// ============================================================================

/// Check an uploaded quality test photo before it is forwarded to storage
pub fn validate_image_upload(
    content_type: Option<&str>,
    size_bytes: usize,
    max_bytes: usize,
) -> Result<(), ValidationFailure> {
    match content_type {
        Some(ct) if ALLOWED_IMAGE_TYPES.contains(&ct) => {}
        _ => {
            return Err(ValidationFailure::new(
                "file",
                "Only JPEG, PNG or WebP images are accepted",
                "รองรับเฉพาะไฟล์รูปภาพ JPEG, PNG หรือ WebP",
            ))
        }
    }
    if size_bytes == 0 {
        return Err(ValidationFailure::new("file", "The file is empty", "ไฟล์ว่างเปล่า"));
    }
    if size_bytes > max_bytes {
        return Err(ValidationFailure::new(
            "file",
            "The image is too large",
            "ไฟล์รูปภาพมีขนาดใหญ่เกินไป",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quantities(counts: &[i32]) -> BottleQuantities {
        counts.iter().map(|c| (Uuid::new_v4(), *c)).collect()
    }

    fn today() -> Option<NaiveDate> {
        Some(Utc::now().date_naive())
    }

    // ========================================================================
    // Planning
    // ========================================================================

    #[test]
    fn test_plan_requires_product() {
        let err = validate_plan_request(None, today(), &quantities(&[5])).unwrap_err();
        assert_eq!(err.field, "product_id");
    }

    #[test]
    fn test_plan_requires_date() {
        let err = validate_plan_request(Some(Uuid::new_v4()), None, &quantities(&[5])).unwrap_err();
        assert_eq!(err.field, "production_date");
    }

    #[test]
    fn test_plan_requires_a_bottle() {
        let err =
            validate_plan_request(Some(Uuid::new_v4()), today(), &quantities(&[0, 0])).unwrap_err();
        assert_eq!(err.field, "bottle_quantities");

        let err = validate_plan_request(Some(Uuid::new_v4()), today(), &BottleQuantities::new())
            .unwrap_err();
        assert_eq!(err.field, "bottle_quantities");
    }

    #[test]
    fn test_plan_rejects_negative_counts() {
        assert!(validate_plan_request(Some(Uuid::new_v4()), today(), &quantities(&[4, -1])).is_err());
    }

    #[test]
    fn test_plan_valid() {
        assert!(validate_plan_request(Some(Uuid::new_v4()), today(), &quantities(&[0, 12])).is_ok());
    }

    #[test]
    fn test_unknown_bottle_type() {
        let counts = quantities(&[3]);
        assert!(validate_known_bottle_types("bottle_quantities", &counts, &[]).is_err());
        assert!(validate_known_bottle_types("bottle_quantities", &quantities(&[0]), &[]).is_ok());
    }

    // ========================================================================
    // Execution
    // ========================================================================

    #[test]
    fn test_execution_requires_output() {
        let err = validate_execution_request(&quantities(&[0]), &BTreeMap::new()).unwrap_err();
        assert_eq!(err.field, "actual_bottles");
    }

    #[test]
    fn test_execution_rejects_negative_usage() {
        let mut used = BTreeMap::new();
        used.insert("Sugar".to_string(), Decimal::from(-2));
        let err = validate_execution_request(&quantities(&[10]), &used).unwrap_err();
        assert_eq!(err.field, "actual_materials_used");
    }

    #[test]
    fn test_execution_rejects_usage_finer_than_grams() {
        let mut used = BTreeMap::new();
        used.insert("Orange".to_string(), Decimal::new(299996, 4));
        let err = validate_execution_request(&quantities(&[10]), &used).unwrap_err();
        assert_eq!(err.field, "actual_materials_used");

        used.insert("Orange".to_string(), Decimal::new(4, 4));
        assert!(validate_execution_request(&quantities(&[10]), &used).is_err());

        // Trailing zeros beyond the third place are fine
        used.insert("Orange".to_string(), Decimal::new(299900, 4));
        assert!(validate_execution_request(&quantities(&[10]), &used).is_ok());
    }

    #[test]
    fn test_execution_allows_zero_usage() {
        let mut used = BTreeMap::new();
        used.insert("Sugar".to_string(), Decimal::ZERO);
        assert!(validate_execution_request(&quantities(&[10]), &used).is_ok());
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    #[test]
    fn test_image_upload_validation() {
        let max = 5 * 1024 * 1024;
        assert!(validate_image_upload(Some("image/jpeg"), 1024, max).is_ok());
        assert!(validate_image_upload(Some("image/webp"), max, max).is_ok());
        assert!(validate_image_upload(Some("application/pdf"), 1024, max).is_err());
        assert!(validate_image_upload(None, 1024, max).is_err());
        assert!(validate_image_upload(Some("image/png"), 0, max).is_err());
        assert!(validate_image_upload(Some("image/png"), max + 1, max).is_err());
    }
}
