//! Error handling for the Juice Production Planning service
//!
//! Provides consistent error responses in Thai and English

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{MaterialShortage, ValidationFailure};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_th: String,
    },

    /// Stock does not cover the plan; resubmit with `confirm_shortage`
    #[error("Shortage confirmation required for {} material(s)", shortages.len())]
    ShortageConfirmationRequired { shortages: Vec<MaterialShortage> },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_th: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Batch is missing or no longer planned
    #[error("Production batch {0} not found or already executed")]
    NotFoundOrAlreadyExecuted(String),

    // External service errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        AppError::Validation {
            field: failure.field,
            message: failure.message,
            message_th: failure.message_th,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: format!("Invalid value for {}", field),
            message_th: format!("ข้อมูล {} ไม่ถูกต้อง", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_th: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub fn new(code: &str, message_en: impl Into<String>, message_th: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_th: message_th.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired", "โทเค็นหมดอายุแล้ว"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "โทเค็นไม่ถูกต้อง"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    "คุณไม่มีสิทธิ์ในการดำเนินการนี้",
                ),
            ),
            AppError::Validation { field, message, message_th } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_th.clone())
                    .with_field(field),
            ),
            AppError::ShortageConfirmationRequired { shortages } => {
                let mut detail = ErrorDetail::new(
                    "SHORTAGE_CONFIRMATION_REQUIRED",
                    "Raw material stock is not enough for this plan. Confirm to save it anyway.",
                    "วัตถุดิบในคลังไม่เพียงพอสำหรับแผนนี้ ยืนยันเพื่อบันทึกแผนต่อ",
                );
                detail.details = serde_json::to_value(shortages).ok();
                (StatusCode::CONFLICT, detail)
            }
            AppError::Conflict { resource, message, message_th } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone(), message_th.clone())
                    .with_field(resource),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("ไม่พบ {}", resource),
                ),
            ),
            AppError::NotFoundOrAlreadyExecuted(batch_code) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "BATCH_NOT_PLANNED",
                    format!(
                        "Production batch {} was not found or has already been executed",
                        batch_code
                    ),
                    format!("ไม่พบล็อตการผลิต {} หรือล็อตนี้ผลิตเสร็จแล้ว", batch_code),
                ),
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "STORAGE_ERROR",
                    format!("Storage error: {}", msg),
                    format!("เกิดข้อผิดพลาดในการจัดเก็บ: {}", msg),
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "CONFIGURATION_ERROR",
                    format!("Configuration error: {}", msg),
                    format!("เกิดข้อผิดพลาดในการตั้งค่า: {}", msg),
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "เกิดข้อผิดพลาดกับฐานข้อมูล",
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone(), "เกิดข้อผิดพลาดภายในเซิร์ฟเวอร์"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Whether a database error is a unique violation on the named constraint
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_validation_failure_conversion() {
        let failure = ValidationFailure::new("product_id", "Please select a product", "กรุณาเลือกสินค้า");
        let (status, detail) = AppError::from(failure).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("product_id"));
    }

    #[test]
    fn test_shortage_confirmation_carries_report() {
        let err = AppError::ShortageConfirmationRequired {
            shortages: vec![MaterialShortage {
                material_type: "Orange Concentrate".to_string(),
                required_quantity: Decimal::from(100),
                available_quantity: Decimal::from(70),
                shortage: Decimal::from(30),
            }],
        };
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(detail.code, "SHORTAGE_CONFIRMATION_REQUIRED");
        let details = detail.details.unwrap();
        assert_eq!(details[0]["material_type"], "Orange Concentrate");
    }

    #[test]
    fn test_not_planned_is_a_conflict() {
        let (status, detail) =
            AppError::NotFoundOrAlreadyExecuted("PJ7KQ2MX".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(detail.code, "BATCH_NOT_PLANNED");
    }

    #[test]
    fn test_upstream_failures_map_to_server_errors() {
        let (status, detail) =
            AppError::StorageError("connection refused".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(detail.code, "STORAGE_ERROR");

        let (status, detail) = AppError::Internal("broken invariant".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail.code, "INTERNAL_ERROR");
    }
}
