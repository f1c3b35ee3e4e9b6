//! WebAssembly module for Juice Production Planning
//!
//! Lets the planning form compute volumes, material requirements and
//! candidate batch codes without a round trip. Structured values cross the
//! boundary as JSON strings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("juice-production-wasm loaded"));
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&format!("{}: {}", context, err)).into()
}

fn parse<T: for<'de> Deserialize<'de>>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| js_error(&format!("Invalid {} JSON", what), e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error("Serialization failed", e))
}

/// Total filled volume in liters, as a decimal string
#[wasm_bindgen]
pub fn calculate_bottle_volume(bottle_types_json: &str, quantities_json: &str) -> Result<String, JsValue> {
    let bottle_types: Vec<BottleType> = parse(bottle_types_json, "bottle types")?;
    let quantities: BottleQuantities = parse(quantities_json, "quantities")?;
    Ok(total_volume_liters(&bottle_types, &quantities).to_string())
}

#[derive(Deserialize)]
struct RequirementInput {
    product: Product,
    bottle_types: Vec<BottleType>,
    quantities: BottleQuantities,
    #[serde(default)]
    stock: MaterialStock,
    #[serde(default)]
    fallback_ratio: Option<MaterialRatio>,
    #[serde(default)]
    include_cost: bool,
}

/// Requirement preview for a bottle mix.
///
/// Takes `{ product, bottle_types, quantities, stock?, fallback_ratio?, include_cost? }`
/// and returns the requirement calculation as JSON.
#[wasm_bindgen]
pub fn preview_requirements(input_json: &str) -> Result<String, JsValue> {
    let input: RequirementInput = parse(input_json, "requirement input")?;
    let fallback = input.fallback_ratio.unwrap_or_default();
    let ratios = estimate_material_ratios(&input.product, &fallback);

    let mut calculation = calculate_requirements(
        &input.product,
        &input.bottle_types,
        &input.quantities,
        &ratios,
        &input.stock,
    );
    if !input.include_cost {
        calculation.strip_costs();
    }
    to_json(&calculation)
}

/// Per-material ratios for a product, defaulting to 2.0 kg/L where no history exists
#[wasm_bindgen]
pub fn estimate_ratios(product_json: &str) -> Result<String, JsValue> {
    let product: Product = parse(product_json, "product")?;
    to_json(&estimate_material_ratios(&product, &MaterialRatio::conservative_default()))
}

/// Candidate batch code; the server still checks it for uniqueness
#[wasm_bindgen]
pub fn generate_candidate_batch_code(product_name: &str) -> String {
    generate_batch_code(product_name, &mut rand::thread_rng())
}

#[wasm_bindgen]
pub fn check_batch_code(code: &str) -> bool {
    is_valid_batch_code(code)
}

#[derive(Deserialize)]
struct PlanForm {
    product_id: Option<Uuid>,
    production_date: Option<NaiveDate>,
    #[serde(default)]
    planned_bottles: BottleQuantities,
}

/// Validate the planning form before submit.
///
/// Returns `null` when valid, otherwise `{ field, message, message_th }`.
#[wasm_bindgen]
pub fn validate_plan_form(form_json: &str) -> Result<String, JsValue> {
    let form: PlanForm = parse(form_json, "plan form")?;
    match validate_plan_request(form.product_id, form.production_date, &form.planned_bottles) {
        Ok(()) => Ok("null".to_string()),
        Err(failure) => Ok(failure_json(&failure)),
    }
}

#[derive(Deserialize)]
struct ExecutionForm {
    #[serde(default)]
    actual_bottles: BottleQuantities,
    #[serde(default)]
    actual_materials_used: BTreeMap<String, Decimal>,
}

/// Validate the execution form before submit; same result shape as `validate_plan_form`
#[wasm_bindgen]
pub fn validate_execution_form(form_json: &str) -> Result<String, JsValue> {
    let form: ExecutionForm = parse(form_json, "execution form")?;
    match validate_execution_request(&form.actual_bottles, &form.actual_materials_used) {
        Ok(()) => Ok("null".to_string()),
        Err(failure) => Ok(failure_json(&failure)),
    }
}

fn failure_json(failure: &ValidationFailure) -> String {
    serde_json::json!({
        "field": failure.field,
        "message": failure.message,
        "message_th": failure.message_th,
    })
    .to_string()
}
