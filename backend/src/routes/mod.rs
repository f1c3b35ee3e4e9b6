//! Route definitions for the Juice Production Planning service

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - reference data
        .nest("/products", product_routes(state.clone()))
        .route(
            "/bottle-types",
            get(handlers::list_bottle_types)
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Protected routes - planning and execution
        .nest("/production", production_routes(state.clone()))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes(state))
}

/// Product routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products))
        .route("/:product_id", get(handlers::get_product))
        .route(
            "/:product_id/ratios/refresh",
            post(handlers::refresh_product_ratios),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Room for multipart boundaries and part headers around the image bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Request body limit for quality image uploads
fn upload_body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Production routes (protected)
fn production_routes(state: AppState) -> Router<AppState> {
    let image_limit = upload_body_limit(state.config.storage.max_image_bytes);

    Router::new()
        .route("/preview", post(handlers::preview_requirements))
        .route("/batch-code", post(handlers::generate_batch_code))
        .route(
            "/quality-images",
            post(handlers::upload_quality_image).layer(DefaultBodyLimit::max(image_limit)),
        )
        .route(
            "/batches",
            get(handlers::list_batches).post(handlers::create_plan),
        )
        .route(
            "/batches/:batch_code",
            get(handlers::get_batch).put(handlers::update_plan),
        )
        .route("/batches/:batch_code/execute", post(handlers::execute_batch))
        .route(
            "/batches/:batch_code/movements",
            get(handlers::list_batch_movements),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/batches", get(handlers::list_inventory_batches))
        .route("/availability", get(handlers::material_availability))
        .route("/movements", get(handlers::list_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
