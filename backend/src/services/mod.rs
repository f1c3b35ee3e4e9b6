//! Business logic services for the Juice Production Planning service

pub mod batch_code;
pub mod catalog;
pub mod execution;
pub mod inventory;
pub mod planning;
pub mod production_batches;
pub mod ratios;

pub use batch_code::BatchCodeService;
pub use catalog::CatalogService;
pub use execution::ExecutionService;
pub use inventory::InventoryService;
pub use planning::PlanningService;
pub use ratios::RatioService;
