//! Domain models for production planning and execution

mod batch_code;
mod bottle;
mod inventory;
mod product;
mod production;
mod requirement;

pub use batch_code::*;
pub use bottle::*;
pub use inventory::*;
pub use product::*;
pub use production::*;
pub use requirement::*;
