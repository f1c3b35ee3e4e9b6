//! HTTP request handlers

pub mod catalog;
pub mod health;
pub mod inventory;
pub mod media;
pub mod production;

pub use catalog::*;
pub use health::*;
pub use inventory::*;
pub use media::*;
pub use production::*;
