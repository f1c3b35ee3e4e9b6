//! External API integrations

pub mod media_storage;

pub use media_storage::{ImageUpload, MediaStorageClient};
