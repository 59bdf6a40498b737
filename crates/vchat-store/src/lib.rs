//! Local filesystem media store.
//!
//! This crate provides:
//! - Validated writes of uploaded videos to an uploads directory
//! - Collision-resistant generated filenames
//! - Traversal-safe resolution of stored files

pub mod error;
pub mod store;

pub use error::{StorageError, StoreResult};
pub use store::{MediaStore, MAX_UPLOAD_BYTES};
