//! Shared utilities

pub mod error;
pub mod opener;

pub use error::{AppError, AppResult, ErrorResponse};
