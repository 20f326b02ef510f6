//! # docroute-core
//!
//! Core crate for DocRoute. Contains the unified error system, the layered
//! configuration schema, and the traits through which the worker talks to
//! its external collaborators (object storage, text extraction, and the
//! classification service).
//!
//! This crate has **no** internal dependencies on other DocRoute crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
