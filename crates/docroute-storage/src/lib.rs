//! # docroute-storage
//!
//! Object storage providers for uploaded job files (local filesystem and
//! HTTP object storage) and the [`ByteFetcher`] that turns a resolved file
//! locator into bytes.

pub mod fetch;
pub mod manager;
pub mod providers;

pub use fetch::{ByteFetcher, FetchError};
pub use manager::build_provider;
