//! Storage provider implementations.

pub mod http;
pub mod local;

pub use http::HttpStorageProvider;
pub use local::LocalStorageProvider;
