//! Built-in job handler implementations.

pub mod analyze;
pub mod classify;

pub use analyze::AnalyzeJobHandler;
pub use classify::ClassifyJobHandler;
