//! Core traits defined in `docroute-core` and implemented by other crates.

pub mod classifier;
pub mod extractor;
pub mod storage;

pub use classifier::{ClassifyError, Classifier};
pub use extractor::{ExtractError, ExtractionHint, TextExtractor};
pub use storage::StorageProvider;
