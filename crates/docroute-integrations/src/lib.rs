//! # docroute-integrations
//!
//! Implementations of the external collaborators the worker depends on:
//! the OpenAI-compatible classification client and the text extractors.

pub mod extract;
pub mod openai;
pub mod prompts;

pub use extract::{FallbackExtractor, HttpTextExtractor, PlainTextExtractor, build_extractor};
pub use openai::OpenAiClassifier;
