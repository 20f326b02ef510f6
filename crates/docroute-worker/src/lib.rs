//! Batch document job processing for DocRoute.
//!
//! This crate provides:
//! - A worker runner that claims eligible jobs and drives them to a
//!   terminal state
//! - A file resolver that reads every historical payload representation
//! - A per-file processor with bounded concurrency and retry
//! - Job handlers for classification and analysis, and the aggregator that
//!   turns their outcomes into a job summary

pub mod aggregator;
pub mod executor;
pub mod jobs;
pub mod processor;
pub mod queue;
pub mod resolver;
pub mod retry;
pub mod runner;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use processor::FileProcessor;
pub use queue::JobQueue;
pub use resolver::{FileResolver, ResolveError};
pub use retry::RetryPolicy;
pub use runner::WorkerRunner;
