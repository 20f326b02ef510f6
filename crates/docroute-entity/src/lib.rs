//! # docroute-entity
//!
//! Domain entity models for DocRoute: the job record, its lifecycle enums,
//! the persisted file payload representations, resolved file descriptors,
//! and the per-file outcomes that make up a job summary.

pub mod job;
