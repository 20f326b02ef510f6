//! Value types exchanged with external collaborators.

pub mod routing;

pub use routing::{AnalysisContext, Routing, RoutingDecision};
