//! Dependency graph traversal and result assembly.

pub mod aggregator;
pub mod builder;
pub mod normalize;
pub mod report;

pub use aggregator::ResultAggregator;
pub use builder::{DependencyGraphBuilder, TraversalMode};
pub use normalize::PathNormalization;
pub use report::DependencyReport;
