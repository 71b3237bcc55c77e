use super::report::DependencyReport;
use crate::binary::ParseError;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Accumulates edges and failures for one invocation.
///
/// Keys handed to the aggregator are already normalized; it keeps each
/// dependents list duplicate-free in first-seen order.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    dependencies: BTreeMap<String, Vec<String>>,
    edges: HashSet<(String, String)>,
    resolved: BTreeSet<String>,
    errors: BTreeMap<String, String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` depends on `library`. Returns `false` when the
    /// edge was already known.
    pub fn add_edge(&mut self, library: &str, dependent: &str) -> bool {
        if !self
            .edges
            .insert((library.to_string(), dependent.to_string()))
        {
            return false;
        }
        self.dependencies
            .entry(library.to_string())
            .or_default()
            .push(dependent.to_string());
        true
    }

    /// Flags `library` as a file located by the resolver, as opposed to a
    /// declared name that no candidate directory satisfied.
    pub fn mark_resolved(&mut self, library: &str) {
        if !self.resolved.contains(library) {
            self.resolved.insert(library.to_string());
        }
    }

    pub fn record_error(&mut self, binary: &str, error: &ParseError) {
        self.errors.insert(binary.to_string(), error.to_string());
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn finish(self) -> DependencyReport {
        DependencyReport {
            dependencies: self.dependencies,
            errors: self.errors,
            resolved: self.resolved,
        }
    }
}
