use super::normalize::PathNormalization;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Result of one dependency listing.
///
/// `dependencies` maps each library (canonical path when resolved, raw
/// declared name otherwise) to the binaries that depend on it, in first-seen
/// order. `errors` maps each binary that failed to parse to a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub errors: BTreeMap<String, String>,
    /// Keys of `dependencies` the resolver located, recorded when the edge
    /// was added. Not part of the serialized report.
    #[serde(skip)]
    pub resolved: BTreeSet<String>,
}

impl DependencyReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn dependents_of(&self, library: &str) -> Option<&[String]> {
        self.dependencies.get(library).map(Vec::as_slice)
    }

    /// Libraries that were located on disk.
    pub fn resolved_libraries(&self) -> Vec<&str> {
        self.dependencies
            .keys()
            .filter(|key| self.resolved.contains(*key))
            .map(String::as_str)
            .collect()
    }

    /// Declared dependencies that no candidate directory satisfied.
    pub fn unresolved(&self) -> Vec<&str> {
        self.dependencies
            .keys()
            .filter(|key| !self.resolved.contains(*key))
            .map(String::as_str)
            .collect()
    }

    /// Files a packager would ship: the inputs (in input order, those that
    /// exist as files) followed by every resolved library, without duplicates.
    pub fn bundle_files<S: AsRef<str>>(&self, binary_paths: &[S]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for input in binary_paths {
            let path = Path::new(input.as_ref());
            let normalized = PathNormalization::Lexical
                .normalize(path)
                .unwrap_or_else(|_| path.to_path_buf());
            if normalized.is_file() && seen.insert(normalized.clone()) {
                files.push(normalized);
            }
        }
        for library in self.resolved_libraries() {
            let path = PathBuf::from(library);
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
        files
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }
}
