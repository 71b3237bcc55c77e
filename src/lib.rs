//! Dependency Lister - shared-library closure resolution
//!
//! This crate resolves, for a batch of ELF, Mach-O and PE binaries, the full
//! transitive graph of shared libraries they declare, using a caller-supplied
//! ordered list of search directories. The result maps every library to the
//! binaries that depend on it, plus a per-binary error map for files that
//! could not be analyzed.

pub mod binary;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod resolve;

pub use binary::{BinaryFormat, DependencyToken, ParseError, ParsedBinary};
pub use config::{ConfigError, ListerConfig};
pub use error::ListerError;
pub use graph::{DependencyGraphBuilder, DependencyReport, PathNormalization, TraversalMode};
pub use resolve::{BuildTarget, Resolution, SearchPathResolver};

/// Lists the transitive shared-library dependencies of `binary_paths`,
/// resolving names against `search_paths` in order.
pub fn list_dependencies<B, S>(binary_paths: &[B], search_paths: &[S]) -> DependencyReport
where
    B: AsRef<str>,
    S: AsRef<str>,
{
    let search_paths: Vec<&str> = search_paths.iter().map(|p| p.as_ref()).collect();
    DependencyGraphBuilder::new(&search_paths).build(binary_paths)
}

/// [`list_dependencies`] for async callers.
pub async fn list_dependencies_async(
    binary_paths: Vec<String>,
    search_paths: Vec<String>,
) -> Result<DependencyReport, ListerError> {
    DependencyGraphBuilder::new(&search_paths)
        .build_async(binary_paths)
        .await
}
