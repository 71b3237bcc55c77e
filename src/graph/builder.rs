use super::aggregator::ResultAggregator;
use super::normalize::PathNormalization;
use super::report::DependencyReport;
use crate::binary::{self, LoadOrigin, ParseError};
use crate::error::ListerError;
use crate::resolve::{Resolution, SearchPathResolver};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalMode {
    /// Reference single-threaded breadth-first traversal.
    #[default]
    Sequential,
    /// Each breadth-first level is parsed on a dedicated thread pool and
    /// merged in queue order, so the report matches `Sequential` exactly.
    Parallel { threads: usize },
}

/// A queued binary.
#[derive(Debug, Clone)]
struct Node {
    /// Normalized path; the graph identity of this binary.
    key: String,
    path: PathBuf,
    /// Where a parse failure is reported: the caller's spelling for inputs.
    error_key: String,
    executable_dir: PathBuf,
    is_input: bool,
}

impl Node {
    fn origin(&self) -> LoadOrigin {
        if self.is_input {
            LoadOrigin::for_executable(&self.path)
        } else {
            LoadOrigin::for_library(&self.path, &self.executable_dir)
        }
    }
}

/// One declared dependency after resolution and normalization.
#[derive(Debug)]
struct Edge {
    token: String,
    target: Option<(String, PathBuf)>,
}

#[derive(Debug)]
enum Expansion {
    Failed(ParseError),
    Expanded(Vec<Edge>),
}

/// Request-scoped traversal state.
#[derive(Debug, Default)]
struct TraversalState {
    visited: HashSet<String>,
    aggregator: ResultAggregator,
    parsed: usize,
}

impl TraversalState {
    /// Insert-once: only the first caller for a key gets `true`.
    fn visit(&mut self, key: &str) -> bool {
        self.visited.insert(key.to_string())
    }
}

/// Walks the transitive dependency closure of a set of binaries.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder {
    resolver: SearchPathResolver,
    normalization: PathNormalization,
    mode: TraversalMode,
}

impl DependencyGraphBuilder {
    pub fn new<P: AsRef<Path>>(search_paths: &[P]) -> Self {
        Self {
            resolver: SearchPathResolver::new(
                search_paths
                    .iter()
                    .map(|p| p.as_ref().to_path_buf())
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_normalization(mut self, normalization: PathNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        self.resolver.search_paths()
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    /// Lists the dependencies of `binary_paths`. Per-binary failures end up in
    /// the report's `errors`; this never fails as a whole.
    pub fn build<S: AsRef<str>>(&self, binary_paths: &[S]) -> DependencyReport {
        let started = Instant::now();
        let pool = match self.mode {
            TraversalMode::Sequential => None,
            TraversalMode::Parallel { threads } => {
                match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        warn!("Falling back to sequential traversal: {}", e);
                        None
                    }
                }
            }
        };

        let mut state = TraversalState::default();
        let mut frontier = self.seed(binary_paths, &mut state);

        while !frontier.is_empty() {
            debug!("Expanding {} binaries", frontier.len());
            let expansions = match &pool {
                Some(pool) => pool.install(|| self.expand_parallel(&frontier)),
                None => self.expand_sequential(&frontier),
            };
            state.parsed += frontier.len();
            frontier = self.merge(frontier, expansions, &mut state);
        }

        info!(
            "Listed dependencies of {} inputs: {} binaries parsed, {} edges, {} failures in {:?}",
            binary_paths.len(),
            state.parsed,
            state.aggregator.edge_count(),
            state.aggregator.error_count(),
            started.elapsed()
        );
        state.aggregator.finish()
    }

    /// Async entry point; the traversal runs on tokio's blocking pool.
    pub async fn build_async(self, binary_paths: Vec<String>) -> Result<DependencyReport, ListerError> {
        tokio::task::spawn_blocking(move || self.build(&binary_paths))
            .await
            .map_err(|e| ListerError::TaskFailed {
                reason: e.to_string(),
            })
    }

    fn seed<S: AsRef<str>>(&self, binary_paths: &[S], state: &mut TraversalState) -> Vec<Node> {
        let mut frontier = Vec::new();
        for input in binary_paths {
            let input = input.as_ref();
            match self.normalization.key(Path::new(input)) {
                Ok((key, path)) => {
                    if state.visit(&key) {
                        let executable_dir = path
                            .parent()
                            .map(Path::to_path_buf)
                            .unwrap_or_default();
                        frontier.push(Node {
                            key,
                            path,
                            error_key: input.to_string(),
                            executable_dir,
                            is_input: true,
                        });
                    } else {
                        debug!("Skipping duplicate input {}", input);
                    }
                }
                Err(e) => {
                    let error = ParseError::from(e);
                    warn!("Failed to analyze binary {}: {}", input, error);
                    state.aggregator.record_error(input, &error);
                }
            }
        }
        frontier
    }

    fn expand_parallel(&self, frontier: &[Node]) -> Vec<Expansion> {
        frontier.par_iter().map(|node| self.expand(node)).collect()
    }

    fn expand_sequential(&self, frontier: &[Node]) -> Vec<Expansion> {
        frontier.iter().map(|node| self.expand(node)).collect()
    }

    /// Parses one binary and resolves everything it declares. Touches no
    /// shared state, so frontier nodes can be expanded concurrently.
    fn expand(&self, node: &Node) -> Expansion {
        let parsed = match binary::parse_file(&node.path, &node.origin()) {
            Ok(parsed) => parsed,
            Err(e) => return Expansion::Failed(e),
        };
        let case_insensitive = parsed.format.case_insensitive_names();

        let edges = parsed
            .dependencies
            .iter()
            .map(|token| {
                let target = match self
                    .resolver
                    .resolve(token, &parsed.search_dirs, case_insensitive)
                {
                    Resolution::Resolved(path) => match self.normalization.key(&path) {
                        Ok(target) => Some(target),
                        Err(e) => {
                            warn!(
                                "Resolved {} to {} but could not normalize it: {}",
                                token.raw,
                                path.display(),
                                e
                            );
                            None
                        }
                    },
                    Resolution::Unresolved => None,
                };
                Edge {
                    token: token.raw.clone(),
                    target,
                }
            })
            .collect();
        Expansion::Expanded(edges)
    }

    /// Folds one level's expansions into the accumulators in queue order and
    /// returns the next level.
    fn merge(
        &self,
        frontier: Vec<Node>,
        expansions: Vec<Expansion>,
        state: &mut TraversalState,
    ) -> Vec<Node> {
        let mut next = Vec::new();
        for (node, expansion) in frontier.into_iter().zip(expansions) {
            match expansion {
                Expansion::Failed(error) => {
                    warn!("Failed to analyze binary {}: {}", node.error_key, error);
                    state.aggregator.record_error(&node.error_key, &error);
                }
                Expansion::Expanded(edges) => {
                    for edge in edges {
                        match edge.target {
                            Some((key, path)) => {
                                state.aggregator.mark_resolved(&key);
                                state.aggregator.add_edge(&key, &node.key);
                                if state.visit(&key) {
                                    next.push(Node {
                                        error_key: key.clone(),
                                        key,
                                        path,
                                        executable_dir: node.executable_dir.clone(),
                                        is_input: false,
                                    });
                                }
                            }
                            None => {
                                state.aggregator.add_edge(&edge.token, &node.key);
                            }
                        }
                    }
                }
            }
        }
        next
    }
}
