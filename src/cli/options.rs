use crate::config::ListerConfig;
use crate::resolve::BuildTarget;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Main dependency-lister CLI interface
#[derive(Debug, Parser)]
#[command(name = "dependency-lister")]
#[command(about = "List the shared libraries a set of binaries transitively depends on")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ListerCli {
    /// Executables or libraries to analyze (ELF, Mach-O or PE)
    #[arg(required = true)]
    pub binaries: Vec<String>,

    /// Directory to search for libraries; repeat in priority order
    #[arg(short = 'L', long = "search-path")]
    pub search_paths: Vec<PathBuf>,

    /// Configuration file (.json, .yaml or .yml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Install prefix; <prefix>/<triple>/lib and /bin are searched per target
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// Restrict prefix-derived search paths to these targets
    #[arg(long = "target", value_enum)]
    pub targets: Vec<BuildTarget>,

    /// Parse each traversal level in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for --parallel (defaults to the CPU count)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Keep symlinked spellings instead of canonicalizing through them
    #[arg(long)]
    pub no_follow_symlinks: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Print the files a package would need instead of the graph
    #[arg(long)]
    pub bundle: bool,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl ListerCli {
    /// Layers command-line flags over a base configuration. Search paths given
    /// on the command line take priority over those from the file.
    pub fn apply_to(&self, mut config: ListerConfig) -> ListerConfig {
        if !self.search_paths.is_empty() {
            let mut paths = self.search_paths.clone();
            paths.append(&mut config.search_paths);
            config.search_paths = paths;
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = Some(prefix.clone());
        }
        if !self.targets.is_empty() {
            config.targets = self.targets.clone();
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.no_follow_symlinks {
            config.follow_symlinks = false;
        }
        config
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::WARN
        } else {
            match self.verbosity {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}
