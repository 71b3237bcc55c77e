use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Build targets an install prefix is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Linux,
    Windows,
    Wasm,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 3] = [BuildTarget::Linux, BuildTarget::Windows, BuildTarget::Wasm];

    pub fn triple(&self) -> &'static str {
        match self {
            BuildTarget::Linux => "x86_64-linux-gnu",
            BuildTarget::Windows => "x86_64-w64-mingw32",
            BuildTarget::Wasm => "wasm32-unknown-emscripten",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTarget::Linux => write!(f, "linux"),
            BuildTarget::Windows => write!(f, "windows"),
            BuildTarget::Wasm => write!(f, "wasm"),
        }
    }
}

/// Search paths for libraries installed under `prefix`: `lib` then `bin` for
/// every target (Windows DLLs are installed into `bin`).
pub fn search_paths_for_prefix(prefix: &Path, targets: &[BuildTarget]) -> Vec<PathBuf> {
    targets
        .iter()
        .flat_map(|target| {
            let root = prefix.join(target.triple());
            [root.join("lib"), root.join("bin")]
        })
        .collect()
}
