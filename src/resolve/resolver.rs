use crate::binary::DependencyToken;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PathBuf),
    Unresolved,
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolved => None,
        }
    }
}

/// Maps dependency names onto files using dynamic-linker search order:
/// the binary's own embedded directories first, then the caller's search
/// paths, first match wins.
///
/// Matching is an existence test only. Returned paths are the candidate
/// directory joined with the file name; callers normalize them.
#[derive(Debug, Clone, Default)]
pub struct SearchPathResolver {
    search_paths: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Candidate directories for a binary, in the order they are tried.
    pub fn candidate_dirs<'a>(
        &'a self,
        embedded: &'a [PathBuf],
    ) -> impl Iterator<Item = &'a Path> + 'a {
        embedded
            .iter()
            .chain(self.search_paths.iter())
            .map(PathBuf::as_path)
    }

    pub fn resolve(
        &self,
        token: &DependencyToken,
        embedded: &[PathBuf],
        case_insensitive: bool,
    ) -> Resolution {
        if let Some(anchored) = &token.anchored {
            if anchored.is_file() {
                debug!("Resolved {} at anchored path {}", token.raw, anchored.display());
                return Resolution::Resolved(anchored.clone());
            }
        }

        let name = token.base_name();
        if name.is_empty() || name == "." || name == ".." {
            return Resolution::Unresolved;
        }

        for dir in self.candidate_dirs(embedded) {
            if let Some(found) = find_in_directory(dir, name, case_insensitive) {
                debug!("Resolved {} to {}", token.raw, found.display());
                return Resolution::Resolved(found);
            }
            trace!("{} not found in {}", name, dir.display());
        }

        debug!("Unable to resolve {}", token.raw);
        Resolution::Unresolved
    }
}

/// Looks for `name` directly inside `dir`. With `case_insensitive`, a file
/// whose name differs only in ASCII case also matches; the lexicographically
/// smallest such name wins.
pub fn find_in_directory(dir: &Path, name: &str, case_insensitive: bool) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    if !case_insensitive {
        return None;
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|file| file.eq_ignore_ascii_case(name))
                .unwrap_or(false)
                && entry.path().is_file()
        })
        .map(|entry| entry.into_path())
}
