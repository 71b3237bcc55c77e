use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};

/// How two spellings of the same file are collapsed onto one graph key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathNormalization {
    /// `std::fs::canonicalize`: absolute, symlinks resolved. The file must exist.
    #[default]
    Canonical,
    /// Absolute with `.` and `..` folded; symlinks are kept as spelled.
    Lexical,
}

impl PathNormalization {
    pub fn normalize(&self, path: &Path) -> io::Result<PathBuf> {
        match self {
            PathNormalization::Canonical => std::fs::canonicalize(path),
            PathNormalization::Lexical => Ok(lexical_clean(&absolutize(path)?)),
        }
    }

    /// Normalized path rendered as a graph key.
    pub fn key(&self, path: &Path) -> io::Result<(String, PathBuf)> {
        let normalized = self.normalize(path)?;
        Ok((normalized.to_string_lossy().into_owned(), normalized))
    }
}

pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Folds `.` and `..` components without touching the file system.
/// `..` at the root stays at the root; leading `..` of a relative path is kept.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
