//! Relocation token rewriting (`$ORIGIN`, `@loader_path`, `@executable_path`).

use crate::graph::normalize::lexical_clean;
use std::path::{Path, PathBuf};

/// Directories the loader-relative tokens of one binary expand to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOrigin {
    /// Directory containing the binary being parsed.
    pub loader_dir: PathBuf,
    /// Directory of the top-level executable whose traversal reached the binary.
    pub executable_dir: PathBuf,
}

impl LoadOrigin {
    /// Origin of a top-level input: it is its own executable.
    pub fn for_executable(path: &Path) -> Self {
        let dir = parent_dir(path);
        Self {
            loader_dir: dir.clone(),
            executable_dir: dir,
        }
    }

    /// Origin of a library reached from an executable living in `executable_dir`.
    pub fn for_library(path: &Path, executable_dir: &Path) -> Self {
        Self {
            loader_dir: parent_dir(path),
            executable_dir: executable_dir.to_path_buf(),
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Expands `$ORIGIN` / `${ORIGIN}` in an ELF path expression.
/// Returns `None` when the text carries no origin token.
pub fn expand_elf_origin(text: &str, origin: &LoadOrigin) -> Option<String> {
    let dir = origin.loader_dir.to_string_lossy();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut expanded = false;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("${ORIGIN}") {
            out.push_str(&dir);
            rest = after;
            expanded = true;
        } else if let Some(after) = tail.strip_prefix("$ORIGIN") {
            let continues_identifier = after
                .chars()
                .next()
                .map(|c| c.is_ascii_alphanumeric() || c == '_')
                .unwrap_or(false);
            if continues_identifier {
                out.push('$');
                rest = &tail[1..];
            } else {
                out.push_str(&dir);
                rest = after;
                expanded = true;
            }
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    expanded.then_some(out)
}

/// Expands a leading `@loader_path` or `@executable_path` in a Mach-O path.
/// `@rpath` is left alone; the resolver handles it by base name.
pub fn expand_macho_origin(text: &str, origin: &LoadOrigin) -> Option<String> {
    let (dir, rest) = if let Some(rest) = strip_token(text, "@loader_path") {
        (&origin.loader_dir, rest)
    } else if let Some(rest) = strip_token(text, "@executable_path") {
        (&origin.executable_dir, rest)
    } else {
        return None;
    };
    let rest = rest.trim_start_matches('/');
    let joined = if rest.is_empty() {
        dir.clone()
    } else {
        dir.join(rest)
    };
    Some(joined.to_string_lossy().into_owned())
}

fn strip_token<'t>(text: &'t str, token: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(token)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// Turns an expanded directory expression into a tidy path.
pub fn search_dir(expanded: &str) -> PathBuf {
    lexical_clean(Path::new(expanded))
}
