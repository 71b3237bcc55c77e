//! Binary format detection and dependency extraction.
//!
//! The supported formats form a closed set: the leading magic bytes select
//! one of the [`BinaryFormat`] variants and the matching parser extracts the
//! declared dependency names together with the binary's embedded search
//! directories.

pub mod elf;
pub mod error;
pub mod macho;
pub mod pe;
pub mod tokens;

pub use error::ParseError;
pub use tokens::LoadOrigin;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryFormat {
    Elf,
    MachO,
    Pe,
}

impl BinaryFormat {
    /// Identifies the format from the leading bytes of a file.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data {
            [0x7f, b'E', b'L', b'F', ..] => Some(BinaryFormat::Elf),
            [b'M', b'Z', ..] => Some(BinaryFormat::Pe),
            [0xce | 0xcf, 0xfa, 0xed, 0xfe, ..]
            | [0xfe, 0xed, 0xfa, 0xce | 0xcf, ..]
            | [0xca, 0xfe, 0xba, 0xbe | 0xbf, ..] => Some(BinaryFormat::MachO),
            _ => None,
        }
    }

    /// Windows resolves module names without regard to case.
    pub fn case_insensitive_names(&self) -> bool {
        matches!(self, BinaryFormat::Pe)
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryFormat::Elf => write!(f, "ELF"),
            BinaryFormat::MachO => write!(f, "Mach-O"),
            BinaryFormat::Pe => write!(f, "PE"),
        }
    }
}

/// A dependency as declared inside a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyToken {
    /// The text exactly as stored in the binary.
    pub raw: String,
    /// Concrete location when a relocation token anchored the name to a directory.
    pub anchored: Option<PathBuf>,
}

impl DependencyToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            anchored: None,
        }
    }

    pub fn anchored(raw: impl Into<String>, path: PathBuf) -> Self {
        Self {
            raw: raw.into(),
            anchored: Some(path),
        }
    }

    /// File name the resolver looks for in each candidate directory.
    pub fn base_name(&self) -> &str {
        self.raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.raw.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBinary {
    pub format: BinaryFormat,
    pub dependencies: Vec<DependencyToken>,
    /// Runtime search directories embedded in the binary, tokens already rewritten.
    pub search_dirs: Vec<PathBuf>,
}

impl ParsedBinary {
    pub fn new(format: BinaryFormat) -> Self {
        Self {
            format,
            dependencies: Vec::new(),
            search_dirs: Vec::new(),
        }
    }

    pub(crate) fn push_dependency(&mut self, token: DependencyToken) {
        if token.raw.is_empty() {
            debug!("Skipping empty {} dependency name", self.format);
            return;
        }
        self.dependencies.push(token);
    }
}

/// Reads and parses the binary at `path`.
///
/// The file is memory-mapped, so only the pages holding headers and the
/// tables they point at are ever read.
pub fn parse_file(path: &Path, origin: &LoadOrigin) -> Result<ParsedBinary, ParseError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(ParseError::unsupported(&[]));
    }
    // SAFETY: read-only mapping, dropped before returning.
    let map = unsafe { Mmap::map(&file) }?;
    let parsed = parse_bytes(&map, origin)?;
    debug!(
        "Parsed {} binary {}: {} dependencies, {} embedded search dirs",
        parsed.format,
        path.display(),
        parsed.dependencies.len(),
        parsed.search_dirs.len()
    );
    Ok(parsed)
}

/// Parses an in-memory image. `origin` supplies the directories relocation
/// tokens expand to.
pub fn parse_bytes(data: &[u8], origin: &LoadOrigin) -> Result<ParsedBinary, ParseError> {
    match BinaryFormat::detect(data) {
        Some(BinaryFormat::Elf) => elf::parse(data, origin),
        Some(BinaryFormat::MachO) => macho::parse(data, origin),
        Some(BinaryFormat::Pe) => pe::parse(data),
        None => Err(ParseError::unsupported(data)),
    }
}
