//! Mach-O load command parsing, including universal (fat) containers.

use super::error::ParseError;
use super::tokens::{expand_macho_origin, search_dir, LoadOrigin};
use super::{BinaryFormat, DependencyToken, ParsedBinary};
use object::macho::{
    DylibCommand, MachHeader32, MachHeader64, RpathCommand, FAT_MAGIC, LC_LAZY_LOAD_DYLIB,
    LC_LOAD_DYLIB, LC_LOAD_UPWARD_DYLIB, LC_LOAD_WEAK_DYLIB, LC_REEXPORT_DYLIB, LC_RPATH,
};
use object::read::macho::{FatArch, MachHeader, MachOFatFile32, MachOFatFile64};
use object::{Endianness, FileKind};
use std::path::PathBuf;
use tracing::debug;

const FORMAT: &str = "Mach-O";

/// Java class files share `FAT_MAGIC`; their version field reads as a large
/// architecture count.
const MAX_FAT_ARCHS: u32 = 32;

fn corrupt(err: object::Error) -> ParseError {
    ParseError::corrupt(FORMAT, err.to_string())
}

pub fn parse(data: &[u8], origin: &LoadOrigin) -> Result<ParsedBinary, ParseError> {
    if let Some(nfat_arch) = fat_arch_count(data) {
        if nfat_arch > MAX_FAT_ARCHS {
            // Most likely a Java class file.
            return Err(ParseError::UnsupportedFormat {
                magic: "ca fe ba be".to_string(),
            });
        }
    }

    match FileKind::parse(data).map_err(corrupt)? {
        FileKind::MachOFat32 => {
            let fat = MachOFatFile32::parse(data).map_err(corrupt)?;
            parse_thin(first_slice(fat.arches(), data)?, origin)
        }
        FileKind::MachOFat64 => {
            let fat = MachOFatFile64::parse(data).map_err(corrupt)?;
            parse_thin(first_slice(fat.arches(), data)?, origin)
        }
        _ => parse_thin(data, origin),
    }
}

/// Architecture count of a 32-bit universal header, if `data` starts with one.
fn fat_arch_count(data: &[u8]) -> Option<u32> {
    let magic = u32::from_be_bytes(data.get(0..4)?.try_into().ok()?);
    if magic != FAT_MAGIC {
        return None;
    }
    Some(u32::from_be_bytes(data.get(4..8)?.try_into().ok()?))
}

/// Universal binaries are reduced to their first architecture slice so that
/// the result does not depend on the host.
fn first_slice<'data, Fat: FatArch>(
    arches: &'data [Fat],
    data: &'data [u8],
) -> Result<&'data [u8], ParseError> {
    let first = arches.first().ok_or_else(|| {
        ParseError::corrupt(FORMAT, "universal binary contains no architectures")
    })?;
    debug!(
        "Universal binary with {} architectures, using the first ({:?})",
        arches.len(),
        first.architecture()
    );
    first.data(data).map_err(corrupt)
}

fn parse_thin(data: &[u8], origin: &LoadOrigin) -> Result<ParsedBinary, ParseError> {
    match FileKind::parse(data).map_err(corrupt)? {
        FileKind::MachO32 => parse_commands::<MachHeader32<Endianness>>(data, origin),
        FileKind::MachO64 => parse_commands::<MachHeader64<Endianness>>(data, origin),
        other => Err(ParseError::corrupt(
            FORMAT,
            format!("architecture slice is {other:?}, expected a Mach-O image"),
        )),
    }
}

fn parse_commands<Mach: MachHeader<Endian = Endianness>>(
    data: &[u8],
    origin: &LoadOrigin,
) -> Result<ParsedBinary, ParseError> {
    let header = Mach::parse(data, 0).map_err(corrupt)?;
    let endian = header.endian().map_err(corrupt)?;
    let mut commands = header.load_commands(endian, data, 0).map_err(corrupt)?;

    let mut parsed = ParsedBinary::new(BinaryFormat::MachO);
    while let Some(command) = commands.next().map_err(corrupt)? {
        match command.cmd() {
            LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB | LC_LAZY_LOAD_DYLIB
            | LC_LOAD_UPWARD_DYLIB => {
                let dylib = command
                    .data::<DylibCommand<Endianness>>()
                    .map_err(corrupt)?;
                let raw = command.string(endian, dylib.dylib.name).map_err(corrupt)?;
                let name = String::from_utf8_lossy(raw).into_owned();
                let token = match expand_macho_origin(&name, origin) {
                    Some(expanded) => DependencyToken::anchored(name, PathBuf::from(expanded)),
                    None => DependencyToken::new(name),
                };
                parsed.push_dependency(token);
            }
            LC_RPATH => {
                let rpath = command
                    .data::<RpathCommand<Endianness>>()
                    .map_err(corrupt)?;
                let raw = command.string(endian, rpath.path).map_err(corrupt)?;
                let path = String::from_utf8_lossy(raw).into_owned();
                let expanded = expand_macho_origin(&path, origin).unwrap_or(path);
                if !expanded.is_empty() {
                    parsed.search_dirs.push(search_dir(&expanded));
                }
            }
            _ => {}
        }
    }
    Ok(parsed)
}
