//! ELF dynamic section parsing.

use super::error::ParseError;
use super::tokens::{expand_elf_origin, search_dir, LoadOrigin};
use super::{BinaryFormat, DependencyToken, ParsedBinary};
use object::elf::{
    FileHeader32, FileHeader64, DT_NEEDED, DT_NULL, DT_RPATH, DT_RUNPATH, DT_STRSZ, DT_STRTAB,
    PT_DYNAMIC, PT_LOAD,
};
use object::read::elf::{Dyn, FileHeader, ProgramHeader, SectionHeader};
use object::read::StringTable;
use object::{Endianness, FileKind};
use std::path::PathBuf;

const FORMAT: &str = "ELF";

fn corrupt(err: object::Error) -> ParseError {
    ParseError::corrupt(FORMAT, err.to_string())
}

/// Raw dynamic entries of interest, as string-table offsets.
#[derive(Debug, Default)]
struct DynamicInfo {
    needed: Vec<u64>,
    rpath: Vec<u64>,
    runpath: Vec<u64>,
    strtab_addr: Option<u64>,
    strsz: Option<u64>,
}

impl DynamicInfo {
    fn collect<Elf: FileHeader>(entries: &[Elf::Dyn], endian: Elf::Endian) -> Self {
        let mut info = DynamicInfo::default();
        for entry in entries {
            let value: u64 = entry.d_val(endian).into();
            match entry.tag32(endian) {
                Some(DT_NULL) => break,
                Some(DT_NEEDED) => info.needed.push(value),
                Some(DT_STRTAB) => info.strtab_addr = Some(value),
                Some(DT_STRSZ) => info.strsz = Some(value),
                Some(DT_RPATH) => info.rpath.push(value),
                Some(DT_RUNPATH) => info.runpath.push(value),
                _ => {}
            }
        }
        info
    }

    fn references_strings(&self) -> bool {
        !(self.needed.is_empty() && self.rpath.is_empty() && self.runpath.is_empty())
    }
}

pub fn parse(data: &[u8], origin: &LoadOrigin) -> Result<ParsedBinary, ParseError> {
    match FileKind::parse(data).map_err(corrupt)? {
        FileKind::Elf32 => parse_image::<FileHeader32<Endianness>>(data, origin),
        FileKind::Elf64 => parse_image::<FileHeader64<Endianness>>(data, origin),
        other => Err(ParseError::corrupt(
            FORMAT,
            format!("ELF magic but file kind {other:?}"),
        )),
    }
}

fn parse_image<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
    origin: &LoadOrigin,
) -> Result<ParsedBinary, ParseError> {
    let header = Elf::parse(data).map_err(corrupt)?;
    let endian = header.endian().map_err(corrupt)?;
    let segments = header.program_headers(endian, data).map_err(corrupt)?;

    let mut dynamic = None;
    for segment in segments.iter().filter(|ph| ph.p_type(endian) == PT_DYNAMIC) {
        if let Some(entries) = segment.dynamic(endian, data).map_err(corrupt)? {
            dynamic = Some(DynamicInfo::collect::<Elf>(entries, endian));
            break;
        }
    }

    let (info, strings) = match dynamic {
        Some(info) => {
            let strings = if info.references_strings() {
                Some(strtab_from_segments::<Elf>(&info, segments, endian, data)?)
            } else {
                None
            };
            (info, strings)
        }
        None => match dynamic_from_sections::<Elf>(header, endian, data)? {
            Some((info, strings)) => (info, Some(strings)),
            // Statically linked: nothing to load.
            None => return Ok(ParsedBinary::new(BinaryFormat::Elf)),
        },
    };

    let mut parsed = ParsedBinary::new(BinaryFormat::Elf);
    let Some(strings) = strings else {
        return Ok(parsed);
    };
    let string_at = |offset: u64, what: &str| -> Result<String, ParseError> {
        u32::try_from(offset)
            .ok()
            .and_then(|offset| strings.get(offset).ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .ok_or_else(|| {
                ParseError::corrupt(
                    FORMAT,
                    format!("{what} at string table offset {offset:#x} is out of bounds"),
                )
            })
    };

    for offset in &info.needed {
        let name = string_at(*offset, "DT_NEEDED name")?;
        let token = match expand_elf_origin(&name, origin) {
            Some(expanded) => DependencyToken::anchored(name, PathBuf::from(expanded)),
            None => DependencyToken::new(name),
        };
        parsed.push_dependency(token);
    }

    // The dynamic linker ignores DT_RPATH once DT_RUNPATH is present.
    let search_offsets = if info.runpath.is_empty() {
        &info.rpath
    } else {
        &info.runpath
    };
    for offset in search_offsets {
        let list = string_at(*offset, "search path")?;
        for entry in list.split(':').filter(|e| !e.is_empty()) {
            let expanded = expand_elf_origin(entry, origin).unwrap_or_else(|| entry.to_string());
            parsed.search_dirs.push(search_dir(&expanded));
        }
    }

    Ok(parsed)
}

/// Locates the dynamic string table by mapping `DT_STRTAB` through the
/// loadable segments.
fn strtab_from_segments<'data, Elf: FileHeader<Endian = Endianness>>(
    info: &DynamicInfo,
    segments: &[Elf::ProgramHeader],
    endian: Endianness,
    data: &'data [u8],
) -> Result<StringTable<'data>, ParseError> {
    let addr = info
        .strtab_addr
        .ok_or_else(|| ParseError::corrupt(FORMAT, "dynamic table has no DT_STRTAB entry"))?;
    let size = info
        .strsz
        .ok_or_else(|| ParseError::corrupt(FORMAT, "dynamic table has no DT_STRSZ entry"))?;

    segments
        .iter()
        .filter(|ph| ph.p_type(endian) == PT_LOAD)
        .find_map(|ph| ph.data_range(endian, data, addr, size).ok().flatten())
        .map(|bytes| StringTable::new(bytes, 0, bytes.len() as u64))
        .ok_or_else(|| {
            ParseError::corrupt(
                FORMAT,
                format!(
                    "DT_STRTAB {addr:#x} (size {size}) is not covered by any loadable segment"
                ),
            )
        })
}

/// Fallback for images without a `PT_DYNAMIC` segment: the `SHT_DYNAMIC`
/// section and the string table section it links to.
fn dynamic_from_sections<'data, Elf: FileHeader<Endian = Endianness>>(
    header: &Elf,
    endian: Endianness,
    data: &'data [u8],
) -> Result<Option<(DynamicInfo, StringTable<'data>)>, ParseError> {
    let sections = header.sections(endian, data).map_err(corrupt)?;
    for section in sections.iter() {
        if let Some((entries, link)) = section.dynamic(endian, data).map_err(corrupt)? {
            let info = DynamicInfo::collect::<Elf>(entries, endian);
            let strings = sections.strings(endian, data, link).map_err(corrupt)?;
            return Ok(Some((info, strings)));
        }
    }
    Ok(None)
}
