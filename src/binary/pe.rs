//! PE/COFF import directory parsing.

use super::error::ParseError;
use super::{BinaryFormat, DependencyToken, ParsedBinary};
use object::pe::{ImageDosHeader, ImageNtHeaders32, ImageNtHeaders64};
use object::read::pe::{ImageNtHeaders, PeFile};
use object::{FileKind, LittleEndian};

const FORMAT: &str = "PE";
const PE_SIGNATURE: &[u8] = b"PE\0\0";

fn corrupt(err: object::Error) -> ParseError {
    ParseError::corrupt(FORMAT, err.to_string())
}

pub fn parse(data: &[u8]) -> Result<ParsedBinary, ParseError> {
    let dos = ImageDosHeader::parse(data).map_err(corrupt)?;
    let nt_offset = dos.nt_headers_offset() as usize;
    let signature = nt_offset
        .checked_add(PE_SIGNATURE.len())
        .and_then(|end| data.get(nt_offset..end));
    if signature != Some(PE_SIGNATURE) {
        // A plain DOS executable.
        return Err(ParseError::UnsupportedFormat {
            magic: "4d 5a (MZ without PE signature)".to_string(),
        });
    }

    match FileKind::parse(data).map_err(corrupt)? {
        FileKind::Pe32 => parse_imports::<ImageNtHeaders32>(data),
        FileKind::Pe64 => parse_imports::<ImageNtHeaders64>(data),
        other => Err(ParseError::corrupt(
            FORMAT,
            format!("PE signature but file kind {other:?}"),
        )),
    }
}

fn parse_imports<Pe: ImageNtHeaders>(data: &[u8]) -> Result<ParsedBinary, ParseError> {
    let file = PeFile::<Pe>::parse(data).map_err(corrupt)?;
    let mut parsed = ParsedBinary::new(BinaryFormat::Pe);
    let Some(imports) = file.import_table().map_err(corrupt)? else {
        return Ok(parsed);
    };

    let mut descriptors = imports.descriptors().map_err(corrupt)?;
    while let Some(descriptor) = descriptors.next().map_err(corrupt)? {
        let name = imports
            .name(descriptor.name.get(LittleEndian))
            .map_err(corrupt)?;
        parsed.push_dependency(DependencyToken::new(String::from_utf8_lossy(name)));
    }
    Ok(parsed)
}
