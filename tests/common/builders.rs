//! Builders for minimal ELF, Mach-O and PE images
//!
//! The images carry only the structures the dependency parsers read: headers,
//! the dynamic table or load commands, and the import directory.

/// Growable byte buffer with endian-aware writers.
struct Image {
    data: Vec<u8>,
    big_endian: bool,
}

impl Image {
    fn new(size: usize, big_endian: bool) -> Self {
        Self {
            data: vec![0; size],
            big_endian,
        }
    }

    fn put_bytes(&mut self, at: usize, bytes: &[u8]) {
        if self.data.len() < at + bytes.len() {
            self.data.resize(at + bytes.len(), 0);
        }
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn put_u16(&mut self, at: usize, value: u16) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.put_bytes(at, &bytes);
    }

    fn put_u32(&mut self, at: usize, value: u32) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.put_bytes(at, &bytes);
    }

    fn put_u64(&mut self, at: usize, value: u64) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.put_bytes(at, &bytes);
    }

    fn put_word(&mut self, at: usize, value: u64, is_64: bool) {
        if is_64 {
            self.put_u64(at, value);
        } else {
            self.put_u32(at, value as u32);
        }
    }
}

fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

/// NUL-terminated string table, offset 0 holding the empty string.
struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        Self { bytes: vec![0] }
    }

    fn add(&mut self, text: &str) -> u64 {
        let offset = self.bytes.len() as u64;
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        offset
    }
}

/// Where the dynamic table is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfLinkage {
    /// `PT_DYNAMIC` plus a `PT_LOAD` segment covering the file.
    Segments,
    /// Only `SHT_DYNAMIC` and its linked string table section.
    SectionsOnly,
    /// No dynamic table at all.
    Static,
}

const ELF_LOAD_BASE: u64 = 0x40_0000;
const DT_NEEDED: u64 = 1;
const DT_STRTAB: u64 = 5;
const DT_STRSZ: u64 = 10;
const DT_RPATH: u64 = 15;
const DT_RUNPATH: u64 = 29;

#[derive(Debug, Clone)]
pub struct ElfBuilder {
    is_64: bool,
    big_endian: bool,
    linkage: ElfLinkage,
    needed: Vec<String>,
    rpath: Option<String>,
    runpath: Option<String>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    /// 64-bit little-endian shared object with a program-header dynamic table.
    pub fn new() -> Self {
        Self {
            is_64: true,
            big_endian: false,
            linkage: ElfLinkage::Segments,
            needed: Vec::new(),
            rpath: None,
            runpath: None,
        }
    }

    pub fn class32(mut self) -> Self {
        self.is_64 = false;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn linkage(mut self, linkage: ElfLinkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn needed(mut self, name: &str) -> Self {
        self.needed.push(name.to_string());
        self
    }

    pub fn rpath(mut self, path: &str) -> Self {
        self.rpath = Some(path.to_string());
        self
    }

    pub fn runpath(mut self, path: &str) -> Self {
        self.runpath = Some(path.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let is_64 = self.is_64;
        let (ehsize, phentsize, shentsize, dynent) = if is_64 {
            (64usize, 56usize, 64usize, 16usize)
        } else {
            (52, 32, 40, 8)
        };

        let mut strings = StringTable::new();
        let mut entries: Vec<(u64, u64)> = Vec::new();
        for name in &self.needed {
            entries.push((DT_NEEDED, strings.add(name)));
        }
        if let Some(rpath) = &self.rpath {
            entries.push((DT_RPATH, strings.add(rpath)));
        }
        if let Some(runpath) = &self.runpath {
            entries.push((DT_RUNPATH, strings.add(runpath)));
        }

        let phnum = match self.linkage {
            ElfLinkage::Segments => 2,
            ElfLinkage::Static => 1,
            ElfLinkage::SectionsOnly => 0,
        };
        let strtab_off = ehsize + phnum * phentsize;
        let dyn_off = align(strtab_off + strings.bytes.len(), 8);
        entries.push((DT_STRTAB, ELF_LOAD_BASE + strtab_off as u64));
        entries.push((DT_STRSZ, strings.bytes.len() as u64));
        entries.push((0, 0));
        let dyn_len = entries.len() * dynent;
        let sh_off = align(dyn_off + dyn_len, 8);
        let shnum = if self.linkage == ElfLinkage::SectionsOnly { 3 } else { 0 };
        let total = sh_off + shnum * shentsize;

        let mut image = Image::new(total, self.big_endian);
        image.put_bytes(0, b"\x7fELF");
        image.put_bytes(4, &[if is_64 { 2 } else { 1 }, if self.big_endian { 2 } else { 1 }, 1]);
        image.put_u16(16, 3); // ET_DYN
        image.put_u16(18, if is_64 { 62 } else { 3 });
        image.put_u32(20, 1);
        let (phoff_at, shoff_at, ehsize_at) = if is_64 { (32, 40, 52) } else { (28, 32, 40) };
        image.put_word(phoff_at, if phnum > 0 { ehsize as u64 } else { 0 }, is_64);
        image.put_word(shoff_at, if shnum > 0 { sh_off as u64 } else { 0 }, is_64);
        image.put_u16(ehsize_at, ehsize as u16);
        image.put_u16(ehsize_at + 2, phentsize as u16);
        image.put_u16(ehsize_at + 4, phnum as u16);
        image.put_u16(ehsize_at + 6, shentsize as u16);
        image.put_u16(ehsize_at + 8, shnum as u16);

        let mut segments = vec![(1u32, 0u64, ELF_LOAD_BASE, total as u64)];
        if self.linkage == ElfLinkage::Segments {
            segments.push((2, dyn_off as u64, ELF_LOAD_BASE + dyn_off as u64, dyn_len as u64));
        }
        for (index, (p_type, offset, vaddr, size)) in segments.into_iter().take(phnum).enumerate() {
            let at = ehsize + index * phentsize;
            image.put_u32(at, p_type);
            if is_64 {
                image.put_u32(at + 4, 4);
                image.put_u64(at + 8, offset);
                image.put_u64(at + 16, vaddr);
                image.put_u64(at + 24, vaddr);
                image.put_u64(at + 32, size);
                image.put_u64(at + 40, size);
                image.put_u64(at + 48, 8);
            } else {
                image.put_u32(at + 4, offset as u32);
                image.put_u32(at + 8, vaddr as u32);
                image.put_u32(at + 12, vaddr as u32);
                image.put_u32(at + 16, size as u32);
                image.put_u32(at + 20, size as u32);
                image.put_u32(at + 24, 4);
                image.put_u32(at + 28, 8);
            }
        }

        image.put_bytes(strtab_off, &strings.bytes);
        for (index, (tag, value)) in entries.iter().enumerate() {
            let at = dyn_off + index * dynent;
            image.put_word(at, *tag, is_64);
            image.put_word(at + dynent / 2, *value, is_64);
        }

        if shnum > 0 {
            // [0] null, [1] .dynamic linked to [2] .dynstr
            let sections = [
                (6u32, dyn_off as u64, dyn_len as u64, 2u32),
                (3, strtab_off as u64, strings.bytes.len() as u64, 0),
            ];
            for (index, (sh_type, offset, size, link)) in sections.into_iter().enumerate() {
                let at = sh_off + (index + 1) * shentsize;
                image.put_u32(at + 4, sh_type);
                if is_64 {
                    image.put_u64(at + 24, offset);
                    image.put_u64(at + 32, size);
                    image.put_u32(at + 40, link);
                } else {
                    image.put_u32(at + 16, offset as u32);
                    image.put_u32(at + 20, size as u32);
                    image.put_u32(at + 24, link);
                }
            }
        }

        image.data
    }
}

pub const LC_LOAD_DYLIB: u32 = 0xc;
pub const LC_ID_DYLIB: u32 = 0xd;
pub const LC_LOAD_WEAK_DYLIB: u32 = 0x8000_0018;
pub const LC_RPATH: u32 = 0x8000_001c;
pub const LC_REEXPORT_DYLIB: u32 = 0x8000_001f;
pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
pub const LC_LOAD_UPWARD_DYLIB: u32 = 0x8000_0023;
const LC_UUID: u32 = 0x1b;

#[derive(Debug, Clone)]
enum LoadCommand {
    Dylib { cmd: u32, name: String },
    Rpath(String),
    Uuid,
}

#[derive(Debug, Clone)]
pub struct MachOBuilder {
    is_64: bool,
    big_endian: bool,
    commands: Vec<LoadCommand>,
}

impl Default for MachOBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MachOBuilder {
    /// 64-bit little-endian thin image.
    pub fn new() -> Self {
        Self {
            is_64: true,
            big_endian: false,
            commands: vec![LoadCommand::Uuid],
        }
    }

    pub fn class32(mut self) -> Self {
        self.is_64 = false;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn dylib(self, name: &str) -> Self {
        self.dylib_command(LC_LOAD_DYLIB, name)
    }

    pub fn dylib_command(mut self, cmd: u32, name: &str) -> Self {
        self.commands.push(LoadCommand::Dylib {
            cmd,
            name: name.to_string(),
        });
        self
    }

    pub fn rpath(mut self, path: &str) -> Self {
        self.commands.push(LoadCommand::Rpath(path.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let header_size = if self.is_64 { 32 } else { 28 };
        let command_align = if self.is_64 { 8 } else { 4 };

        let mut commands = Image::new(0, self.big_endian);
        let mut offset = 0usize;
        for command in &self.commands {
            let (cmd, string_offset, text) = match command {
                LoadCommand::Dylib { cmd, name } => (*cmd, 24usize, Some(name.as_str())),
                LoadCommand::Rpath(path) => (LC_RPATH, 12, Some(path.as_str())),
                LoadCommand::Uuid => (LC_UUID, 24, None),
            };
            let cmdsize = match text {
                Some(text) => align(string_offset + text.len() + 1, command_align),
                None => 24,
            };
            commands.put_bytes(offset, &vec![0; cmdsize]);
            commands.put_u32(offset, cmd);
            commands.put_u32(offset + 4, cmdsize as u32);
            if let Some(text) = text {
                commands.put_u32(offset + 8, string_offset as u32);
                if string_offset == 24 {
                    commands.put_u32(offset + 16, 0x1_0000);
                    commands.put_u32(offset + 20, 0x1_0000);
                }
                commands.put_bytes(offset + string_offset, text.as_bytes());
            }
            offset += cmdsize;
        }

        let mut image = Image::new(header_size, self.big_endian);
        image.put_u32(0, if self.is_64 { 0xfeed_facf } else { 0xfeed_face });
        image.put_u32(4, if self.is_64 { 0x0100_0007 } else { 7 });
        image.put_u32(8, 3);
        image.put_u32(12, 6); // MH_DYLIB
        image.put_u32(16, self.commands.len() as u32);
        image.put_u32(20, commands.data.len() as u32);
        image.put_bytes(header_size, &commands.data);
        image.data
    }

    /// Wraps thin images in a universal container, slices in the given order.
    pub fn fat(slices: &[Vec<u8>], fat64: bool) -> Vec<u8> {
        let entry_size = if fat64 { 32 } else { 20 };
        let mut image = Image::new(8 + slices.len() * entry_size, true);
        image.put_u32(0, if fat64 { 0xcafe_babf } else { 0xcafe_babe });
        image.put_u32(4, slices.len() as u32);

        let mut offset = align(image.data.len(), 64);
        for (index, slice) in slices.iter().enumerate() {
            let at = 8 + index * entry_size;
            image.put_u32(at, 0x0100_0007 + index as u32);
            image.put_u32(at + 4, 3);
            if fat64 {
                image.put_u64(at + 8, offset as u64);
                image.put_u64(at + 16, slice.len() as u64);
                image.put_u32(at + 24, 6);
            } else {
                image.put_u32(at + 8, offset as u32);
                image.put_u32(at + 12, slice.len() as u32);
                image.put_u32(at + 16, 6);
            }
            image.put_bytes(offset, slice);
            offset = align(offset + slice.len(), 64);
        }
        image.data
    }
}

const PE_HEADER_OFFSET: usize = 0x80;
const IDATA_FILE_OFFSET: usize = 0x200;
const IDATA_RVA: u32 = 0x2000;

#[derive(Debug, Clone)]
pub struct PeBuilder {
    pe32_plus: bool,
    imports: Vec<String>,
}

impl Default for PeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PeBuilder {
    /// PE32+ image with one `.idata` section.
    pub fn new() -> Self {
        Self {
            pe32_plus: true,
            imports: Vec::new(),
        }
    }

    pub fn pe32(mut self) -> Self {
        self.pe32_plus = false;
        self
    }

    pub fn import(mut self, name: &str) -> Self {
        self.imports.push(name.to_string());
        self
    }

    /// An `MZ` stub whose `e_lfanew` points at zeros rather than `PE\0\0`.
    pub fn dos_only() -> Vec<u8> {
        let mut image = Image::new(0x100, false);
        image.put_bytes(0, b"MZ");
        image.put_u32(0x3c, PE_HEADER_OFFSET as u32);
        image.data
    }

    pub fn build(&self) -> Vec<u8> {
        let descriptors_len = (self.imports.len() + 1) * 20;
        let mut idata = Image::new(descriptors_len, false);
        let mut name_offset = descriptors_len;
        for (index, name) in self.imports.iter().enumerate() {
            let at = index * 20;
            idata.put_u32(at + 12, IDATA_RVA + name_offset as u32);
            // Thunk arrays are not read; any non-zero RVA will do.
            idata.put_u32(at + 16, IDATA_RVA);
            idata.put_bytes(name_offset, name.as_bytes());
            idata.put_bytes(name_offset + name.len(), &[0]);
            name_offset += name.len() + 1;
        }
        let raw_size = align(idata.data.len(), 16);
        idata.data.resize(raw_size, 0);

        let (optional_size, count_at, directories_at, magic) = if self.pe32_plus {
            (240usize, 108usize, 112usize, 0x20bu16)
        } else {
            (224, 92, 96, 0x10b)
        };

        let mut image = Image::new(IDATA_FILE_OFFSET + raw_size, false);
        image.put_bytes(0, b"MZ");
        image.put_u32(0x3c, PE_HEADER_OFFSET as u32);
        image.put_bytes(PE_HEADER_OFFSET, b"PE\0\0");

        let coff = PE_HEADER_OFFSET + 4;
        image.put_u16(coff, if self.pe32_plus { 0x8664 } else { 0x14c });
        image.put_u16(coff + 2, 1);
        image.put_u16(coff + 16, optional_size as u16);
        image.put_u16(coff + 18, 0x2022);

        let optional = coff + 20;
        image.put_u16(optional, magic);
        image.put_u32(optional + count_at, 16);
        image.put_u32(optional + directories_at + 8, IDATA_RVA);
        image.put_u32(optional + directories_at + 12, descriptors_len as u32);

        let section = optional + optional_size;
        image.put_bytes(section, b".idata\0\0");
        image.put_u32(section + 8, raw_size as u32);
        image.put_u32(section + 12, IDATA_RVA);
        image.put_u32(section + 16, raw_size as u32);
        image.put_u32(section + 20, IDATA_FILE_OFFSET as u32);

        image.put_bytes(IDATA_FILE_OFFSET, &idata.data);
        image.data
    }
}
