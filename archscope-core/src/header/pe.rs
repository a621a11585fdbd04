use crate::header::{BinaryFormat, Header};
use crate::language::Endian;
use byteorder::{ReadBytesExt, LE};
use goblin::pe::header::{DOS_MAGIC, PE_MAGIC, PE_POINTER_OFFSET};
use goblin::pe::optional_header::MAGIC_64;
use std::io::{self, Seek, SeekFrom};

/// COFF file header fields of a PE image that identify its target.
#[derive(Debug, Clone, Copy)]
pub struct PeHeader {
    /// File offset of the `PE\0\0` signature (`e_lfanew`).
    pub pe_offset: u32,
    /// COFF `Machine`, e.g. `IMAGE_FILE_MACHINE_AMD64` (0x8664).
    pub machine: u16,
    pub number_of_sections: u16,
    pub characteristics: u16,
    /// Optional header magic, 0 when the image has no optional header.
    pub optional_magic: u16,
}

impl PeHeader {
    pub fn from_reader<R: io::Read + Seek>(cur: &mut R) -> io::Result<PeHeader> {
        if cur.read_u16::<LE>()? != DOS_MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "missing MZ signature"));
        }

        cur.seek(SeekFrom::Start(PE_POINTER_OFFSET as u64))?;
        let pe_offset = cur.read_u32::<LE>()?;
        cur.seek(SeekFrom::Start(pe_offset as u64))?;
        if cur.read_u32::<LE>()? != PE_MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "missing PE signature"));
        }

        let machine = cur.read_u16::<LE>()?;
        let number_of_sections = cur.read_u16::<LE>()?;
        // TimeDateStamp, PointerToSymbolTable, NumberOfSymbols
        cur.seek(SeekFrom::Current(12))?;
        let size_of_optional_header = cur.read_u16::<LE>()?;
        let characteristics = cur.read_u16::<LE>()?;
        let optional_magic = if size_of_optional_header >= 2 {
            cur.read_u16::<LE>()?
        } else {
            0
        };

        Ok(PeHeader {
            pe_offset,
            machine,
            number_of_sections,
            characteristics,
            optional_magic,
        })
    }
}

impl Header for PeHeader {
    fn machine(&self) -> u32 {
        u32::from(self.machine)
    }

    fn is_64(&self) -> bool {
        self.optional_magic == MAGIC_64
    }

    fn endian(&self) -> Endian {
        Endian::Little
    }

    fn format(&self) -> BinaryFormat {
        BinaryFormat::Pe
    }
}
