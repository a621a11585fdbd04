use crate::header::{BinaryFormat, Header};
use crate::language::Endian;
use byteorder::{ByteOrder, ReadBytesExt, BE, LE};
use goblin::elf::header::{EI_CLASS, EI_DATA, ELFCLASS64, ELFDATA2MSB};
use std::io;

/// Leading fields of an ELF header, up to and including `e_flags`.
///
/// Covers both `Elf32_Ehdr` and `Elf64_Ehdr`; the address-sized fields are
/// widened to `u64`.
///
/// Reference: [ELF Specification v1.2](https://refspecs.linuxfoundation.org/elf/elf.pdf)
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    /// ELF identification bytes. `e_ident[EI_CLASS]` selects 32/64-bit and
    /// `e_ident[EI_DATA]` the byte order of every following field.
    pub e_ident: [u8; 16],

    /// Object file type (e.g. relocatable, executable, shared, core).
    pub e_type: u16,

    /// Target architecture, e.g. `EM_X86_64` (62) or `EM_AARCH64` (183).
    pub e_machine: u16,

    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,

    /// Processor-specific flags.
    pub e_flags: u32,
}

impl ElfHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<ElfHeader> {
        let mut e_ident = [0u8; 16];
        cur.read_exact(&mut e_ident)?;

        if e_ident[EI_DATA] == ELFDATA2MSB {
            Self::read_fields::<BE, R>(e_ident, cur)
        } else {
            Self::read_fields::<LE, R>(e_ident, cur)
        }
    }

    fn read_fields<B: ByteOrder, R: io::Read>(
        e_ident: [u8; 16],
        cur: &mut R,
    ) -> io::Result<ElfHeader> {
        let is_64 = e_ident[EI_CLASS] == ELFCLASS64;

        let e_type = cur.read_u16::<B>()?;
        let e_machine = cur.read_u16::<B>()?;
        let e_version = cur.read_u32::<B>()?;
        let e_entry = read_addr::<B, R>(cur, is_64)?;
        let e_phoff = read_addr::<B, R>(cur, is_64)?;
        let e_shoff = read_addr::<B, R>(cur, is_64)?;
        let e_flags = cur.read_u32::<B>()?;

        Ok(ElfHeader {
            e_ident,
            e_type,
            e_machine,
            e_version,
            e_entry,
            e_phoff,
            e_shoff,
            e_flags,
        })
    }
}

fn read_addr<B: ByteOrder, R: io::Read>(cur: &mut R, is_64: bool) -> io::Result<u64> {
    if is_64 {
        cur.read_u64::<B>()
    } else {
        cur.read_u32::<B>().map(u64::from)
    }
}

impl Header for ElfHeader {
    fn machine(&self) -> u32 {
        u32::from(self.e_machine)
    }

    fn is_64(&self) -> bool {
        self.e_ident[EI_CLASS] == ELFCLASS64
    }

    fn endian(&self) -> Endian {
        if self.e_ident[EI_DATA] == ELFDATA2MSB {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    fn format(&self) -> BinaryFormat {
        BinaryFormat::Elf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use goblin::elf::header::{EM_MIPS, EM_X86_64};
    use std::io::Cursor;

    #[test]
    fn reads_elf64_little_endian() {
        let mut buf = vec![0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        buf.write_u16::<LE>(2).unwrap();
        buf.write_u16::<LE>(EM_X86_64).unwrap();
        buf.write_u32::<LE>(1).unwrap();
        buf.write_u64::<LE>(0x401000).unwrap();
        buf.write_u64::<LE>(64).unwrap();
        buf.write_u64::<LE>(0).unwrap();
        buf.write_u32::<LE>(0).unwrap();

        let hdr = ElfHeader::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(hdr.e_entry, 0x401000);
        assert!(hdr.is_64());
        assert_eq!(hdr.endian(), Endian::Little);
        assert_eq!(hdr.language().unwrap().to_string(), "x86:LE:64:default");
    }

    #[test]
    fn reads_elf32_big_endian() {
        let mut buf = vec![0x7f, b'E', b'L', b'F', 1, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        buf.write_u16::<BE>(2).unwrap();
        buf.write_u16::<BE>(EM_MIPS).unwrap();
        buf.write_u32::<BE>(1).unwrap();
        buf.write_u32::<BE>(0x400000).unwrap();
        buf.write_u32::<BE>(52).unwrap();
        buf.write_u32::<BE>(0).unwrap();
        buf.write_u32::<BE>(0x7000_1007).unwrap();

        let hdr = ElfHeader::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(hdr.e_machine, EM_MIPS);
        assert_eq!(hdr.e_entry, 0x400000);
        assert_eq!(hdr.e_flags, 0x7000_1007);
        assert!(!hdr.is_64());
        assert_eq!(hdr.language().unwrap().to_string(), "MIPS:BE:32:default");
    }
}
