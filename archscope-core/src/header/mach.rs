use crate::header::{BinaryFormat, Header};
use crate::language::Endian;
use byteorder::{ByteOrder, ReadBytesExt, BE, LE};
use goblin::mach::header::{MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64};
use std::io;

/// Start of a thin Mach-O header.
#[derive(Debug, Clone, Copy)]
pub struct MachHeader {
    pub magic: u32,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    endian: Endian,
}

impl MachHeader {
    pub fn from_reader<R: io::Read>(cur: &mut R) -> io::Result<MachHeader> {
        let magic = cur.read_u32::<LE>()?;
        match magic {
            MH_MAGIC | MH_MAGIC_64 => Self::read_fields::<LE, R>(magic, Endian::Little, cur),
            // Byte-swapped magic: the file was written big-endian.
            MH_CIGAM | MH_CIGAM_64 => {
                Self::read_fields::<BE, R>(magic.swap_bytes(), Endian::Big, cur)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad Mach-O magic {magic:#x}"),
            )),
        }
    }

    fn read_fields<B: ByteOrder, R: io::Read>(
        magic: u32,
        endian: Endian,
        cur: &mut R,
    ) -> io::Result<MachHeader> {
        Ok(MachHeader {
            magic,
            cputype: cur.read_u32::<B>()?,
            cpusubtype: cur.read_u32::<B>()?,
            filetype: cur.read_u32::<B>()?,
            endian,
        })
    }
}

impl Header for MachHeader {
    fn machine(&self) -> u32 {
        self.cputype
    }

    fn is_64(&self) -> bool {
        self.magic == MH_MAGIC_64
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn format(&self) -> BinaryFormat {
        BinaryFormat::MachO
    }
}
