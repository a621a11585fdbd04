#![allow(dead_code)]

use byteorder::{ByteOrder, WriteBytesExt, BE, LE};
use std::path::{Path, PathBuf};

/// Minimal ELF header, just long enough for the loader.
pub fn elf(is_64: bool, big_endian: bool, machine: u16) -> Vec<u8> {
    if big_endian {
        elf_with::<BE>(is_64, 2, machine)
    } else {
        elf_with::<LE>(is_64, 1, machine)
    }
}

fn elf_with<B: ByteOrder>(is_64: bool, data: u8, machine: u16) -> Vec<u8> {
    let class = if is_64 { 2 } else { 1 };
    let mut buf = vec![0x7f, b'E', b'L', b'F', class, data, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    buf.write_u16::<B>(2).unwrap();
    buf.write_u16::<B>(machine).unwrap();
    buf.write_u32::<B>(1).unwrap();
    // e_entry, e_phoff, e_shoff
    for _ in 0..3 {
        if is_64 {
            buf.write_u64::<B>(0).unwrap();
        } else {
            buf.write_u32::<B>(0).unwrap();
        }
    }
    buf.write_u32::<B>(0).unwrap();
    // e_ehsize .. e_shstrndx
    buf.resize(if is_64 { 64 } else { 52 }, 0);
    buf
}

/// DOS stub followed by a COFF header and optional-header magic.
pub fn pe(machine: u16, optional_magic: u16) -> Vec<u8> {
    let pe_offset = 0x40u32;
    let mut buf = vec![0u8; pe_offset as usize];
    buf[0] = b'M';
    buf[1] = b'Z';
    LE::write_u32(&mut buf[0x3c..0x40], pe_offset);
    buf.extend_from_slice(b"PE\0\0");
    buf.write_u16::<LE>(machine).unwrap();
    buf.write_u16::<LE>(1).unwrap();
    buf.write_u32::<LE>(0).unwrap();
    buf.write_u32::<LE>(0).unwrap();
    buf.write_u32::<LE>(0).unwrap();
    buf.write_u16::<LE>(0xf0).unwrap();
    buf.write_u16::<LE>(0x22).unwrap();
    buf.write_u16::<LE>(optional_magic).unwrap();
    buf.resize(0x200, 0);
    buf
}

/// Thin little-endian Mach-O header.
pub fn mach(is_64: bool, cputype: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let magic = if is_64 { 0xfeed_facf } else { 0xfeed_face };
    buf.write_u32::<LE>(magic).unwrap();
    buf.write_u32::<LE>(cputype).unwrap();
    buf.write_u32::<LE>(0).unwrap();
    buf.write_u32::<LE>(2).unwrap();
    buf.resize(32, 0);
    buf
}

/// Thin big-endian Mach-O header, as written for PowerPC.
pub fn mach_be(is_64: bool, cputype: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let magic = if is_64 { 0xfeed_facf } else { 0xfeed_face };
    buf.write_u32::<BE>(magic).unwrap();
    buf.write_u32::<BE>(cputype).unwrap();
    buf.write_u32::<BE>(0).unwrap();
    buf.write_u32::<BE>(2).unwrap();
    buf.resize(32, 0);
    buf
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
