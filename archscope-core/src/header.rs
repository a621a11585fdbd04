pub mod elf;
pub mod mach;
pub mod pe;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::language::{Endian, LanguageDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryFormat {
    Elf,
    Pe,
    MachO,
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryFormat::Elf => "ELF",
            BinaryFormat::Pe => "PE",
            BinaryFormat::MachO => "Mach-O",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BinaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elf" => Ok(BinaryFormat::Elf),
            "pe" => Ok(BinaryFormat::Pe),
            "mach-o" | "macho" => Ok(BinaryFormat::MachO),
            _ => Err(format!("Unknown binary format: {}", s)),
        }
    }
}

/// The fixed part of an executable header that carries its architecture tag.
pub trait Header: fmt::Debug + Send + Sync {
    /// Returns the raw machine identifier (`e_machine`, COFF `Machine`, `cputype`).
    fn machine(&self) -> u32;

    /// Returns true if this is a 64-bit binary.
    fn is_64(&self) -> bool;

    /// Byte order the header was written in.
    fn endian(&self) -> Endian;

    fn format(&self) -> BinaryFormat;

    /// Derives the language description, if the machine is known.
    fn language(&self) -> Option<LanguageDescription> {
        LanguageDescription::from_machine(self.format(), self.machine(), self.is_64(), self.endian())
    }
}
