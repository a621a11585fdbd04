use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use goblin::elf::header as elf;
use goblin::mach::cputype as mach;
use goblin::pe::header as pe;

use crate::header::BinaryFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Little => write!(f, "LE"),
            Endian::Big => write!(f, "BE"),
        }
    }
}

impl FromStr for Endian {
    type Err = LanguageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LE" => Ok(Endian::Little),
            "BE" => Ok(Endian::Big),
            other => Err(LanguageParseError::Endian(other.to_string())),
        }
    }
}

/// Identifies instruction set, endianness, address size and variant of a
/// program, written as `processor:ENDIAN:size:variant` (e.g. `ARM:LE:32:v7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguageDescription {
    pub processor: String,
    pub endian: Endian,
    pub size: u32,
    pub variant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LanguageParseError {
    #[error("language description `{0}` must have the form processor:ENDIAN:size:variant")]
    Shape(String),
    #[error("unknown endianness `{0}` (expected LE or BE)")]
    Endian(String),
    #[error("invalid address size `{0}`")]
    Size(String),
}

impl LanguageDescription {
    pub fn new(processor: &str, endian: Endian, size: u32, variant: &str) -> Self {
        Self {
            processor: processor.to_string(),
            endian,
            size,
            variant: variant.to_string(),
        }
    }

    /// Maps a header's machine field to a language.
    ///
    /// `machine` is `e_machine` for ELF, the COFF `Machine` for PE and
    /// `cputype` for Mach-O. Returns `None` for machines without a mapping.
    pub fn from_machine(
        format: BinaryFormat,
        machine: u32,
        is_64: bool,
        endian: Endian,
    ) -> Option<Self> {
        match format {
            BinaryFormat::Elf => Self::from_elf(machine, is_64, endian),
            BinaryFormat::Pe => Self::from_pe(machine),
            BinaryFormat::MachO => Self::from_mach(machine, endian),
        }
    }

    fn from_elf(machine: u32, is_64: bool, endian: Endian) -> Option<Self> {
        let bits = if is_64 { 64 } else { 32 };
        let machine = u16::try_from(machine).ok()?;
        let lang = match machine {
            elf::EM_386 => Self::new("x86", Endian::Little, 32, "default"),
            elf::EM_X86_64 => Self::new("x86", Endian::Little, 64, "default"),
            elf::EM_ARM => Self::new("ARM", endian, 32, "v8"),
            elf::EM_AARCH64 => Self::new("AARCH64", endian, 64, "v8A"),
            elf::EM_MIPS => Self::new("MIPS", endian, bits, "default"),
            elf::EM_PPC => Self::new("PowerPC", endian, 32, "default"),
            elf::EM_PPC64 => Self::new("PowerPC", endian, 64, "default"),
            elf::EM_RISCV if is_64 => Self::new("RISCV", Endian::Little, 64, "RV64GC"),
            elf::EM_RISCV => Self::new("RISCV", Endian::Little, 32, "RV32GC"),
            elf::EM_SPARC => Self::new("sparc", Endian::Big, 32, "default"),
            elf::EM_SPARCV9 => Self::new("sparc", Endian::Big, 64, "default"),
            elf::EM_68K => Self::new("68000", Endian::Big, 32, "default"),
            elf::EM_SH => Self::new("SuperH4", endian, 32, "default"),
            elf::EM_AVR => Self::new("avr8", Endian::Little, 16, "default"),
            elf::EM_MSP430 => Self::new("TI_MSP430", Endian::Little, 16, "default"),
            _ => return None,
        };
        Some(lang)
    }

    fn from_pe(machine: u32) -> Option<Self> {
        let machine = u16::try_from(machine).ok()?;
        let lang = match machine {
            pe::COFF_MACHINE_X86 => Self::new("x86", Endian::Little, 32, "default"),
            pe::COFF_MACHINE_X86_64 => Self::new("x86", Endian::Little, 64, "default"),
            // Windows on ARM32 only runs Thumb-2 code
            pe::COFF_MACHINE_ARMNT => Self::new("ARM", Endian::Little, 32, "v7"),
            pe::COFF_MACHINE_ARM => Self::new("ARM", Endian::Little, 32, "v8"),
            pe::COFF_MACHINE_ARM64 => Self::new("AARCH64", Endian::Little, 64, "v8A"),
            _ => return None,
        };
        Some(lang)
    }

    fn from_mach(cputype: u32, endian: Endian) -> Option<Self> {
        let lang = match cputype {
            mach::CPU_TYPE_X86 => Self::new("x86", Endian::Little, 32, "default"),
            mach::CPU_TYPE_X86_64 => Self::new("x86", Endian::Little, 64, "default"),
            mach::CPU_TYPE_ARM => Self::new("ARM", endian, 32, "v8"),
            mach::CPU_TYPE_ARM64 => Self::new("AARCH64", endian, 64, "v8A"),
            mach::CPU_TYPE_POWERPC => Self::new("PowerPC", Endian::Big, 32, "default"),
            mach::CPU_TYPE_POWERPC64 => Self::new("PowerPC", Endian::Big, 64, "default"),
            _ => return None,
        };
        Some(lang)
    }
}

impl fmt::Display for LanguageDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.processor, self.endian, self.size, self.variant
        )
    }
}

impl FromStr for LanguageDescription {
    type Err = LanguageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let [processor, endian, size, variant] = parts.as_slice() else {
            return Err(LanguageParseError::Shape(s.to_string()));
        };
        if processor.is_empty() || variant.is_empty() {
            return Err(LanguageParseError::Shape(s.to_string()));
        }

        let endian = endian.parse()?;
        let size = size
            .parse::<u32>()
            .ok()
            .filter(|bits| *bits > 0)
            .ok_or_else(|| LanguageParseError::Size(size.to_string()))?;

        Ok(Self::new(processor, endian, size, variant))
    }
}
