use crate::header::elf::ElfHeader;
use crate::header::mach::MachHeader;
use crate::header::pe::PeHeader;
use crate::header::{BinaryFormat, Header};
use crate::language::LanguageDescription;
use crate::report::InvalidImageError;
use goblin::Hint;
use serde::Serialize;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("{0}: file too short to hold a binary header")]
    Truncated(String),
    #[error("{path}: unsupported binary format ({kind})")]
    UnsupportedFormat { path: String, kind: String },
    #[error("{path}: no language for {format} machine type {machine:#x}")]
    UnsupportedMachine {
        path: String,
        format: BinaryFormat,
        machine: u32,
    },
    #[error("{path}: malformed header: {source}")]
    Malformed { path: String, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Goblin(#[from] goblin::error::Error),
}

/// A loaded binary as far as architecture reporting is concerned.
///
/// An image without a language description is not fully loaded, e.g. one
/// restored from a project entry that was never analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramImage {
    pub name: String,
    pub path: PathBuf,
    pub format: BinaryFormat,
    language: Option<LanguageDescription>,
}

impl ProgramImage {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        format: BinaryFormat,
        language: Option<LanguageDescription>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format,
            language,
        }
    }

    /// Reads the binary at `path` and derives its language from the header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let mut reader = BufReader::new(std::fs::File::open(path)?);
        let mut ident = [0u8; 16];
        if let Err(e) = reader.read_exact(&mut ident) {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof => ImageError::Truncated(display),
                _ => e.into(),
            });
        }
        reader.seek(SeekFrom::Start(0))?;

        let header: Box<dyn Header> = match goblin::peek_bytes(&ident)? {
            Hint::Elf(_) => Box::new(Self::read_header(
                &display,
                ElfHeader::from_reader(&mut reader),
            )?),
            Hint::PE => Box::new(Self::read_header(
                &display,
                PeHeader::from_reader(&mut reader),
            )?),
            Hint::Mach(_) => Box::new(Self::read_header(
                &display,
                MachHeader::from_reader(&mut reader),
            )?),
            Hint::MachFat(narches) => {
                return Err(ImageError::UnsupportedFormat {
                    path: display,
                    kind: format!("fat Mach-O with {narches} architectures"),
                })
            }
            Hint::Archive => {
                return Err(ImageError::UnsupportedFormat {
                    path: display,
                    kind: "static archive".to_string(),
                })
            }
            Hint::Unknown(magic) => {
                return Err(ImageError::UnsupportedFormat {
                    path: display,
                    kind: format!("unknown magic {magic:#x}"),
                })
            }
            _ => {
                return Err(ImageError::UnsupportedFormat {
                    path: display,
                    kind: "unrecognized header".to_string(),
                })
            }
        };
        log::debug!(
            "{}: {} header, machine {:#x}, 64-bit: {}, {:?}",
            display,
            header.format(),
            header.machine(),
            header.is_64(),
            header.endian()
        );

        let language = header
            .language()
            .ok_or_else(|| ImageError::UnsupportedMachine {
                path: display.clone(),
                format: header.format(),
                machine: header.machine(),
            })?;
        log::info!("{display}: language {language}");

        Ok(Self::new(file_name(path), path, header.format(), Some(language)))
    }

    fn read_header<H>(path: &str, parsed: io::Result<H>) -> Result<H, ImageError> {
        parsed.map_err(|source| match source.kind() {
            io::ErrorKind::UnexpectedEof => ImageError::Truncated(path.to_string()),
            _ => ImageError::Malformed {
                path: path.to_string(),
                source,
            },
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.language.is_some()
    }

    pub fn language_description(&self) -> Result<&LanguageDescription, InvalidImageError> {
        self.language
            .as_ref()
            .ok_or_else(|| InvalidImageError::NotLoaded(self.name.clone()))
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
