use crate::image::ProgramImage;
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidImageError {
    #[error("invalid image: no program image was supplied")]
    Missing,
    #[error("invalid image: `{0}` is not fully loaded (no language description)")]
    NotLoaded(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),
    #[error("failed to write architecture report: {0}")]
    Io(#[from] io::Error),
}

/// Formats the diagnostic line for `image`, without the trailing newline.
pub fn architecture_line(image: Option<&ProgramImage>) -> Result<String, InvalidImageError> {
    let image = image.ok_or(InvalidImageError::Missing)?;
    let language = image.language_description()?;
    Ok(format!("Architecture: {language}"))
}

/// Writes `Architecture: <description>` as a single line to `out`.
///
/// The image is only borrowed for the call. When it is absent or not fully
/// loaded nothing is written.
pub fn report_architecture<W: Write>(
    image: Option<&ProgramImage>,
    out: &mut W,
) -> Result<(), ReportError> {
    let line = architecture_line(image)?;
    log::debug!("reporting {line:?}");
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

pub fn report_architecture_to_stderr(image: Option<&ProgramImage>) -> Result<(), ReportError> {
    report_architecture(image, &mut io::stderr().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BinaryFormat;

    fn image(language: &str) -> ProgramImage {
        ProgramImage::new(
            "firmware.bin",
            "/tmp/firmware.bin",
            BinaryFormat::Elf,
            Some(language.parse().unwrap()),
        )
    }

    fn report(image: Option<&ProgramImage>) -> (Result<(), ReportError>, String) {
        let mut out = Vec::new();
        let res = report_architecture(image, &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn arm_v7() {
        let img = image("ARM:LE:32:v7");
        let (res, out) = report(Some(&img));
        res.unwrap();
        assert_eq!(out, "Architecture: ARM:LE:32:v7\n");
    }

    #[test]
    fn x86_64() {
        let img = image("x86:LE:64:default");
        let (res, out) = report(Some(&img));
        res.unwrap();
        assert_eq!(out, "Architecture: x86:LE:64:default\n");
    }

    #[test]
    fn missing_image_writes_nothing() {
        let (res, out) = report(None);
        assert!(matches!(
            res,
            Err(ReportError::InvalidImage(InvalidImageError::Missing))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn unloaded_image_writes_nothing() {
        let img = ProgramImage::new("ls", "/bin/ls", BinaryFormat::Elf, None);
        let (res, out) = report(Some(&img));
        assert!(matches!(
            res,
            Err(ReportError::InvalidImage(InvalidImageError::NotLoaded(ref name))) if name == "ls"
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn repeated_reports_match_and_leave_image_untouched() {
        let img = image("AARCH64:LE:64:v8A");
        let before = img.clone();

        let (first_res, first) = report(Some(&img));
        let (second_res, second) = report(Some(&img));
        first_res.unwrap();
        second_res.unwrap();

        assert_eq!(first, second);
        assert_eq!(img, before);
    }
}
