pub mod config;
pub mod header;
pub mod headless;
pub mod image;
pub mod language;
pub mod project;
pub mod properties;
pub mod report;

pub use config::*;
pub use header::BinaryFormat;
pub use image::*;
pub use language::*;
pub use report::*;
