//! Reader/writer for the Pulseq `.seq` interchange format.
//!
//! The container is text: square-bracket section headers, whitespace
//! separated rows, integer raster units for times, run-length compressed
//! normalized shapes. Versions 1.2.x and 1.4.x are read; 1.4.0 is written.

use std::fmt;

pub mod read;
pub mod shape;
pub mod write;

pub use read::{parse_str, read_file};
pub use shape::{compress_shape, decompress_shape, CompressedShape};
pub use write::{write_file, write_str};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// malformed header, section or row; nothing is loaded
    InvalidFormat(String),
    /// version outside 1.2.x / 1.4.x
    UnsupportedVersion { major: i32, minor: i32, revision: i32 },
    /// an event row references an id with no definition
    DanglingReference { section: &'static str, id: usize },
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFormat(msg) => write!(f, "invalid sequence file: {}", msg),
            Error::UnsupportedVersion {
                major,
                minor,
                revision,
            } => write!(
                f,
                "unsupported pulseq version {}.{}.{}",
                major, minor, revision
            ),
            Error::DanglingReference { section, id } => {
                write!(f, "dangling reference: {} id {} is not defined", section, id)
            }
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// version triple packed as major*1_000_000 + minor*1_000 + revision
pub fn version_code(major: i32, minor: i32, revision: i32) -> i32 {
    major * 1_000_000 + minor * 1_000 + revision
}

pub(crate) fn supported(major: i32, minor: i32) -> bool {
    major == 1 && (minor == 2 || minor == 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_packing() {
        assert_eq!(version_code(1, 4, 0), 1_004_000);
        assert_eq!(version_code(1, 2, 1), 1_002_001);
    }

    #[test]
    fn supported_versions() {
        assert!(supported(1, 2));
        assert!(supported(1, 4));
        assert!(!supported(1, 3));
        assert!(!supported(2, 0));
    }
}
