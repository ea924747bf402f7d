use std::io;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {structure} signature: expected {expected:#06X}, saw {found:#06X}")]
    InvalidSignature {
        structure: &'static str,
        expected: u16,
        found: u16,
    },
    #[error("input truncated: {needed} bytes needed at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("output buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("the block size {0} is invalid")]
    InvalidBlockSize(u16),
    #[error("the {field} field holds at most {max} bytes, got {len}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("last LBA {last_lba} does not fit a partition starting at LBA {first_lba}")]
    InvalidExtent { first_lba: u32, last_lba: u64 },
}

impl Error {
    /// Checks that an output region of `len` bytes at `offset` fits a buffer
    /// of `available` bytes.
    pub(crate) fn check_output(offset: usize, len: usize, available: usize) -> Result<(), Error> {
        match offset.checked_add(len) {
            Some(end) if end <= available => Ok(()),
            _ => Err(Error::BufferTooSmall {
                needed: len,
                available: available.saturating_sub(offset),
            }),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Truncated { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::BufferTooSmall { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_message_shows_both_magics() {
        let err = Error::InvalidSignature {
            structure: "driver descriptor map",
            expected: 0x4552,
            found: 0xdead,
        };
        assert_eq!(
            err.to_string(),
            "invalid driver descriptor map signature: expected 0x4552, saw 0xDEAD"
        );
    }

    #[test]
    fn output_bounds() {
        assert!(Error::check_output(512, 512, 1024).is_ok());
        assert_eq!(
            Error::check_output(1024, 512, 1024),
            Err(Error::BufferTooSmall {
                needed: 512,
                available: 0
            })
        );
    }

    #[test]
    fn converts_to_io_error_kinds() {
        let eof: io::Error = Error::Truncated {
            offset: 0,
            needed: 512,
            available: 0,
        }
        .into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let full: io::Error = Error::BufferTooSmall {
            needed: 512,
            available: 10,
        }
        .into();
        assert_eq!(full.kind(), io::ErrorKind::WriteZero);

        let bad: io::Error = Error::InvalidBlockSize(0).into();
        assert_eq!(bad.kind(), io::ErrorKind::InvalidData);
    }
}
