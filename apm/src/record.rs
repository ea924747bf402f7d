use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::error::Error;

/// Copies a fixed-size on-disk record out of `bytes` at `offset`.
pub(crate) fn read<T: FromBytes>(bytes: &[u8], offset: usize) -> Result<T, Error> {
    let window = bytes.get(offset..).unwrap_or_default();
    T::read_from_prefix(window)
        .map(|(record, _)| record)
        .map_err(|_| Error::Truncated {
            offset,
            needed: size_of::<T>(),
            available: window.len(),
        })
}

/// Writes a fixed-size on-disk record into `buf` at `offset`, returning the
/// number of bytes written.
pub(crate) fn write<T: IntoBytes + Immutable>(
    record: &T,
    buf: &mut [u8],
    offset: usize,
) -> Result<usize, Error> {
    let window = buf.get_mut(offset..).unwrap_or_default();
    let available = window.len();
    record
        .write_to_prefix(window)
        .map_err(|_| Error::BufferTooSmall {
            needed: size_of::<T>(),
            available,
        })?;
    Ok(size_of::<T>())
}
