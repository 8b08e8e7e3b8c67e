//! Length-prefixed record framing, shared by the WAL and the data file.
//!
//! A frame is a 4-byte little-endian unsigned length followed by that
//! many bytes of MessagePack body. A stream that ends exactly on a frame
//! boundary is well-formed; a stream that ends inside a length prefix or
//! inside a body is corrupt.

use crate::error::{Error, Result};
use jotdb_storage::StorageBackend;

const LEN_PREFIX: u64 = 4;

/// Wraps an encoded record body into a single appendable frame.
pub(crate) fn encode(body: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(body.len())
        .map_err(|_| Error::corruption(format!("record body of {} bytes too large", body.len())))?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Iterates the frame bodies of a backend from offset zero.
pub(crate) struct FrameReader<'a> {
    backend: &'a dyn StorageBackend,
    offset: u64,
    end: u64,
    failed: bool,
}

impl<'a> FrameReader<'a> {
    pub(crate) fn new(backend: &'a dyn StorageBackend) -> Result<Self> {
        let end = backend.len()?;
        Ok(Self {
            backend,
            offset: 0,
            end,
            failed: false,
        })
    }
}

impl Iterator for FrameReader<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.end {
            return None;
        }

        let remaining = self.end - self.offset;
        if remaining < LEN_PREFIX {
            self.failed = true;
            return Some(Err(Error::corruption(format!(
                "truncated length prefix at offset {}: {} trailing bytes",
                self.offset, remaining
            ))));
        }

        let header = match self.backend.read_at(self.offset, LEN_PREFIX as usize) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        };
        let body_len = u64::from(u32::from_le_bytes([
            header[0], header[1], header[2], header[3],
        ]));

        if remaining - LEN_PREFIX < body_len {
            self.failed = true;
            return Some(Err(Error::corruption(format!(
                "truncated record body at offset {}: need {} bytes, have {}",
                self.offset + LEN_PREFIX,
                body_len,
                remaining - LEN_PREFIX
            ))));
        }

        let body = match self
            .backend
            .read_at(self.offset + LEN_PREFIX, body_len as usize)
        {
            Ok(bytes) => bytes,
            Err(e) => {
                self.failed = true;
                return Some(Err(e.into()));
            }
        };

        self.offset += LEN_PREFIX + body_len;
        Some(Ok(body))
    }
}
