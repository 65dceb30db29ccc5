//! Deflate compression for compressed text, blob and local-structured
//! payloads.
//!
//! Payloads use the zlib container so a compressed value is
//! self-identifying, but the decoder never sniffs: the value's meaning tag
//! decides whether these functions run.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::DecodeError;
use crate::limits::MAX_DECOMPRESSED_LEN;

/// Compresses a payload with zlib deflate.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        Compression::default(),
    );
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| DecodeError::Compression {
            context: "deflate",
            reason: e.to_string(),
        })
}

/// Decompresses a zlib deflate payload, bounded by `max_len`.
pub fn inflate(data: &[u8], max_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(data).take(max_len as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Compression {
            context: "inflate",
            reason: e.to_string(),
        })?;
    if out.len() > max_len {
        return Err(DecodeError::LengthExceedsLimit {
            field: "decompressed payload",
            len: out.len(),
            max: max_len,
        });
    }
    Ok(out)
}

/// Decompresses with the crate-wide decompression bound.
pub fn inflate_bounded(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    inflate(data, MAX_DECOMPRESSED_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_roundtrip() {
        let cases: [&[u8]; 3] = [b"", b"Hallo", b"a real man, oh yeah"];
        for data in cases {
            let compressed = deflate(data).unwrap();
            let restored = inflate_bounded(&compressed).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn test_deflate_emits_zlib_container() {
        // zlib magic: 0x78 followed by a valid flag byte.
        let compressed = deflate(b"Hallo").unwrap();
        assert_eq!(compressed[0], 0x78);
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        let result = inflate_bounded(b"not zlib data");
        assert!(matches!(result, Err(DecodeError::Compression { .. })));
    }

    #[test]
    fn test_inflate_enforces_limit() {
        let big = vec![0u8; 4096];
        let compressed = deflate(&big).unwrap();
        let result = inflate(&compressed, 1024);
        assert!(matches!(
            result,
            Err(DecodeError::LengthExceedsLimit { .. })
        ));
    }
}
