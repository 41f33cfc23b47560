//! Optional zlib compression of outbound payloads.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Upper bound on inflated payload size.
pub const MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Deflate `data` with the zlib container.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate `data`, refusing anything larger than [`MAX_DECOMPRESSED_SIZE`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| Error::invalid(format!("decompression failed: {}", e)))?;

    if output.len() > MAX_DECOMPRESSED_SIZE {
        return Err(Error::invalid("decompressed payload too large"));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_shrinks_repetitive_data() {
        let data = vec![b'A'; 4096];
        let packed = compress(&data).unwrap();
        assert!(packed.len() < 128);
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_decompress_garbage() {
        assert!(decompress(b"definitely not zlib").is_err());
    }
}
