//! Binary vector file
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic            8 bytes  "CKBVECS\0"
//! version          u32
//! dimensions       u32
//! count            u64
//! stamp            u16 length + UTF-8 bytes
//! identity         u16 length + UTF-8 bytes
//! vectors          count * dimensions * f32
//! checksum         32 bytes, SHA-256 of everything above
//! ```

use sha2::{Digest, Sha256};

use crate::index::IndexHeader;
use crate::index::error::IndexError;

const MAGIC: &[u8; 8] = b"CKBVECS\0";
const VERSION: u32 = 1;
const CHECKSUM_LEN: usize = 32;

/// Serialize a header and its row-major vector matrix
pub fn encode(header: &IndexHeader, vectors: &[f32]) -> Result<Vec<u8>, IndexError> {
    if vectors.len() != header.count * header.dimensions {
        return Err(IndexError::Corrupt(format!(
            "matrix holds {} values, header describes {}x{}",
            vectors.len(),
            header.count,
            header.dimensions
        )));
    }
    let dimensions = u32::try_from(header.dimensions)
        .map_err(|_| IndexError::Corrupt(format!("too many dimensions: {}", header.dimensions)))?;

    let mut bytes = Vec::with_capacity(64 + vectors.len() * 4 + CHECKSUM_LEN);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimensions.to_le_bytes());
    bytes.extend_from_slice(&(header.count as u64).to_le_bytes());
    put_str(&mut bytes, &header.stamp)?;
    put_str(&mut bytes, &header.embedding_identity)?;
    for value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let checksum = Sha256::digest(&bytes);
    bytes.extend_from_slice(&checksum);
    Ok(bytes)
}

/// Parse and verify a vector file
///
/// Any structural problem, truncation or checksum mismatch is
/// [`IndexError::Corrupt`].
pub fn decode(bytes: &[u8]) -> Result<(IndexHeader, Vec<f32>), IndexError> {
    if bytes.len() < MAGIC.len() + CHECKSUM_LEN {
        return Err(IndexError::Corrupt("vector file is truncated".to_string()));
    }
    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if !body.starts_with(MAGIC) {
        return Err(IndexError::Corrupt("not a vector file".to_string()));
    }
    if Sha256::digest(body).as_slice() != checksum {
        return Err(IndexError::Corrupt("checksum mismatch".to_string()));
    }

    let mut reader = Reader {
        bytes: body,
        offset: MAGIC.len(),
    };
    let version = u32::from_le_bytes(reader.array()?);
    if version != VERSION {
        return Err(IndexError::Corrupt(format!(
            "unsupported format version {}",
            version
        )));
    }
    let dimensions = u32::from_le_bytes(reader.array()?) as usize;
    let count = usize::try_from(u64::from_le_bytes(reader.array()?))
        .map_err(|_| IndexError::Corrupt("vector count overflows".to_string()))?;
    let stamp = reader.string()?;
    let embedding_identity = reader.string()?;

    let values = count
        .checked_mul(dimensions)
        .ok_or_else(|| IndexError::Corrupt("matrix size overflows".to_string()))?;
    if reader.remaining() != values.saturating_mul(4) {
        return Err(IndexError::Corrupt(format!(
            "expected {} matrix bytes, found {}",
            values.saturating_mul(4),
            reader.remaining()
        )));
    }
    let vectors = reader.bytes[reader.offset..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok((
        IndexHeader {
            stamp,
            dimensions,
            count,
            embedding_identity,
        },
        vectors,
    ))
}

fn put_str(bytes: &mut Vec<u8>, value: &str) -> Result<(), IndexError> {
    let len = u16::try_from(value.len())
        .map_err(|_| IndexError::Corrupt(format!("header field too long: {} bytes", value.len())))?;
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8], IndexError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| IndexError::Corrupt("vector file header is truncated".to_string()))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], IndexError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn string(&mut self) -> Result<String, IndexError> {
        let len = u16::from_le_bytes(self.array()?) as usize;
        let bytes = self.take(len)?.to_vec();
        String::from_utf8(bytes)
            .map_err(|_| IndexError::Corrupt("header field is not UTF-8".to_string()))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> IndexHeader {
        IndexHeader {
            stamp: "20260101120000123456789-1".to_string(),
            dimensions: 3,
            count: 2,
            embedding_identity: "hashing-fnv1a/3".to_string(),
        }
    }

    #[test]
    fn test_encode_decode() {
        let vectors = vec![1.0, 0.0, 0.0, 0.0, 0.6, 0.8];
        let bytes = encode(&header(), &vectors).unwrap();

        let (decoded_header, decoded_vectors) = decode(&bytes).unwrap();
        assert_eq!(decoded_header, header());
        assert_eq!(decoded_vectors, vectors);
    }

    #[test]
    fn test_encode_rejects_wrong_matrix_size() {
        assert!(matches!(
            encode(&header(), &[1.0, 2.0]),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn test_flipped_byte_is_detected() {
        let mut bytes = encode(&header(), &[0.5; 6]).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        assert!(matches!(decode(&bytes), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn test_truncated_file_is_detected() {
        let bytes = encode(&header(), &[0.5; 6]).unwrap();
        for len in [0, 7, 40, bytes.len() - 1] {
            assert!(matches!(
                decode(&bytes[..len]),
                Err(IndexError::Corrupt(_))
            ));
        }
    }

    #[test]
    fn test_foreign_file_is_rejected() {
        let mut bytes = b"SQLite format 3\0".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(decode(&bytes), Err(IndexError::Corrupt(_))));
    }
}
