//! Gzip encoding of feature collections.
//!
//! The payload is the canonical JSON encoding (struct field order, no
//! whitespace) compressed with gzip. The gzip header carries no timestamp,
//! so equal collections always compress to equal bytes.

use std::io::{Read, Write};

use field_processor::MapFeatureCollection;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{StorageError, StorageResult};

/// Serialize and gzip a feature collection.
pub fn compress_collection(collection: &MapFeatureCollection) -> StorageResult<Vec<u8>> {
    let json = serde_json::to_vec(collection)?;
    compress_bytes(&json)
}

/// Gunzip and parse a feature collection.
pub fn decompress_collection(data: &[u8]) -> StorageResult<MapFeatureCollection> {
    let json = decompress_bytes(data)?;
    Ok(serde_json::from_slice(&json)?)
}

pub fn compress_bytes(data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| StorageError::Compression(e.to_string()))
}

pub fn decompress_bytes(data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_processor::CollectionProperties;

    fn collection() -> MapFeatureCollection {
        MapFeatureCollection::new(CollectionProperties {
            description: "Value contours".to_string(),
            units: "m/s".to_string(),
            levels: vec![0.0, 5.0, 10.0],
        })
    }

    #[test]
    fn test_gzip_magic() {
        let bytes = compress_collection(&collection()).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_compression_is_stable() {
        let a = compress_collection(&collection()).unwrap();
        let b = compress_collection(&collection()).unwrap();
        assert_eq!(a, b);
        assert_eq!(decompress_collection(&a).unwrap(), collection());
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let err = decompress_collection(b"not gzip").unwrap_err();
        assert!(matches!(err, StorageError::Compression(_)));
    }
}
