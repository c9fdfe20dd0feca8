//! Fixed-size chunk splitting

use bytes::Bytes;

use crate::VaultError;

/// Split `data` into ordered chunks of `chunk_size` bytes. Every chunk but the
/// last is exactly `chunk_size` bytes; the last holds the remainder.
/// Concatenating the chunks in order reproduces the input byte-exact.
///
/// Zero-length input is rejected: a declared upload that splits into zero
/// chunks would silently ingest nothing.
pub fn split(data: &Bytes, chunk_size: usize) -> Result<Vec<Bytes>, VaultError> {
    if chunk_size == 0 {
        return Err(VaultError::InvalidInput(
            "Chunk size must be greater than zero".to_string(),
        ));
    }
    if data.is_empty() {
        return Err(VaultError::InvalidInput(
            "Chunks cannot be empty".to_string(),
        ));
    }

    let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
    let mut offset = 0;
    while offset < data.len() {
        let end = usize::min(offset + chunk_size, data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }

    Ok(chunks)
}

/// Number of chunks a payload of `len` bytes splits into.
pub fn chunk_count(len: u64, chunk_size: usize) -> u32 {
    len.div_ceil(chunk_size as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_exact_multiple() {
        let data = Bytes::from(vec![7u8; 40]);
        let chunks = split(&data, 10).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn test_split_with_remainder() {
        // 2.5 chunks worth of data
        let data = Bytes::from(vec![1u8; 25]);
        let chunks = split(&data, 10).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_split_single_byte() {
        let data = Bytes::from_static(b"x");
        let chunks = split(&data, 1024).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], Bytes::from_static(b"x"));
    }

    #[test]
    fn test_split_rejects_empty_input() {
        let err = split(&Bytes::new(), 1024).unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
        assert!(err.to_string().contains("Chunks cannot be empty"));
    }

    #[test]
    fn test_split_rejects_zero_chunk_size() {
        let data = Bytes::from_static(b"abc");
        assert!(matches!(
            split(&data, 0),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let data: Bytes = (0..=255u8).cycle().take(3001).collect::<Vec<u8>>().into();
        let chunks = split(&data, 256).unwrap();

        let mut rebuilt = Vec::with_capacity(data.len());
        for chunk in &chunks {
            rebuilt.extend_from_slice(chunk);
        }
        assert_eq!(Bytes::from(rebuilt), data);
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(1, 10), 1);
        assert_eq!(chunk_count(10, 10), 1);
        assert_eq!(chunk_count(11, 10), 2);
        assert_eq!(chunk_count(25, 10), 3);
        assert_eq!(chunk_count(0, 10), 0);
    }
}
