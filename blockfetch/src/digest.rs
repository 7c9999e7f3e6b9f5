//! Head and full digest computation for blocks.
//!
//! Every block carries up to two SHA-256 digests: a head digest over only
//! the first read chunk (cheap pre-check) and a full digest over the whole
//! block. Both can be accumulated in a single streaming pass, or recomputed
//! independently from a seekable file; the results are identical either way
//! because chunks are always filled to the configured length before the
//! source is exhausted.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Default read-chunk length in bytes. The head digest covers exactly the
/// first chunk, so this value is part of the digest contract.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Dual digest accumulator for a single streaming pass.
///
/// The head accumulator is fed only by the first `update` call, the full
/// accumulator by every call.
pub struct BlockHasher {
    head: Sha256,
    full: Sha256,
    first: bool,
}

impl BlockHasher {
    pub fn new() -> Self {
        Self {
            head: Sha256::new(),
            full: Sha256::new(),
            first: true,
        }
    }

    /// Feed one chunk of block content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.full.update(chunk);
        if self.first {
            self.head.update(chunk);
            self.first = false;
        }
    }

    /// Produce `(head, full)` as lowercase hex strings.
    pub fn finalize(self) -> (String, String) {
        (
            format!("{:x}", self.head.finalize()),
            format!("{:x}", self.full.finalize()),
        )
    }
}

impl Default for BlockHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read up to `buf.len()` bytes, looping over short reads.
///
/// Returns the number of bytes filled; less than `buf.len()` only at end of
/// input. Keeps chunk boundaries deterministic across sources that return
/// short reads (network streams in particular).
pub(crate) fn read_chunk<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Digest a bounded byte source.
///
/// Reads `reader` to exhaustion in `chunk_size` pieces and returns
/// `(head, full)` hex digests. With `head_only` set, at most one chunk is
/// read and the full digest is skipped.
pub fn digest_range<R: Read + ?Sized>(
    reader: &mut R,
    chunk_size: usize,
    head_only: bool,
) -> io::Result<(String, Option<String>)> {
    let mut hasher = BlockHasher::new();
    let mut buf = vec![0u8; chunk_size];

    loop {
        let n = read_chunk(reader, &mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        if head_only {
            break;
        }
    }

    let (head, full) = hasher.finalize();
    Ok((head, if head_only { None } else { Some(full) }))
}

/// Digest `len` bytes of a file starting at `offset`.
pub fn digest_file_range(
    path: &Path,
    offset: u64,
    len: u64,
    chunk_size: usize,
    head_only: bool,
) -> io::Result<(String, Option<String>)> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut bounded = file.take(len);
    digest_range(&mut bounded, chunk_size, head_only)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use tempfile::TempDir;

    use super::*;

    // SHA-256 of "hello world"
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_digest_known_vector() {
        let mut reader = Cursor::new(b"hello world".to_vec());
        let (head, full) = digest_range(&mut reader, 8192, false).unwrap();

        // Content fits in one chunk, so head and full agree.
        assert_eq!(head, HELLO_SHA256);
        assert_eq!(full.as_deref(), Some(HELLO_SHA256));
    }

    #[test]
    fn test_head_covers_only_first_chunk() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut reader = Cursor::new(data.clone());
        let (head, full) = digest_range(&mut reader, 16, false).unwrap();

        let expected_head = format!("{:x}", Sha256::digest(&data[..16]));
        let expected_full = format!("{:x}", Sha256::digest(&data));
        assert_eq!(head, expected_head);
        assert_eq!(full.as_deref(), Some(expected_full.as_str()));
    }

    #[test]
    fn test_head_only_skips_full() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut reader = Cursor::new(data.clone());
        let (head, full) = digest_range(&mut reader, 16, true).unwrap();

        assert_eq!(head, format!("{:x}", Sha256::digest(&data[..16])));
        assert!(full.is_none());
    }

    #[test]
    fn test_head_matches_between_modes() {
        let data: Vec<u8> = (0..255u8).cycle().take(4096).collect();

        let (head_only, _) = digest_range(&mut Cursor::new(data.clone()), 512, true).unwrap();
        let (head_full, _) = digest_range(&mut Cursor::new(data), 512, false).unwrap();

        assert_eq!(head_only, head_full);
    }

    #[test]
    fn test_digest_deterministic() {
        let data = vec![0xABu8; 100_000];

        let first = digest_range(&mut Cursor::new(data.clone()), 8192, false).unwrap();
        let second = digest_range(&mut Cursor::new(data), 8192, false).unwrap();

        assert_eq!(first, second);
    }

    /// A reader that returns at most one byte per read call.
    struct TrickleReader(Cursor<Vec<u8>>);

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    #[test]
    fn test_short_reads_do_not_change_chunking() {
        let data: Vec<u8> = (0..200u8).collect();

        let (head_a, full_a) = digest_range(&mut Cursor::new(data.clone()), 64, false).unwrap();
        let (head_b, full_b) =
            digest_range(&mut TrickleReader(Cursor::new(data)), 64, false).unwrap();

        assert_eq!(head_a, head_b);
        assert_eq!(full_a, full_b);
    }

    #[test]
    fn test_digest_file_range() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");

        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        File::create(&path).unwrap().write_all(&data).unwrap();

        let (_, full) = digest_file_range(&path, 100, 300, 128, false).unwrap();
        let expected = format!("{:x}", Sha256::digest(&data[100..400]));
        assert_eq!(full.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_digest_file_range_missing_file() {
        let result = digest_file_range(Path::new("/nonexistent/file.bin"), 0, 10, 8192, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_hasher_single_pass_matches_two_pass() {
        let data: Vec<u8> = (0..64u8).cycle().take(10_000).collect();

        // Single pass with dual accumulation.
        let mut hasher = BlockHasher::new();
        for chunk in data.chunks(512) {
            hasher.update(chunk);
        }
        let (head_single, full_single) = hasher.finalize();

        // Two independent passes.
        let (head_two, _) = digest_range(&mut Cursor::new(data.clone()), 512, true).unwrap();
        let (_, full_two) = digest_range(&mut Cursor::new(data), 512, false).unwrap();

        assert_eq!(head_single, head_two);
        assert_eq!(Some(full_single), full_two);
    }
}
