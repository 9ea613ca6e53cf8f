pub mod compare;

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

pub use compare::{compare_contents, Comparison, Stage};

pub const PARTIAL_HASH_LENGTH: usize = 1024 * 1024; // 1MiB

const READ_BUFFER_LENGTH: usize = 64 * 1024;

/// XxHash64 of the first `PARTIAL_HASH_LENGTH` bytes (or the whole file if shorter).
pub fn partial_hash(file: &Path) -> io::Result<u64> {
    let data = read_portion(file)?;
    Ok(hash_data(&data))
}

/// BLAKE3 over the whole file, read in fixed-size chunks.
pub fn full_hash(file: &Path) -> io::Result<blake3::Hash> {
    let mut f = File::open(file)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; READ_BUFFER_LENGTH];
    loop {
        let bytes_read = f.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize())
}

fn read_portion(file: &Path) -> io::Result<Vec<u8>> {
    let f = File::open(file)?;
    let mut buffer = Vec::with_capacity(PARTIAL_HASH_LENGTH);
    f.take(PARTIAL_HASH_LENGTH as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_partial_hash_only_reads_prefix() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("b.bin");

        let mut content = vec![7u8; PARTIAL_HASH_LENGTH];
        fs::write(&a, &content).unwrap();
        content.extend_from_slice(b"tail");
        fs::write(&b, &content).unwrap();

        assert_eq!(partial_hash(&a).unwrap(), partial_hash(&b).unwrap());
        assert_ne!(full_hash(&a).unwrap(), full_hash(&b).unwrap());
    }

    #[test]
    fn test_full_hash_matches_one_shot_hash() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("episode.mkv");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&file, &content).unwrap();

        assert_eq!(full_hash(&file).unwrap(), blake3::hash(&content));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(partial_hash(&tmp.path().join("nope.mkv")).is_err());
    }
}
