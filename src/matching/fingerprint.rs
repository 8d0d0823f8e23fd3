//! Partial-file content fingerprint
//!
//! SHA-1 over three 20 KiB slices (head, one third in, tail) of a media file.
//! The layout must match the Thunder oracle's `cid` byte for byte. Files whose
//! sampled slices are identical collide; that is accepted for speed.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::models::Fingerprint;

/// Size of each sampled slice
pub const CHUNK: u64 = 0x5000;
/// Total sampled bytes; smaller files are hashed whole
pub const TOTAL: u64 = 0xf000;

/// Compute the content fingerprint of a local file
///
/// Blocking. Async callers should run it on the blocking pool.
pub fn fingerprint(path: impl AsRef<Path>) -> std::io::Result<Fingerprint> {
    let mut file = File::open(path.as_ref())?;
    let size = file.metadata()?.len();

    let mut hasher = Sha1::new();

    if size < TOTAL {
        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)?;
        hasher.update(&buf);
    } else {
        let mut buf = vec![0u8; TOTAL as usize];
        let chunk = CHUNK as usize;
        let offsets = [0, size / 3, size - CHUNK];

        for (i, offset) in offsets.into_iter().enumerate() {
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf[i * chunk..(i + 1) * chunk])?;
        }
        hasher.update(&buf);
    }

    Ok(Fingerprint::from_digest(&hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = fingerprint("/definitely/not/here.mkv").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(CHUNK, 20480);
        assert_eq!(TOTAL, 61440);
        assert_eq!(CHUNK * 3, TOTAL);
    }
}
