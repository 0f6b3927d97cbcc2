//! Dual content digest pipeline
//!
//! Every hashed file gets two independent digests (MD5 and SHA-1) computed
//! in a single streaming pass. The pair is the store's content-equality
//! proxy: two entries with the same (md5, sha1) pair are treated as having
//! identical content without re-reading bytes. Using two algorithms keeps
//! the collision risk of either one from producing false duplicate groups.
//!
//! The pipeline never buffers whole files and never seeks; a fixed-size
//! read loop feeds both hashers. A read error aborts the pair - callers
//! record the entry's error flag instead of aborting the traversal.

use md5::{Digest, Md5};
use sha1::Sha1;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for the streaming pass
const READ_BUF_SIZE: usize = 64 * 1024;

/// The two content digests computed for one file in one pass.
///
/// Both digests are always present together: hashing is atomic per file,
/// either the full byte stream was read and both sums are valid, or the
/// read failed and no pair exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestPair {
    /// 128-bit MD5 digest
    pub md5: [u8; 16],

    /// 160-bit SHA-1 digest
    pub sha1: [u8; 20],
}

impl DigestPair {
    /// Hex encoding of the MD5 half
    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5)
    }

    /// Hex encoding of the SHA-1 half
    pub fn sha1_hex(&self) -> String {
        hex::encode(self.sha1)
    }
}

/// Compute the digest pair for a readable byte stream.
///
/// Streams the input through both hashers with a fixed-size buffer.
/// Returns an error if the stream cannot be fully read; in that case no
/// digests exist and the caller must flag the entry instead.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<DigestPair> {
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        md5.update(&buf[..n]);
        sha1.update(&buf[..n]);
    }

    Ok(DigestPair {
        md5: md5.finalize().into(),
        sha1: sha1.finalize().into(),
    })
}

/// Compute the digest pair for a file on disk.
pub fn digest_file(path: &Path) -> io::Result<DigestPair> {
    let file = File::open(path)?;
    digest_reader(file)
}
