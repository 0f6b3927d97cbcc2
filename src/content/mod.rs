//! Content inspection: the dual-digest pipeline.

pub mod digest;

pub use digest::{digest_file, digest_reader, DigestPair};
