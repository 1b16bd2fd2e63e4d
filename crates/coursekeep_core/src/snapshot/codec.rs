//! Snapshot encoding.
//!
//! # Responsibility
//! - Convert a `Snapshot` to and from the gzip-compressed backup blob.
//! - Provide the plain (pretty JSON) encoding used by exports and imports.
//!
//! # Invariants
//! - `decode(encode(s)) == s` for every snapshot, including entity field order.
//! - Any decompression or parse failure surfaces as `CodecError::Corrupt`.

use crate::model::snapshot::Snapshot;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Read, Write};

pub type CodecResult<T> = Result<T, CodecError>;

/// Error for snapshot encode/decode.
#[derive(Debug)]
pub enum CodecError {
    /// Compression stream failed while encoding.
    Compression(io::Error),
    /// Snapshot could not be serialized to JSON.
    Serialization(serde_json::Error),
    /// Blob is not a valid compressed snapshot.
    Corrupt(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compression(err) => write!(f, "snapshot compression failed: {err}"),
            Self::Serialization(err) => write!(f, "snapshot serialization failed: {err}"),
            Self::Corrupt(details) => write!(f, "corrupt snapshot: {details}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Compression(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Corrupt(_) => None,
        }
    }
}

/// Serializes and gzip-compresses a snapshot.
pub fn encode(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    let json = encode_plain(snapshot)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(CodecError::Compression)?;
    encoder.finish().map_err(CodecError::Compression)
}

/// Decompresses and parses a snapshot blob.
pub fn decode(bytes: &[u8]) -> CodecResult<Snapshot> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|err| CodecError::Corrupt(format!("decompression failed: {err}")))?;
    decode_plain(&json)
}

/// Serializes a snapshot as pretty-printed, uncompressed JSON.
pub fn encode_plain(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    serde_json::to_vec_pretty(snapshot).map_err(CodecError::Serialization)
}

/// Parses an uncompressed JSON snapshot.
///
/// The top level must be an object whose values are arrays of objects.
pub fn decode_plain(bytes: &[u8]) -> CodecResult<Snapshot> {
    serde_json::from_slice(bytes).map_err(|err| CodecError::Corrupt(format!("invalid snapshot json: {err}")))
}
