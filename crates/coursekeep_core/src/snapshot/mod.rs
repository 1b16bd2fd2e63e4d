//! Snapshot serialization.
//!
//! # See also
//! - `backup::store` for where encoded snapshots are written.

pub mod codec;

pub use codec::{decode, decode_plain, encode, encode_plain, CodecError, CodecResult};
