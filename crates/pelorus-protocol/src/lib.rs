//! # pelorus-protocol
//!
//! Wire message types and the two stateless decoders that normalize the
//! server's delta stream and full-tree snapshots into the canonical
//! update representation of `pelorus-core`.

pub mod codec;
pub mod delta;
pub mod full;
pub mod messages;

pub use codec::{parse_delta, parse_full, DecodeError};
pub use delta::{decode_delta, DecodedBatch, UNKNOWN_SOURCE};
pub use full::{decode_full, NO_SOURCE};
pub use messages::*;
