//! # sealog-wire
//!
//! The two interchangeable wire encodings for protocol messages and
//! records:
//!
//! - **native** — compact binary serialization of the serde derives;
//!   the default on the wire and in the folder transport layout
//! - **structured** — protobuf via hand-annotated prost messages;
//!   selected by content type on the server
//!
//! Every message round-trips identically between the two. Conversions
//! from the structured form validate all 32-byte key/tag widths.

pub mod convert;
pub mod native;
pub mod proto;

pub use convert::{
    from_proto_close, from_proto_commitment, from_proto_open, from_proto_record,
    from_proto_records, to_proto_close, to_proto_commitment, to_proto_open, to_proto_record,
    to_proto_records,
};
pub use native::{decode, encode, NATIVE_EXT};
