//! The structured (protobuf) wire encoding.
//!
//! Message definitions are hand-annotated prost structs — equivalent to
//! compiling this schema, without a protoc step in the build:
//!
//! ```proto
//! message InitCommitment {
//!   string log_id      = 1;
//!   int64  start_time  = 2;  // unix nanoseconds
//!   bytes  key_a0      = 3;
//!   bytes  key_b0      = 4;
//!   uint64 update_freq = 5;
//! }
//! message OpenMessage  { string log_id = 1; int64 open_time = 2;
//!                        uint64 first_index = 3; bytes first_tag_v = 4;
//!                        bytes first_tag_t = 5; }
//! message CloseMessage { string log_id = 1; int64 close_time = 2;
//!                        uint64 final_index = 3; bytes final_tag_v = 4;
//!                        bytes final_tag_t = 5; }
//! message Record       { uint64 index = 1; int64 ts = 2; bytes msg = 3;
//!                        bytes tag_v = 4; bytes tag_t = 5; }
//! message VerifyRequest  { string log_id = 1; repeated Record records = 2; }
//! message VerifyResponse { bool verified = 1; string error_message = 2; }
//! ```
//!
//! All `bytes` fields holding keys or tags must be exactly 32 bytes;
//! length is validated during conversion in [`crate::convert`], not here.

#[derive(Clone, PartialEq, prost::Message)]
pub struct InitCommitment {
    #[prost(string, tag = "1")]
    pub log_id: String,
    /// Unix nanoseconds.
    #[prost(int64, tag = "2")]
    pub start_time: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub key_a0: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub key_b0: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub update_freq: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OpenMessage {
    #[prost(string, tag = "1")]
    pub log_id: String,
    /// Unix nanoseconds.
    #[prost(int64, tag = "2")]
    pub open_time: i64,
    #[prost(uint64, tag = "3")]
    pub first_index: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub first_tag_v: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub first_tag_t: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CloseMessage {
    #[prost(string, tag = "1")]
    pub log_id: String,
    /// Unix nanoseconds.
    #[prost(int64, tag = "2")]
    pub close_time: i64,
    #[prost(uint64, tag = "3")]
    pub final_index: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub final_tag_v: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub final_tag_t: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Record {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    /// Unix nanoseconds.
    #[prost(int64, tag = "2")]
    pub ts: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub msg: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub tag_v: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub tag_t: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VerifyRequest {
    #[prost(string, tag = "1")]
    pub log_id: String,
    #[prost(message, repeated, tag = "2")]
    pub records: Vec<Record>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VerifyResponse {
    #[prost(bool, tag = "1")]
    pub verified: bool,
    #[prost(string, tag = "2")]
    pub error_message: String,
}
