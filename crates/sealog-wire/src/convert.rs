//! Conversions between the domain types and their protobuf counterparts.
//!
//! The protobuf layer carries keys and tags as free-length `bytes`; every
//! conversion back into domain types validates the 32-byte width and
//! fails with `Error::Decode` on anything else.

use chrono::{DateTime, TimeZone, Utc};

use sealog_types::{
    CloseMessage, Error, InitCommitment, Key, OpenMessage, Record, Result, Tag, KEY_SIZE,
};

use crate::proto;

/// Convert a `DateTime<Utc>` to the wire representation (unix nanos).
///
/// # Panics
///
/// Panics for times outside roughly 1677–2262, which cannot be produced
/// by the protocol driver's wall clock.
fn to_nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt()
        .expect("protocol timestamps fit in i64 nanoseconds")
}

fn from_nanos(ns: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(ns)
}

fn tag32(bytes: &[u8], field: &str) -> Result<Tag> {
    bytes.try_into().map_err(|_| Error::Decode {
        reason: format!("invalid {field} size: expected 32, got {}", bytes.len()),
    })
}

fn key32(bytes: &[u8], field: &str) -> Result<Key> {
    bytes.try_into().map_err(|_| Error::Decode {
        reason: format!(
            "invalid {field} size: expected {KEY_SIZE}, got {}",
            bytes.len()
        ),
    })
}

pub fn to_proto_commitment(c: &InitCommitment) -> proto::InitCommitment {
    proto::InitCommitment {
        log_id: c.log_id.clone(),
        start_time: to_nanos(c.start_time),
        key_a0: c.key_a0.to_vec(),
        key_b0: c.key_b0.to_vec(),
        update_freq: c.update_freq,
    }
}

pub fn from_proto_commitment(p: &proto::InitCommitment) -> Result<InitCommitment> {
    Ok(InitCommitment {
        log_id: p.log_id.clone(),
        start_time: from_nanos(p.start_time),
        key_a0: key32(&p.key_a0, "key_a0")?,
        key_b0: key32(&p.key_b0, "key_b0")?,
        update_freq: p.update_freq,
    })
}

pub fn to_proto_open(o: &OpenMessage) -> proto::OpenMessage {
    proto::OpenMessage {
        log_id: o.log_id.clone(),
        open_time: to_nanos(o.open_time),
        first_index: o.first_index,
        first_tag_v: o.first_tag_v.to_vec(),
        first_tag_t: o.first_tag_t.to_vec(),
    }
}

pub fn from_proto_open(p: &proto::OpenMessage) -> Result<OpenMessage> {
    Ok(OpenMessage {
        log_id: p.log_id.clone(),
        open_time: from_nanos(p.open_time),
        first_index: p.first_index,
        first_tag_v: tag32(&p.first_tag_v, "first_tag_v")?,
        first_tag_t: tag32(&p.first_tag_t, "first_tag_t")?,
    })
}

pub fn to_proto_close(c: &CloseMessage) -> proto::CloseMessage {
    proto::CloseMessage {
        log_id: c.log_id.clone(),
        close_time: to_nanos(c.close_time),
        final_index: c.final_index,
        final_tag_v: c.final_tag_v.to_vec(),
        final_tag_t: c.final_tag_t.to_vec(),
    }
}

pub fn from_proto_close(p: &proto::CloseMessage) -> Result<CloseMessage> {
    Ok(CloseMessage {
        log_id: p.log_id.clone(),
        close_time: from_nanos(p.close_time),
        final_index: p.final_index,
        final_tag_v: tag32(&p.final_tag_v, "final_tag_v")?,
        final_tag_t: tag32(&p.final_tag_t, "final_tag_t")?,
    })
}

pub fn to_proto_record(r: &Record) -> proto::Record {
    proto::Record {
        index: r.index,
        ts: r.ts,
        msg: r.msg.clone(),
        tag_v: r.tag_v.to_vec(),
        tag_t: r.tag_t.to_vec(),
    }
}

pub fn from_proto_record(p: &proto::Record) -> Result<Record> {
    Ok(Record {
        index: p.index,
        ts: p.ts,
        msg: p.msg.clone(),
        tag_v: tag32(&p.tag_v, "tag_v")?,
        tag_t: tag32(&p.tag_t, "tag_t")?,
    })
}

pub fn to_proto_records(records: &[Record]) -> Vec<proto::Record> {
    records.iter().map(to_proto_record).collect()
}

pub fn from_proto_records(records: &[proto::Record]) -> Result<Vec<Record>> {
    records
        .iter()
        .enumerate()
        .map(|(i, p)| {
            from_proto_record(p).map_err(|e| Error::Decode {
                reason: format!("record {i}: {e}"),
            })
        })
        .collect()
}
