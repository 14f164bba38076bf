//! Request handlers: decode by content type, drive the authority,
//! answer in the caller's encoding.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use prost::Message;
use serde_json::json;
use tracing::{debug, warn};

use sealog_types::{CloseMessage, Error, InitCommitment, OpenMessage, Record};
use sealog_wire::proto;

use crate::AppState;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Content negotiation: protobuf when the content type says so, native
/// otherwise.
fn is_protobuf(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.starts_with("application/x-protobuf") || ct.starts_with("application/protobuf")
        })
        .unwrap_or(false)
}

fn bad_request(e: Error) -> Response {
    warn!(error = %e, "request rejected");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}

fn internal_error(reason: &str) -> Response {
    warn!(reason, "internal failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal failure" })),
    )
        .into_response()
}

fn decode_commitment(headers: &HeaderMap, body: &Bytes) -> Result<InitCommitment, Error> {
    if is_protobuf(headers) {
        let p = proto::InitCommitment::decode(&body[..]).map_err(|e| Error::Decode {
            reason: format!("protobuf commitment: {e}"),
        })?;
        sealog_wire::from_proto_commitment(&p)
    } else {
        sealog_wire::decode(body)
    }
}

fn decode_open(headers: &HeaderMap, body: &Bytes) -> Result<OpenMessage, Error> {
    if is_protobuf(headers) {
        let p = proto::OpenMessage::decode(&body[..]).map_err(|e| Error::Decode {
            reason: format!("protobuf open message: {e}"),
        })?;
        sealog_wire::from_proto_open(&p)
    } else {
        sealog_wire::decode(body)
    }
}

fn decode_close(headers: &HeaderMap, body: &Bytes) -> Result<CloseMessage, Error> {
    if is_protobuf(headers) {
        let p = proto::CloseMessage::decode(&body[..]).map_err(|e| Error::Decode {
            reason: format!("protobuf close message: {e}"),
        })?;
        sealog_wire::from_proto_close(&p)
    } else {
        sealog_wire::decode(body)
    }
}

/// `POST /api/v1/logs/register` — store the initial commitment.
pub async fn register_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let commit = match decode_commitment(&headers, &body) {
        Ok(c) => c,
        Err(e) => return bad_request(e),
    };

    let log_id = commit.log_id.clone();
    let Ok(mut authority) = state.authority.write() else {
        return internal_error("authority lock poisoned");
    };
    authority.register_log(commit);

    (
        StatusCode::OK,
        Json(json!({ "status": "registered", "log_id": log_id })),
    )
        .into_response()
}

/// `POST /api/v1/logs/open` — store the opening message.
pub async fn open_log(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let open = match decode_open(&headers, &body) {
        Ok(o) => o,
        Err(e) => return bad_request(e),
    };

    let log_id = open.log_id.clone();
    let Ok(mut authority) = state.authority.write() else {
        return internal_error("authority lock poisoned");
    };
    authority.register_open(open);

    (
        StatusCode::OK,
        Json(json!({ "status": "opened", "log_id": log_id })),
    )
        .into_response()
}

/// `POST /api/v1/logs/close` — store a closure. Unknown logs are a 400.
pub async fn close_log(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let close = match decode_close(&headers, &body) {
        Ok(c) => c,
        Err(e) => return bad_request(e),
    };

    let log_id = close.log_id.clone();
    let Ok(mut authority) = state.authority.write() else {
        return internal_error("authority lock poisoned");
    };
    if let Err(e) = authority.accept_closure(close) {
        return bad_request(e);
    }

    (
        StatusCode::OK,
        Json(json!({ "status": "closed", "log_id": log_id })),
    )
        .into_response()
}

/// `POST /api/v1/logs/{log_id}/verify` — run final verification over the
/// submitted records.
///
/// Always answers 200: the verdict is the payload, not the status code.
/// The protobuf request form carries its own log id, which takes
/// precedence over the path segment, matching the client transport.
pub async fn verify_log(
    State(state): State<AppState>,
    Path(path_log_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let protobuf = is_protobuf(&headers);

    let (log_id, records): (String, Vec<Record>) = if protobuf {
        let req = match proto::VerifyRequest::decode(&body[..]) {
            Ok(r) => r,
            Err(e) => {
                return bad_request(Error::Decode {
                    reason: format!("protobuf verify request: {e}"),
                })
            }
        };
        match sealog_wire::from_proto_records(&req.records) {
            Ok(records) => (req.log_id, records),
            Err(e) => return bad_request(e),
        }
    } else {
        match sealog_wire::decode::<Vec<Record>>(&body) {
            Ok(records) => (path_log_id, records),
            Err(e) => return bad_request(e),
        }
    };

    let Ok(authority) = state.authority.read() else {
        return internal_error("authority lock poisoned");
    };
    let outcome = authority.final_verify(&log_id, &records);
    drop(authority);

    let (verified, error_message) = match outcome {
        Ok(()) => (true, String::new()),
        Err(e) => (false, e.to_string()),
    };
    debug!(log_id = %log_id, verified, "verification verdict delivered");

    if protobuf {
        let payload = proto::VerifyResponse {
            verified,
            error_message,
        }
        .encode_to_vec();
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)],
            payload,
        )
            .into_response()
    } else {
        let mut payload = json!({ "log_id": log_id, "verified": verified });
        if !error_message.is_empty() {
            payload["error_message"] = json!(error_message);
        }
        (StatusCode::OK, Json(payload)).into_response()
    }
}
