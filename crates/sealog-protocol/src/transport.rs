//! Delivery of protocol messages to the trusted authority.
//!
//! `Transport` is the seam between the protocol driver and wherever the
//! authority actually lives: the same process, an HTTP endpoint, or a
//! shared directory (see [`crate::folder`]).

use std::sync::{Arc, Mutex};

use prost::Message;
use tracing::warn;

use sealog_types::{CloseMessage, Error, InitCommitment, OpenMessage, Record, Result};
use sealog_wire::proto;

use crate::authority::TrustedAuthority;

/// How data reaches the trusted authority.
pub trait Transport {
    /// Deliver the initial log commitment.
    fn send_commitment(&self, commit: &InitCommitment) -> Result<()>;

    /// Deliver the opening message.
    fn send_open(&self, open: &OpenMessage) -> Result<()>;

    /// Deliver the closure notification.
    fn send_closure(&self, close: &CloseMessage) -> Result<()>;

    /// Submit the complete record sequence for final verification.
    ///
    /// Returns the verification *outcome* — `Ok(false)` is a delivered
    /// negative verdict, not a transport failure.
    fn send_log(&self, log_id: &str, records: &[Record]) -> Result<bool>;
}

/// In-process transport: the authority lives behind a shared handle in
/// the same process. Used by tests and single-machine deployments where
/// U and T are co-located.
pub struct LocalTransport {
    authority: Arc<Mutex<TrustedAuthority>>,
}

impl LocalTransport {
    pub fn new(authority: Arc<Mutex<TrustedAuthority>>) -> Self {
        Self { authority }
    }
}

impl Transport for LocalTransport {
    fn send_commitment(&self, commit: &InitCommitment) -> Result<()> {
        let mut authority = self.authority.lock().expect("authority lock poisoned");
        authority.register_log(commit.clone());
        Ok(())
    }

    fn send_open(&self, open: &OpenMessage) -> Result<()> {
        let mut authority = self.authority.lock().expect("authority lock poisoned");
        authority.register_open(open.clone());
        Ok(())
    }

    fn send_closure(&self, close: &CloseMessage) -> Result<()> {
        let mut authority = self.authority.lock().expect("authority lock poisoned");
        authority.accept_closure(close.clone())
    }

    fn send_log(&self, log_id: &str, records: &[Record]) -> Result<bool> {
        let authority = self.authority.lock().expect("authority lock poisoned");
        match authority.final_verify(log_id, records) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(log_id, error = %e, "final verification rejected");
                Ok(false)
            }
        }
    }
}

/// Which wire encoding an HTTP transport puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// The native stream encoding, sent as `application/octet-stream`.
    Native,
    /// Protobuf, sent as `application/x-protobuf`.
    Protobuf,
}

/// HTTP client transport for a remote authority serving the
/// `/api/v1/logs/...` endpoints.
pub struct HttpTransport {
    base_url: String,
    format: WireFormat,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// `base_url` without a trailing slash, e.g. `https://trust.example.com`.
    pub fn new(base_url: impl Into<String>, format: WireFormat) -> Self {
        Self {
            base_url: base_url.into(),
            format,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn content_type(&self) -> &'static str {
        match self.format {
            WireFormat::Native => "application/octet-stream",
            WireFormat::Protobuf => "application/x-protobuf",
        }
    }

    fn post(&self, path: &str, body: Vec<u8>) -> Result<reqwest::blocking::Response> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", self.content_type())
            .body(body)
            .send()
            .map_err(|e| Error::Transport {
                reason: format!("post {path}: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Transport {
                reason: format!("server returned {status}: {text}"),
            });
        }
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn send_commitment(&self, commit: &InitCommitment) -> Result<()> {
        let body = match self.format {
            WireFormat::Native => sealog_wire::encode(commit)?,
            WireFormat::Protobuf => sealog_wire::to_proto_commitment(commit).encode_to_vec(),
        };
        self.post("/api/v1/logs/register", body)?;
        Ok(())
    }

    fn send_open(&self, open: &OpenMessage) -> Result<()> {
        let body = match self.format {
            WireFormat::Native => sealog_wire::encode(open)?,
            WireFormat::Protobuf => sealog_wire::to_proto_open(open).encode_to_vec(),
        };
        self.post("/api/v1/logs/open", body)?;
        Ok(())
    }

    fn send_closure(&self, close: &CloseMessage) -> Result<()> {
        let body = match self.format {
            WireFormat::Native => sealog_wire::encode(close)?,
            WireFormat::Protobuf => sealog_wire::to_proto_close(close).encode_to_vec(),
        };
        self.post("/api/v1/logs/close", body)?;
        Ok(())
    }

    fn send_log(&self, log_id: &str, records: &[Record]) -> Result<bool> {
        let body = match self.format {
            WireFormat::Native => sealog_wire::encode(&records.to_vec())?,
            WireFormat::Protobuf => proto::VerifyRequest {
                log_id: log_id.to_string(),
                records: sealog_wire::to_proto_records(records),
            }
            .encode_to_vec(),
        };

        let response = self.post(&format!("/api/v1/logs/{log_id}/verify"), body)?;

        match self.format {
            WireFormat::Native => {
                let payload: serde_json::Value =
                    response.json().map_err(|e| Error::Decode {
                        reason: format!("verify response: {e}"),
                    })?;
                Ok(payload["verified"].as_bool().unwrap_or(false))
            }
            WireFormat::Protobuf => {
                let bytes = response.bytes().map_err(|e| Error::Transport {
                    reason: format!("read verify response: {e}"),
                })?;
                let decoded =
                    proto::VerifyResponse::decode(&bytes[..]).map_err(|e| Error::Decode {
                        reason: format!("verify response: {e}"),
                    })?;
                Ok(decoded.verified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn shared_authority() -> Arc<Mutex<TrustedAuthority>> {
        Arc::new(Mutex::new(TrustedAuthority::new()))
    }

    #[test]
    fn local_transport_registers_with_authority() {
        let authority = shared_authority();
        let transport = LocalTransport::new(authority.clone());

        transport
            .send_commitment(&InitCommitment {
                log_id: "log-x".to_string(),
                start_time: Utc::now(),
                key_a0: [0; 32],
                key_b0: [1; 32],
                update_freq: 1,
            })
            .unwrap();

        // The closure for the now-known log is accepted.
        transport
            .send_closure(&CloseMessage {
                log_id: "log-x".to_string(),
                close_time: Utc::now(),
                final_index: 1,
                final_tag_v: [0; 32],
                final_tag_t: [0; 32],
            })
            .unwrap();
    }

    #[test]
    fn local_transport_closure_unknown_log_errors() {
        let transport = LocalTransport::new(shared_authority());
        let err = transport
            .send_closure(&CloseMessage {
                log_id: "ghost".to_string(),
                close_time: Utc::now(),
                final_index: 1,
                final_tag_v: [0; 32],
                final_tag_t: [0; 32],
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnknownLog { .. }));
    }

    #[test]
    fn local_transport_verify_outcome_is_not_an_error() {
        let transport = LocalTransport::new(shared_authority());
        // Unregistered log: the verdict is "not verified", delivered as a
        // value rather than a transport failure.
        let verified = transport.send_log("ghost", &[]).unwrap();
        assert!(!verified);
    }
}
