//! The protocol driver: a logger wired to a transport.
//!
//! `RemoteLogger` runs the three-phase lifecycle against a trusted
//! authority. Construction performs Init (commitment + open are sent
//! before the value is handed back), appends pass straight through, and
//! `close` drives Closure exactly once no matter how often it is called.

use std::sync::Arc;

use tracing::info;

use sealog_chain::{Logger, Store};
use sealog_types::{CloseMessage, Config, Entry, Result, Tag};

use crate::transport::Transport;

/// A logger that keeps the trusted authority informed automatically.
pub struct RemoteLogger<T: Transport> {
    logger: Logger,
    log_id: String,
    transport: T,
    /// Set once the closure message has been delivered.
    closed: bool,
    /// A closure that was produced but not yet delivered — kept so a
    /// failed `send_closure` can be retried without re-running the close
    /// protocol (the keys are already gone).
    pending_close: Option<CloseMessage>,
}

impl<T: Transport> RemoteLogger<T> {
    /// Create the logger and immediately run Init: the commitment and the
    /// opening message are sent before this returns.
    pub fn new(
        cfg: Config,
        store: Arc<dyn Store>,
        transport: T,
        log_id: impl Into<String>,
    ) -> Result<Self> {
        let log_id = log_id.into();
        let mut logger = Logger::new(cfg, store);

        let (commit, open) = logger.init_protocol(&log_id)?;
        transport.send_commitment(&commit)?;
        transport.send_open(&open)?;

        info!(log_id = %log_id, "remote logger initialized");

        Ok(Self {
            logger,
            log_id,
            transport,
            closed: false,
            pending_close: None,
        })
    }

    /// Append a message at `ts` (unix nanoseconds).
    pub fn append(&mut self, msg: &[u8], ts: i64) -> Result<Entry> {
        self.logger.append(msg, ts)
    }

    /// Current tail state of the underlying logger.
    pub fn last_state(&self) -> (u64, Tag, Tag) {
        self.logger.last_state()
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    /// Run Closure and deliver the close message.
    ///
    /// Idempotent: after a successful delivery this is a no-op, and a
    /// second `CloseMessage` is never sent. If delivery fails, the
    /// produced message is retained and retried on the next call.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        if self.pending_close.is_none() {
            self.pending_close = Some(self.logger.close_protocol(&self.log_id)?);
        }

        let close = self
            .pending_close
            .as_ref()
            .expect("pending closure was just produced");
        self.transport.send_closure(close)?;

        self.closed = true;
        info!(log_id = %self.log_id, "closure delivered");
        Ok(())
    }
}
