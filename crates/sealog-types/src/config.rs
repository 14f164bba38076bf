//! Logger configuration.

use crate::record::Key;

/// Controls logger behavior.
///
/// The optional seeds exist for tests and HSM-backed deployments; when
/// absent the logger draws both from the operating system RNG.
#[derive(Clone, Default)]
pub struct Config {
    /// Publish an anchor every N entries. 0 disables anchors.
    pub anchor_every: u64,

    /// Fixed `A_0` for the auditor chain.
    pub initial_key_v: Option<Key>,

    /// Fixed `B_0` for the trusted chain.
    pub initial_key_t: Option<Key>,
}

impl std::fmt::Debug for Config {
    /// Seeds are key material — the debug form only reports their presence.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("anchor_every", &self.anchor_every)
            .field("initial_key_v", &self.initial_key_v.map(|_| "<seed>"))
            .field("initial_key_t", &self.initial_key_t.map(|_| "<seed>"))
            .finish()
    }
}
