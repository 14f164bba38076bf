//! # sealog-protocol
//!
//! The three-phase lifecycle between the logger (U) and the trusted
//! authority (T), and the transports that carry it:
//!
//! 1. **Init** — U commits `(A_0, B_0)` to T and appends the `START`
//!    entry; T receives the commitment and the opening attestation.
//! 2. **Append** — U logs freely; anchors let offline auditors resume.
//! 3. **Close** — U appends `CLOSE`, destroys its keys, and sends the
//!    closure attestation; T can now render the final, unforgeable
//!    verdict over the full record sequence.

pub mod authority;
pub mod folder;
pub mod remote;
pub mod transport;

pub use authority::{verify_closure, TrustedAuthority};
pub use folder::FolderTransport;
pub use remote::RemoteLogger;
pub use transport::{HttpTransport, LocalTransport, Transport, WireFormat};
