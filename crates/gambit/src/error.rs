//! Unified error type for the Gambit server.

use gambit_protocol::ProtocolError;
use gambit_room::RoomError;
use gambit_session::StoreError;
use gambit_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When embedding the `gambit` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GambitError {
    /// A transport-level error (bind, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An external store failure (identity, friendships, messages).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room-level error (not found, full, duplicate code).
    #[error(transparent)]
    Room(#[from] RoomError),
}
