//! Wire protocol for Gambit.
//!
//! This crate defines the "language" that clients and the match server
//! speak:
//!
//! - **Types** ([`UserId`], [`RoomCode`], [`Side`], [`RoomSnapshot`],
//!   etc.): the structures that travel on the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): every inbound and
//!   outbound message as a tagged variant with a fixed schema, validated
//!   at the boundary before it reaches orchestration logic.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (user identity). It doesn't know about connections or rooms; it only
//! knows how to serialize and deserialize events.

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, ServerEvent};
pub use types::{
    ChatEntry, DirectMessage, GameOverReason, MoveReport, MoveRequest,
    RoomCode, RoomSnapshot, SeatView, Side, StoredMessage, UserId,
    UserProfile,
};
