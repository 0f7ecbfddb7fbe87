//! Room layer for Gambit: match session actors and their store.
//!
//! A room hosts one two-player chess session at a time: seating, the
//! pre-match countdown, turn arbitration against a pluggable rules
//! engine, room-scoped chat, and rematch negotiation. Each room is a
//! Tokio actor owning all of its state; [`RoomStore`] routes commands
//! to it by room code and enforces that a user occupies at most one
//! room.

mod error;
mod lifecycle;
mod room;
mod rules;
mod store;

pub use error::RoomError;
pub use lifecycle::{RematchState, RoomLifecycle};
pub use room::{LeaveOutcome, RoomHandle};
pub use rules::{
    DrawKind, GameStatus, IllegalMove, MoveOutcome, RulesEngine,
    RulesFactory, START_POSITION,
};
pub use store::RoomStore;
