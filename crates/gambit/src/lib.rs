//! # Gambit
//!
//! Server-side orchestration for two-player chess matches: rooms,
//! seating, the pre-match countdown, turn arbitration, rematch
//! negotiation, room chat, and friend presence.
//!
//! The server owns no chess knowledge and no user data. Move legality
//! comes from a [`RulesEngine`] plugged in through a [`RulesFactory`];
//! identities, friendships, and direct-message persistence come from
//! the [`IdentityStore`], [`RelationshipStore`], and [`MessageStore`]
//! seams the embedding application implements.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gambit::prelude::*;
//!
//! // Implement the store traits and a rules factory, then:
//! // let server = GambitServer::builder()
//! //     .bind("0.0.0.0:8080")
//! //     .build(identity, relationships, messages, rules)
//! //     .await?;
//! // server.run().await
//! ```

mod error;
mod handler;
mod server;

pub use error::GambitError;
pub use server::{GambitServer, GambitServerBuilder};

pub use gambit_countdown::{Countdown, CountdownConfig};
pub use gambit_protocol::{
    ChatEntry, ClientEvent, Codec, DirectMessage, GameOverReason,
    JsonCodec, MoveReport, MoveRequest, ProtocolError, RoomCode,
    RoomSnapshot, SeatView, ServerEvent, Side, StoredMessage, UserId,
    UserProfile,
};
pub use gambit_room::{
    DrawKind, GameStatus, IllegalMove, MoveOutcome, RoomError,
    RoomLifecycle, RulesEngine, RulesFactory, START_POSITION,
};
pub use gambit_session::{
    IdentityStore, MessageStore, RelationshipStore, StoreError,
};
pub use gambit_transport::TransportError;

/// One-stop imports for embedding applications.
pub mod prelude {
    pub use crate::{
        ChatEntry, ClientEvent, CountdownConfig, DirectMessage,
        DrawKind, GambitError, GambitServer, GameOverReason, GameStatus,
        IdentityStore, IllegalMove, MessageStore, MoveOutcome,
        MoveRequest, RelationshipStore, RoomCode, RoomSnapshot,
        RulesEngine, RulesFactory, ServerEvent, Side, StoreError,
        StoredMessage, UserId, UserProfile,
    };
}
