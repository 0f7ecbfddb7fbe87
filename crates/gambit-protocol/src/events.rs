//! The event taxonomy: every message either side can send, as a tagged
//! enum with a fixed schema per kind.
//!
//! Decoding happens once at the connection boundary; orchestration logic
//! only ever sees these variants, never raw payloads. An event that fails
//! to decode is dropped there and cannot reach a room.

use serde::{Deserialize, Serialize};

use crate::types::{
    ChatEntry, GameOverReason, MoveReport, RoomCode, RoomSnapshot,
    SeatView, StoredMessage, UserId,
};

/// Events sent from a client to the server.
///
/// Internally tagged: `{ "type": "join-room", "roomCode": "ABCD1234" }`.
/// Variant names are kebab-case, field names camelCase, matching the
/// browser client's conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Binds this connection to a user identity. Must precede every
    /// other event; anything sent before authentication is ignored.
    #[serde(rename_all = "camelCase")]
    Authenticate { user_id: UserId },

    #[serde(rename_all = "camelCase")]
    CreateRoom { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    JoinRoom { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    MakeMove {
        room_code: RoomCode,
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ResignGame { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    RequestRematch { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    AcceptRematch { room_code: RoomCode },

    #[serde(rename_all = "camelCase")]
    DeclineRematch { room_code: RoomCode },

    /// Room-scoped chat. The room is implied by the sender's seating.
    MatchMessage { text: String },

    /// Direct chat to another user, persisted by the message store.
    #[serde(rename_all = "camelCase")]
    FriendMessage {
        receiver_id: UserId,
        message: String,
    },

    /// Requests the persisted direct-chat history with one friend.
    #[serde(rename_all = "camelCase")]
    ChatHistory { friend_id: UserId },
}

/// Events pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Reply to the creator of a fresh room.
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_code: RoomCode,
        messages: Vec<ChatEntry>,
    },

    /// Full room snapshot; sent on join, countdown ticks, and any roster
    /// or lifecycle change.
    RoomUpdated(RoomSnapshot),

    /// A transcript entry appended by a participant.
    NewMatchMessage(ChatEntry),

    /// Board updated. Terminal positions additionally produce a
    /// [`ServerEvent::GameOver`] so clients can tell "board changed"
    /// from "match over".
    MoveMade(MoveReport),

    GameOver {
        /// The winner's display name, or `None` for a draw.
        winner: Option<String>,
        reason: GameOverReason,
    },

    RematchRequested,
    RematchAccepted,
    RematchDeclined,

    /// A fresh match after an accepted rematch: new start position,
    /// seats swapped.
    GameRematch {
        position: String,
        players: Vec<SeatView>,
    },

    /// Room-level failure surfaced to the originator only
    /// (room not found / room full / duplicate code).
    RoomError { message: String },

    /// Presence change for one of the recipient's accepted friends.
    #[serde(rename_all = "camelCase")]
    FriendStatus { friend_id: UserId, online: bool },

    /// A direct message relayed to its online recipient.
    #[serde(rename_all = "camelCase")]
    FriendMessage {
        sender_id: UserId,
        message: String,
        timestamp: u64,
    },

    /// Delivery acknowledgment for a direct message, sent to the
    /// originator only. `success: false` carries a reason.
    MessageSent {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Reply to a chat-history request.
    ChatHistory { messages: Vec<StoredMessage> },
}

// =========================================================================
// Tests
// =========================================================================
