//! Core data types shared by both sides of the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable, opaque identifier for a user.
///
/// Newtype over `u64` so a `UserId` can't be confused with other numeric
/// ids in function signatures. `#[serde(transparent)]` keeps the JSON
/// representation a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A user as resolved by the identity store: stable id plus display name.
///
/// Immutable as far as the orchestrator is concerned; the identity store
/// owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Room code
// ---------------------------------------------------------------------------

/// Alphabet used by [`RoomCode::generate`]. Uppercase + digits, no
/// lookalike exclusions, since codes are copy-pasted rather than read aloud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated room codes.
const CODE_LEN: usize = 8;

/// The external key of a room, e.g. `ABCD1234`.
///
/// Codes are supplied by the client that creates the room; the server
/// never inspects their structure, only their uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Generates a random 8-character alphanumeric code.
    ///
    /// Convenience for clients (or tests) that don't want to invent their
    /// own. Collisions are handled by the room store rejecting duplicate
    /// codes, not by this function.
    pub fn generate() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let code = (0..CODE_LEN)
            .map(|_| {
                CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]
                    as char
            })
            .collect();
        Self(code)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Sides and seats
// ---------------------------------------------------------------------------

/// The two sides of the board.
///
/// Serialized as `"w"` / `"b"`, matching FEN's side-to-move field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Side {
    /// The opposing side.
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Maps a seat index to its side. Seat order is the sole source of
    /// the turn-to-side mapping: first seat plays White.
    pub fn of_seat(index: usize) -> Self {
        if index == 0 { Self::White } else { Self::Black }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
        }
    }
}

/// A seated participant as shown to clients: who they are and which side
/// they play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub id: UserId,
    pub name: String,
    pub side: Side,
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// One entry of a room's append-only transcript.
///
/// Tagged `kind` rather than `type`: these entries ride inside
/// [`crate::ServerEvent`] payloads, and the envelope already claims the
/// `type` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatEntry {
    /// A server-generated notice ("X has joined the room").
    System { content: String },
    /// A message typed by a participant.
    User {
        #[serde(rename = "userId")]
        id: UserId,
        #[serde(rename = "username")]
        name: String,
        content: String,
    },
}

impl ChatEntry {
    /// Shorthand for a system entry.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// The full observable state of a room, pushed as `room-updated`.
///
/// Clients treat this as authoritative and replace whatever they had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub players: Vec<SeatView>,
    pub messages: Vec<ChatEntry>,
    pub game_started: bool,
    /// Seconds until the game starts; present only while counting down.
    pub countdown: Option<u8>,
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// A candidate move as submitted by a client.
///
/// `from`/`to` are square names ("e2", "e4"); `promotion` is the piece
/// letter ("q", "r", "b", "n") when a pawn reaches the last rank. The
/// orchestrator never interprets these; they pass through to the rules
/// engine verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

/// The result of a legal move, broadcast as `move-made`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    /// The move that was applied.
    #[serde(rename = "move")]
    pub mv: MoveRequest,
    /// Resulting position in FEN.
    pub position: String,
    /// Side to move after the move.
    pub turn: Side,
    pub game_over: bool,
    pub check: bool,
    pub checkmate: bool,
    pub draw: bool,
}

// ---------------------------------------------------------------------------
// Conclusions
// ---------------------------------------------------------------------------

/// Why a match ended. Closed set; clients switch on these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameOverReason {
    Checkmate,
    Resign,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

// ---------------------------------------------------------------------------
// Direct (friend) chat
// ---------------------------------------------------------------------------

/// A direct message between two users, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
}

/// A direct message as persisted by the message store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    /// Milliseconds since the Unix epoch, assigned by the store.
    pub timestamp: u64,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire format is consumed by a JavaScript client, so these tests
    //! pin the exact JSON shapes so a serde attribute change can't break
    //! it silently.

    use super::*;

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId(7).to_string(), "U-7");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode::from("ABCD1234")).unwrap();
        assert_eq!(json, "\"ABCD1234\"");
    }

    #[test]
    fn test_room_code_generate_shape() {
        let code = RoomCode::generate();
        assert_eq!(code.as_str().len(), 8);
        assert!(
            code.as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_side_serializes_as_fen_letter() {
        assert_eq!(serde_json::to_string(&Side::White).unwrap(), "\"w\"");
        assert_eq!(serde_json::to_string(&Side::Black).unwrap(), "\"b\"");
    }

    #[test]
    fn test_side_of_seat_mapping() {
        assert_eq!(Side::of_seat(0), Side::White);
        assert_eq!(Side::of_seat(1), Side::Black);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::White.opposite(), Side::Black);
        assert_eq!(Side::Black.opposite(), Side::White);
    }

    #[test]
    fn test_chat_entry_system_json_shape() {
        let entry = ChatEntry::system("Game has started!");
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "system");
        assert_eq!(json["content"], "Game has started!");
    }

    #[test]
    fn test_chat_entry_user_json_shape() {
        let entry = ChatEntry::User {
            id: UserId(3),
            name: "magnus".into(),
            content: "gg".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["userId"], 3);
        assert_eq!(json["username"], "magnus");
    }

    #[test]
    fn test_room_snapshot_uses_camel_case() {
        let snap = RoomSnapshot {
            players: vec![],
            messages: vec![],
            game_started: true,
            countdown: Some(3),
        };
        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["gameStarted"], true);
        assert_eq!(json["countdown"], 3);
    }

    #[test]
    fn test_move_request_promotion_omitted_when_none() {
        let mv = MoveRequest {
            from: "e2".into(),
            to: "e4".into(),
            promotion: None,
        };
        let json: serde_json::Value = serde_json::to_value(&mv).unwrap();
        assert!(json.get("promotion").is_none());
    }

    #[test]
    fn test_move_report_move_field_name() {
        let report = MoveReport {
            mv: MoveRequest {
                from: "e7".into(),
                to: "e8".into(),
                promotion: Some("q".into()),
            },
            position: "4Q3/8/8/8/8/8/8/4K2k b - - 0 1".into(),
            turn: Side::Black,
            game_over: false,
            check: true,
            checkmate: false,
            draw: false,
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["move"]["from"], "e7");
        assert_eq!(json["gameOver"], false);
        assert_eq!(json["turn"], "b");
    }

    #[test]
    fn test_game_over_reason_kebab_case() {
        assert_eq!(
            serde_json::to_string(&GameOverReason::Checkmate).unwrap(),
            "\"checkmate\""
        );
        assert_eq!(
            serde_json::to_string(&GameOverReason::InsufficientMaterial)
                .unwrap(),
            "\"insufficient-material\""
        );
        assert_eq!(
            serde_json::to_string(&GameOverReason::FiftyMoveRule).unwrap(),
            "\"fifty-move-rule\""
        );
    }

    #[test]
    fn test_stored_message_round_trip() {
        let msg = StoredMessage {
            sender_id: UserId(1),
            receiver_id: UserId(2),
            message: "hi".into(),
            timestamp: 1_700_000_000_000,
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: StoredMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }
}
