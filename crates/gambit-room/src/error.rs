use gambit_protocol::{RoomCode, UserId};

/// Errors that can occur in the room layer.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room exists under the given code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// A room with this code already exists.
    #[error("room {0} already exists")]
    Duplicate(RoomCode),

    /// The user is already seated in a different room.
    #[error("user {0} is already in room {1}")]
    AlreadyInRoom(UserId, RoomCode),

    /// The room actor's channel is gone (actor stopped).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
