//! The room store: code -> room actor routing, plus the one-room-per-user
//! rule.
//!
//! Owns a handle per live room and the reverse index from user to room.
//! Actual room behavior lives in the actors; the store only creates,
//! routes, and reaps them.

use std::collections::HashMap;
use std::sync::Arc;

use gambit_countdown::CountdownConfig;
use gambit_protocol::{RoomCode, RoomSnapshot, UserId, UserProfile};
use gambit_session::ClientSender;

use crate::room::{LeaveOutcome, RoomHandle, spawn_room};
use crate::{RoomError, RulesFactory};

/// Command-channel depth per room actor. Two clients cannot plausibly
/// keep 32 commands in flight, so senders never block in practice.
const ROOM_CHANNEL_SIZE: usize = 32;

pub struct RoomStore {
    rooms: HashMap<RoomCode, RoomHandle>,
    /// Reverse index; an entry here means the user holds a seat.
    user_rooms: HashMap<UserId, RoomCode>,
    rules: Arc<dyn RulesFactory>,
    countdown: CountdownConfig,
}

impl RoomStore {
    pub fn new(
        rules: Arc<dyn RulesFactory>,
        countdown: CountdownConfig,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            user_rooms: HashMap::new(),
            rules,
            countdown,
        }
    }

    /// Creates a room under `code` with `creator` seated and returns the
    /// initial snapshot.
    pub async fn create_room(
        &mut self,
        code: RoomCode,
        creator: UserProfile,
        sender: ClientSender,
    ) -> Result<RoomSnapshot, RoomError> {
        if self.rooms.contains_key(&code) {
            return Err(RoomError::Duplicate(code));
        }
        if let Some(current) = self.user_rooms.get(&creator.id) {
            return Err(RoomError::AlreadyInRoom(
                creator.id,
                current.clone(),
            ));
        }

        let creator_id = creator.id;
        let handle = spawn_room(
            code.clone(),
            creator,
            sender,
            Arc::clone(&self.rules),
            self.countdown.clone(),
            ROOM_CHANNEL_SIZE,
        );
        let snapshot = handle.snapshot().await?;

        self.rooms.insert(code.clone(), handle);
        self.user_rooms.insert(creator_id, code);
        Ok(snapshot)
    }

    /// Seats `user` in the room under `code`. Joining the room they are
    /// already seated in re-attaches them instead.
    pub async fn join_room(
        &mut self,
        code: RoomCode,
        user: UserProfile,
        sender: ClientSender,
    ) -> Result<RoomSnapshot, RoomError> {
        if let Some(current) = self.user_rooms.get(&user.id) {
            if *current != code {
                return Err(RoomError::AlreadyInRoom(
                    user.id,
                    current.clone(),
                ));
            }
        }

        let handle = self
            .rooms
            .get(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        let user_id = user.id;
        let snapshot = handle.join(user, sender).await?;
        self.user_rooms.insert(user_id, code);
        Ok(snapshot)
    }

    /// Removes `user` from whatever room they are seated in, reaping the
    /// room if it emptied. Returns the room code if they were seated.
    pub async fn leave_room(&mut self, user: UserId) -> Option<RoomCode> {
        let code = self.user_rooms.remove(&user)?;

        let outcome = match self.rooms.get(&code) {
            Some(handle) => handle.leave(user).await.unwrap_or(
                // Actor already gone; treat as destroyed.
                LeaveOutcome {
                    was_seated: false,
                    destroyed: true,
                },
            ),
            None => return Some(code),
        };

        if outcome.destroyed {
            self.rooms.remove(&code);
            tracing::info!(room = %code, "room reaped");
        }
        Some(code)
    }

    /// The handle for a live room.
    pub fn handle(&self, code: &RoomCode) -> Result<&RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// The room `user` is seated in, if any.
    pub fn room_of(&self, user: UserId) -> Option<&RoomCode> {
        self.user_rooms.get(&user)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
