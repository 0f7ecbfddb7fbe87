//! Per-connection handler: authentication, event routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler, plus a writer task pumping outbound events through the
//! codec. The flow is:
//!   1. Loop: receive frames, decode `ClientEvent`s
//!   2. `authenticate` binds the connection to a verified identity
//!   3. Every later event is routed to the room store or the friend
//!      stores
//!   4. On disconnect: unbind, vacate the seat, tell friends

use std::sync::Arc;

use gambit_protocol::{
    ClientEvent, Codec, DirectMessage, MoveRequest, ServerEvent,
    UserProfile,
};
use gambit_room::RoomError;
use gambit_session::{
    ClientSender, IdentityStore, MessageStore, RelationshipStore,
    broadcast_presence,
};
use gambit_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::GambitError;
use crate::server::ServerState;

/// Most direct-chat history a single request returns.
const HISTORY_LIMIT: usize = 50;

/// Drop guard that cleans up an authenticated connection when the
/// handler exits, including on panic. `Drop` is synchronous, so the
/// async cleanup runs in a fire-and-forget task.
struct DisconnectGuard<I, R, M>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    user: UserProfile,
    conn_id: ConnectionId,
    state: Arc<ServerState<I, R, M>>,
}

impl<I, R, M> Drop for DisconnectGuard<I, R, M>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    fn drop(&mut self) {
        let user_id = self.user.id;
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // A connection superseded by a newer login for the same
            // user must not tear down that newer session's state.
            let was_current =
                state.registry.lock().await.unbind(user_id, conn_id);
            if !was_current {
                return;
            }

            if let Some(code) =
                state.rooms.lock().await.leave_room(user_id).await
            {
                tracing::info!(%user_id, room = %code, "seat vacated");
            }
            broadcast_presence(
                &state.registry,
                &state.relationships,
                user_id,
                false,
            )
            .await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<I, R, M>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I, R, M>>,
) -> Result<(), GambitError>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Writer task: everything the server pushes to this client funnels
    // through one channel, so room actors and the handler never touch
    // the socket directly.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerEvent>();
    let writer_conn = conn.clone();
    let codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let bytes = match codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if writer_conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });

    // Set after a successful `authenticate`; the guard owns cleanup.
    let mut session: Option<DisconnectGuard<I, R, M>> = None;

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable frame");
                continue;
            }
        };

        match event {
            ClientEvent::Authenticate { user_id } => {
                if session.is_some() {
                    tracing::debug!(%conn_id, "already authenticated, ignoring");
                    continue;
                }
                if let Some(user) =
                    authenticate(&state, conn_id, user_id, &tx).await
                {
                    session = Some(DisconnectGuard {
                        user,
                        conn_id,
                        state: Arc::clone(&state),
                    });
                }
            }
            event => match &session {
                Some(guard) => {
                    let user = guard.user.clone();
                    dispatch(&state, &user, &tx, event).await;
                }
                // Anything sent before authentication is dropped.
                None => {
                    tracing::debug!(%conn_id, "event before authenticate, ignoring");
                }
            },
        }
    }

    writer.abort();
    // `session` drops here; the guard's cleanup task fires.
    Ok(())
}

/// Resolves the claimed identity and binds this connection to it.
/// Unknown or unverifiable identities leave the connection
/// unauthenticated; the client hears nothing either way.
async fn authenticate<I, R, M>(
    state: &Arc<ServerState<I, R, M>>,
    conn_id: ConnectionId,
    user_id: gambit_protocol::UserId,
    tx: &ClientSender,
) -> Option<UserProfile>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    let user = match state.identity.lookup(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(%conn_id, %user_id, "unknown identity");
            return None;
        }
        Err(e) => {
            tracing::warn!(%conn_id, %user_id, error = %e, "identity lookup failed");
            return None;
        }
    };

    state
        .registry
        .lock()
        .await
        .bind(user.id, conn_id, tx.clone());
    broadcast_presence(&state.registry, &state.relationships, user.id, true)
        .await;
    Some(user)
}

/// Routes one authenticated event. Failures that the client should see
/// go back through `tx`; everything else is logged and dropped.
async fn dispatch<I, R, M>(
    state: &Arc<ServerState<I, R, M>>,
    user: &UserProfile,
    tx: &ClientSender,
    event: ClientEvent,
) where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    match event {
        // Intercepted by the connection loop before dispatch.
        ClientEvent::Authenticate { .. } => {}

        ClientEvent::CreateRoom { room_code } => {
            let result = state
                .rooms
                .lock()
                .await
                .create_room(room_code.clone(), user.clone(), tx.clone())
                .await;
            match result {
                Ok(snapshot) => {
                    let _ = tx.send(ServerEvent::RoomCreated {
                        room_code,
                        messages: snapshot.messages,
                    });
                }
                Err(e) => send_room_error(tx, &e),
            }
        }

        ClientEvent::JoinRoom { room_code } => {
            let result = state
                .rooms
                .lock()
                .await
                .join_room(room_code, user.clone(), tx.clone())
                .await;
            match result {
                // The room broadcasts the roster change to every seat;
                // the reply snapshot additionally covers re-attaches,
                // which broadcast nothing. Snapshots are idempotent, so
                // the joiner seeing two is harmless.
                Ok(snapshot) => {
                    let _ = tx.send(ServerEvent::RoomUpdated(snapshot));
                }
                Err(e) => send_room_error(tx, &e),
            }
        }

        ClientEvent::MakeMove {
            room_code,
            from,
            to,
            promotion,
        } => {
            let request = MoveRequest {
                from,
                to,
                promotion,
            };
            if let Some(handle) = room_handle(state, &room_code).await {
                let _ = handle.make_move(user.id, request).await;
            }
        }

        ClientEvent::ResignGame { room_code } => {
            if let Some(handle) = room_handle(state, &room_code).await {
                let _ = handle.resign(user.id).await;
            }
        }

        ClientEvent::RequestRematch { room_code } => {
            if let Some(handle) = room_handle(state, &room_code).await {
                let _ = handle.request_rematch(user.id).await;
            }
        }

        ClientEvent::AcceptRematch { room_code } => {
            if let Some(handle) = room_handle(state, &room_code).await {
                let _ = handle.accept_rematch(user.id).await;
            }
        }

        ClientEvent::DeclineRematch { room_code } => {
            if let Some(handle) = room_handle(state, &room_code).await {
                let _ = handle.decline_rematch(user.id).await;
            }
        }

        ClientEvent::MatchMessage { text } => {
            // The room is implied by where the sender sits.
            let handle = {
                let rooms = state.rooms.lock().await;
                rooms
                    .room_of(user.id)
                    .and_then(|code| rooms.handle(code).ok().cloned())
            };
            match handle {
                Some(handle) => {
                    let _ = handle.chat(user.id, text).await;
                }
                None => {
                    tracing::debug!(
                        user = %user.id,
                        "match message from unseated user, ignoring"
                    );
                }
            }
        }

        ClientEvent::FriendMessage {
            receiver_id,
            message,
        } => {
            let outgoing = DirectMessage {
                sender_id: user.id,
                receiver_id,
                message,
            };
            match state.messages.append(outgoing).await {
                Ok(stored) => {
                    state.registry.lock().await.send_to(
                        receiver_id,
                        ServerEvent::FriendMessage {
                            sender_id: stored.sender_id,
                            message: stored.message,
                            timestamp: stored.timestamp,
                        },
                    );
                    let _ = tx.send(ServerEvent::MessageSent {
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        user = %user.id,
                        error = %e,
                        "failed to store direct message"
                    );
                    let _ = tx.send(ServerEvent::MessageSent {
                        success: false,
                        error: Some("Failed to send message".into()),
                    });
                }
            }
        }

        ClientEvent::ChatHistory { friend_id } => {
            let messages = match state
                .messages
                .history(user.id, friend_id, HISTORY_LIMIT)
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(
                        user = %user.id,
                        error = %e,
                        "failed to load chat history"
                    );
                    Vec::new()
                }
            };
            let _ = tx.send(ServerEvent::ChatHistory { messages });
        }
    }
}

/// Clones a room handle out from under the store lock so room commands
/// never hold it across an await.
async fn room_handle<I, R, M>(
    state: &Arc<ServerState<I, R, M>>,
    code: &gambit_protocol::RoomCode,
) -> Option<gambit_room::RoomHandle>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    let handle = state.rooms.lock().await.handle(code).ok().cloned();
    if handle.is_none() {
        tracing::debug!(room = %code, "command for unknown room, ignoring");
    }
    handle
}

/// Maps room errors to the fixed strings the browser client matches on.
fn send_room_error(tx: &ClientSender, error: &RoomError) {
    let message = match error {
        RoomError::NotFound(_) | RoomError::Unavailable(_) => {
            "Room not found"
        }
        RoomError::RoomFull(_) => "Room is full",
        RoomError::Duplicate(_) => "Room already exists",
        RoomError::AlreadyInRoom(_, _) => "Already in a room",
    };
    let _ = tx.send(ServerEvent::RoomError {
        message: message.to_string(),
    });
}
