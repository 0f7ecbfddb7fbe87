//! Room actor: an isolated Tokio task that owns one match session.
//!
//! Each room runs in its own task and is the only owner of its seats,
//! transcript, countdown, and rules engine. The outside world talks to
//! it through an mpsc channel; there is no shared mutable room state
//! and therefore no room-level locking. Turn order, lifecycle phases,
//! and rematch negotiation are all enforced here, serialized by the
//! actor's single command queue.

use std::collections::HashMap;
use std::sync::Arc;

use gambit_countdown::{Countdown, CountdownConfig};
use gambit_protocol::{
    ChatEntry, GameOverReason, MoveReport, MoveRequest, RoomCode,
    RoomSnapshot, SeatView, ServerEvent, Side, UserId, UserProfile,
};
use gambit_session::ClientSender;
use tokio::sync::{mpsc, oneshot};

use crate::{
    GameStatus, RematchState, RoomError, RoomLifecycle, RulesEngine,
    RulesFactory,
};

/// Transcript notices. The browser client renders these verbatim.
const MSG_WAITING: &str = "Waiting for opponent to join...";
const MSG_STARTED: &str = "Game has started!";

fn msg_joined(name: &str) -> String {
    format!("{name} has joined the room")
}

fn msg_left(name: &str) -> String {
    format!("{name} has left the room")
}

fn msg_starting(seconds: u8) -> String {
    format!("Game starting in {seconds} seconds...")
}

/// What a leave did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Whether the user actually held a seat here.
    pub was_seated: bool,
    /// Whether the room emptied out and shut down.
    pub destroyed: bool,
}

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/response; the rest
/// are fire-and-forget, with invalid ones dropped inside the actor.
pub(crate) enum RoomCommand {
    Join {
        user: UserProfile,
        sender: ClientSender,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Leave {
        user_id: UserId,
        reply: oneshot::Sender<LeaveOutcome>,
    },
    Move {
        user_id: UserId,
        request: MoveRequest,
    },
    Resign {
        user_id: UserId,
    },
    Chat {
        user_id: UserId,
        text: String,
    },
    RematchRequest {
        user_id: UserId,
    },
    RematchAccept {
        user_id: UserId,
    },
    RematchDecline {
        user_id: UserId,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a user, or re-attaches them if they already hold a seat.
    /// Replies with the authoritative snapshot on success.
    pub async fn join(
        &self,
        user: UserProfile,
        sender: ClientSender,
    ) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                user,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Removes a user's seat. Safe to call for users who never sat
    /// here; the outcome says what actually happened.
    pub async fn leave(
        &self,
        user_id: UserId,
    ) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                user_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Submits a move. Fire-and-forget: rejected moves produce no reply
    /// and no event.
    pub async fn make_move(
        &self,
        user_id: UserId,
        request: MoveRequest,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Move { user_id, request }).await
    }

    pub async fn resign(&self, user_id: UserId) -> Result<(), RoomError> {
        self.send(RoomCommand::Resign { user_id }).await
    }

    pub async fn chat(
        &self,
        user_id: UserId,
        text: String,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Chat { user_id, text }).await
    }

    pub async fn request_rematch(
        &self,
        user_id: UserId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::RematchRequest { user_id }).await
    }

    pub async fn accept_rematch(
        &self,
        user_id: UserId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::RematchAccept { user_id }).await
    }

    pub async fn decline_rematch(
        &self,
        user_id: UserId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::RematchDecline { user_id }).await
    }

    /// The room's current observable state.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to stop regardless of occupancy.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

enum Wake {
    Command(Option<RoomCommand>),
    Tick(u8),
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    lifecycle: RoomLifecycle,
    /// Seat order is the side mapping: seats[0] plays White.
    seats: Vec<UserProfile>,
    senders: HashMap<UserId, ClientSender>,
    transcript: Vec<ChatEntry>,
    countdown: Countdown,
    countdown_start_from: u8,
    rules: Arc<dyn RulesFactory>,
    game: Option<Box<dyn RulesEngine>>,
    rematch: RematchState,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room actor started");

        loop {
            let wake = tokio::select! {
                cmd = self.receiver.recv() => Wake::Command(cmd),
                n = self.countdown.tick() => Wake::Tick(n),
            };

            match wake {
                Wake::Command(Some(cmd)) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                // All handles dropped; nobody can reach the room.
                Wake::Command(None) => break,
                Wake::Tick(n) => self.handle_tick(n),
            }
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Returns `true` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                user,
                sender,
                reply,
            } => {
                let result = self.handle_join(user, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { user_id, reply } => {
                let outcome = self.handle_leave(user_id);
                let _ = reply.send(outcome);
                if outcome.destroyed {
                    return true;
                }
            }
            RoomCommand::Move { user_id, request } => {
                self.handle_move(user_id, request);
            }
            RoomCommand::Resign { user_id } => {
                self.handle_resign(user_id);
            }
            RoomCommand::Chat { user_id, text } => {
                self.handle_chat(user_id, text);
            }
            RoomCommand::RematchRequest { user_id } => {
                self.handle_rematch_request(user_id);
            }
            RoomCommand::RematchAccept { user_id } => {
                self.handle_rematch_accept(user_id);
            }
            RoomCommand::RematchDecline { user_id } => {
                self.handle_rematch_decline(user_id);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.code, "room shutting down");
                return true;
            }
        }
        false
    }

    // -- joins and leaves --------------------------------------------------

    fn handle_join(
        &mut self,
        user: UserProfile,
        sender: ClientSender,
    ) -> Result<RoomSnapshot, RoomError> {
        // Re-attach: same user joining again just refreshes their
        // outbound channel and gets the current snapshot.
        if self.seats.iter().any(|p| p.id == user.id) {
            self.senders.insert(user.id, sender);
            tracing::debug!(room = %self.code, user = %user.id, "re-attached");
            return Ok(self.snapshot());
        }

        if !self.lifecycle.is_joinable() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        let name = user.name.clone();
        self.senders.insert(user.id, sender);
        self.seats.push(user);
        self.transcript.push(ChatEntry::system(msg_joined(&name)));
        tracing::info!(
            room = %self.code,
            seats = self.seats.len(),
            "{name} joined"
        );

        if self.seats.len() == 2 {
            self.lifecycle = RoomLifecycle::CountingDown;
            self.transcript.push(ChatEntry::system(msg_starting(
                self.countdown_start_from,
            )));
            self.countdown.start();
        }

        let snapshot = self.snapshot();
        self.broadcast(ServerEvent::RoomUpdated(snapshot.clone()));
        Ok(snapshot)
    }

    fn handle_leave(&mut self, user_id: UserId) -> LeaveOutcome {
        let Some(index) = self.seats.iter().position(|p| p.id == user_id)
        else {
            return LeaveOutcome {
                was_seated: false,
                destroyed: false,
            };
        };

        let user = self.seats.remove(index);
        self.senders.remove(&user_id);
        tracing::info!(
            room = %self.code,
            seats = self.seats.len(),
            "{} left",
            user.name
        );

        if self.seats.is_empty() {
            return LeaveOutcome {
                was_seated: true,
                destroyed: true,
            };
        }

        // One seat remains: whatever phase we were in, the session is
        // over and the room reverts to waiting for a fresh opponent.
        self.countdown.cancel();
        self.lifecycle = RoomLifecycle::Waiting;
        self.game = None;
        self.rematch = RematchState::None;
        self.transcript.push(ChatEntry::system(msg_left(&user.name)));
        self.broadcast(ServerEvent::RoomUpdated(self.snapshot()));

        LeaveOutcome {
            was_seated: true,
            destroyed: false,
        }
    }

    // -- countdown ---------------------------------------------------------

    fn handle_tick(&mut self, remaining: u8) {
        // A tick racing a departure re-checks occupancy before acting.
        if self.seats.len() < 2 {
            self.countdown.cancel();
            self.lifecycle = RoomLifecycle::Waiting;
            return;
        }

        if remaining == 0 {
            self.start_match();
        } else {
            self.broadcast(ServerEvent::RoomUpdated(self.snapshot()));
        }
    }

    fn start_match(&mut self) {
        self.lifecycle = RoomLifecycle::InProgress;
        self.game = Some(self.rules.create());
        self.rematch = RematchState::None;
        self.transcript.push(ChatEntry::system(MSG_STARTED));
        tracing::info!(room = %self.code, "match started");
        self.broadcast(ServerEvent::RoomUpdated(self.snapshot()));
    }

    // -- moves -------------------------------------------------------------

    /// Applies a move if every guard passes. All rejections are silent:
    /// the client learns nothing, matching how the browser client
    /// treats its own optimistic board as provisional until `move-made`
    /// confirms it.
    fn handle_move(&mut self, user_id: UserId, request: MoveRequest) {
        if !self.lifecycle.accepts_moves() {
            tracing::debug!(
                room = %self.code,
                user = %user_id,
                phase = %self.lifecycle,
                "move outside active match, ignoring"
            );
            return;
        }

        let Some(seat) = self.seat_of(user_id) else {
            tracing::debug!(
                room = %self.code,
                user = %user_id,
                "move from non-participant, ignoring"
            );
            return;
        };

        let Some(game) = self.game.as_mut() else {
            return;
        };

        if Side::of_seat(seat) != game.side_to_move() {
            tracing::debug!(
                room = %self.code,
                user = %user_id,
                "move out of turn, ignoring"
            );
            return;
        }

        let outcome = match game.apply(&request) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(room = %self.code, user = %user_id, %e, "ignoring");
                return;
            }
        };

        let status = outcome.status;
        let report = MoveReport {
            mv: request,
            position: outcome.position,
            turn: outcome.turn,
            game_over: status != GameStatus::InPlay,
            check: outcome.check,
            checkmate: status == GameStatus::Checkmate,
            draw: matches!(status, GameStatus::Draw(_)),
        };

        // The board update always lands before any game-over event.
        self.broadcast(ServerEvent::MoveMade(report));

        match status {
            GameStatus::InPlay => {}
            GameStatus::Checkmate => {
                // The mated side is the one now to move; the mover won.
                let winner = match outcome.turn {
                    Side::White => 1,
                    Side::Black => 0,
                };
                self.conclude(Some(winner), GameOverReason::Checkmate);
            }
            GameStatus::Draw(kind) => self.conclude(None, kind.into()),
        }
    }

    fn handle_resign(&mut self, user_id: UserId) {
        if !self.lifecycle.accepts_moves() {
            return;
        }
        let Some(seat) = self.seat_of(user_id) else {
            return;
        };
        self.conclude(Some(1 - seat), GameOverReason::Resign);
    }

    fn conclude(&mut self, winner: Option<usize>, reason: GameOverReason) {
        self.lifecycle = RoomLifecycle::Concluded;
        self.game = None;
        let winner = winner.map(|seat| self.seats[seat].name.clone());
        tracing::info!(
            room = %self.code,
            ?reason,
            winner = winner.as_deref(),
            "match concluded"
        );
        self.broadcast(ServerEvent::GameOver { winner, reason });
    }

    // -- chat --------------------------------------------------------------

    fn handle_chat(&mut self, user_id: UserId, text: String) {
        let Some(seat) = self.seat_of(user_id) else {
            tracing::debug!(
                room = %self.code,
                user = %user_id,
                "chat from non-participant, ignoring"
            );
            return;
        };

        let author = &self.seats[seat];
        let entry = ChatEntry::User {
            id: author.id,
            name: author.name.clone(),
            content: text,
        };
        self.transcript.push(entry.clone());
        self.broadcast(ServerEvent::NewMatchMessage(entry));
    }

    // -- rematch -----------------------------------------------------------

    fn handle_rematch_request(&mut self, user_id: UserId) {
        if self.lifecycle != RoomLifecycle::Concluded {
            return;
        }
        let Some(seat) = self.seat_of(user_id) else {
            return;
        };
        if self.rematch != RematchState::None {
            tracing::debug!(
                room = %self.code,
                user = %user_id,
                "rematch already pending, ignoring"
            );
            return;
        }

        self.rematch = RematchState::Requested { by: user_id };
        let opponent = self.seats[1 - seat].id;
        self.send_to(opponent, ServerEvent::RematchRequested);
    }

    fn handle_rematch_accept(&mut self, user_id: UserId) {
        let RematchState::Requested { by } = self.rematch else {
            return;
        };
        if by == user_id || self.seat_of(user_id).is_none() {
            return;
        }

        // Colors swap between matches: last game's Black now sits first.
        self.seats.reverse();
        self.rematch = RematchState::None;
        let game = self.rules.create();
        let position = game.position();
        self.game = Some(game);
        self.lifecycle = RoomLifecycle::InProgress;
        tracing::info!(room = %self.code, "rematch accepted");

        self.broadcast(ServerEvent::RematchAccepted);
        self.broadcast(ServerEvent::GameRematch {
            position,
            players: self.seat_views(),
        });
    }

    fn handle_rematch_decline(&mut self, user_id: UserId) {
        let RematchState::Requested { by } = self.rematch else {
            return;
        };
        if by == user_id || self.seat_of(user_id).is_none() {
            return;
        }

        self.rematch = RematchState::None;
        self.send_to(by, ServerEvent::RematchDeclined);
    }

    // -- plumbing ----------------------------------------------------------

    fn seat_of(&self, user_id: UserId) -> Option<usize> {
        self.seats.iter().position(|p| p.id == user_id)
    }

    fn seat_view(&self, seat: usize) -> SeatView {
        let user = &self.seats[seat];
        SeatView {
            id: user.id,
            name: user.name.clone(),
            side: Side::of_seat(seat),
        }
    }

    fn seat_views(&self) -> Vec<SeatView> {
        (0..self.seats.len()).map(|i| self.seat_view(i)).collect()
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self.seat_views(),
            messages: self.transcript.clone(),
            game_started: self.lifecycle.game_started(),
            countdown: self.countdown.remaining(),
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for user in &self.seats {
            self.send_to(user.id, event.clone());
        }
    }

    /// Silently drops if the recipient's writer task is gone.
    fn send_to(&self, user_id: UserId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&user_id) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns a room actor with its creator already seated and returns a
/// handle to it.
pub(crate) fn spawn_room(
    code: RoomCode,
    creator: UserProfile,
    sender: ClientSender,
    rules: Arc<dyn RulesFactory>,
    countdown: CountdownConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let mut senders = HashMap::new();
    senders.insert(creator.id, sender);

    let actor = RoomActor {
        code: code.clone(),
        lifecycle: RoomLifecycle::Waiting,
        seats: vec![creator],
        senders,
        transcript: vec![ChatEntry::system(MSG_WAITING)],
        countdown_start_from: countdown.start_from,
        countdown: Countdown::new(countdown),
        rules,
        game: None,
        rematch: RematchState::None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
