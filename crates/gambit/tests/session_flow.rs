//! Full-stack tests: a real server on a loopback socket, driven by real
//! WebSocket clients, with in-memory stores and a scripted rules engine.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gambit::prelude::*;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

// ---------------------------------------------------------------------------
// In-memory stores
// ---------------------------------------------------------------------------

struct MemoryIdentity(HashMap<UserId, &'static str>);

impl IdentityStore for MemoryIdentity {
    async fn lookup(
        &self,
        user: UserId,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.0.get(&user).map(|name| UserProfile {
            id: user,
            name: (*name).to_string(),
        }))
    }
}

struct MemoryFriends(HashMap<UserId, Vec<UserId>>);

impl RelationshipStore for MemoryFriends {
    async fn accepted_friends(
        &self,
        user: UserId,
    ) -> Result<Vec<UserId>, StoreError> {
        Ok(self.0.get(&user).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct MemoryMessages {
    inner: Mutex<Vec<StoredMessage>>,
}

impl MessageStore for MemoryMessages {
    async fn append(
        &self,
        message: DirectMessage,
    ) -> Result<StoredMessage, StoreError> {
        let mut inner = self.inner.lock().await;
        let stored = StoredMessage {
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            message: message.message,
            timestamp: 1_700_000_000_000 + inner.len() as u64,
        };
        inner.push(stored.clone());
        Ok(stored)
    }

    async fn history(
        &self,
        a: UserId,
        b: UserId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b)
                    || (m.sender_id == b && m.receiver_id == a)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Scripted rules engine
// ---------------------------------------------------------------------------

struct ScriptedRules {
    turn: Side,
    moves: u32,
}

impl RulesEngine for ScriptedRules {
    fn position(&self) -> String {
        format!("pos-{}", self.moves)
    }

    fn side_to_move(&self) -> Side {
        self.turn
    }

    fn apply(
        &mut self,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, IllegalMove> {
        if request.from == "illegal" {
            return Err(IllegalMove {
                from: request.from.clone(),
                to: request.to.clone(),
            });
        }
        self.moves += 1;
        self.turn = self.turn.opposite();
        let status = match request.to.as_str() {
            "mate" => GameStatus::Checkmate,
            _ => GameStatus::InPlay,
        };
        Ok(MoveOutcome {
            position: self.position(),
            turn: self.turn,
            check: request.to == "mate",
            status,
        })
    }
}

fn scripted() -> Arc<dyn RulesFactory> {
    Arc::new(|| {
        Box::new(ScriptedRules {
            turn: Side::White,
            moves: 0,
        }) as Box<dyn RulesEngine>
    })
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);
const CAROL: UserId = UserId(3);

static TRACING: Once = Once::new();

/// Opt-in server logs for debugging: `RUST_LOG=gambit=debug cargo test`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Starts a server where Alice, Bob, and Carol exist; Alice and Bob are
/// mutual friends. The countdown is shortened so matches start in under
/// a second.
async fn start_server() -> SocketAddr {
    init_tracing();
    let identity = MemoryIdentity(HashMap::from([
        (ALICE, "Alice"),
        (BOB, "Bob"),
        (CAROL, "Carol"),
    ]));
    let friends = MemoryFriends(HashMap::from([
        (ALICE, vec![BOB]),
        (BOB, vec![ALICE]),
    ]));

    let server = GambitServer::<
        MemoryIdentity,
        MemoryFriends,
        MemoryMessages,
    >::builder()
        .bind("127.0.0.1:0")
        .countdown(CountdownConfig {
            start_from: 3,
            interval: Duration::from_millis(20),
        })
        .build(identity, friends, MemoryMessages::default(), scripted())
        .await
        .expect("bind server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    addr
}

struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("connect");
        Self { ws }
    }

    /// Connects and authenticates in one step.
    async fn login(addr: SocketAddr, user: UserId) -> Self {
        let mut client = Self::connect(addr).await;
        client
            .send(&ClientEvent::Authenticate { user_id: user })
            .await;
        client
    }

    async fn send(&mut self, event: &ClientEvent) {
        let text = serde_json::to_string(event).expect("encode");
        self.ws
            .send(Message::Text(text.into()))
            .await
            .expect("send");
    }

    async fn recv(&mut self) -> ServerEvent {
        loop {
            let msg = tokio::time::timeout(
                Duration::from_secs(5),
                self.ws.next(),
            )
            .await
            .expect("no event within 5s")
            .expect("stream ended")
            .expect("ws error");
            match msg {
                Message::Text(text) => {
                    return serde_json::from_str(&text).expect("decode");
                }
                Message::Binary(data) => {
                    return serde_json::from_slice(&data).expect("decode");
                }
                _ => continue,
            }
        }
    }

    /// Receives events until one matches the predicate, returning it.
    async fn recv_until(
        &mut self,
        pred: impl Fn(&ServerEvent) -> bool,
    ) -> ServerEvent {
        loop {
            let ev = self.recv().await;
            if pred(&ev) {
                return ev;
            }
        }
    }

    async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

fn is_started(ev: &ServerEvent) -> bool {
    matches!(ev, ServerEvent::RoomUpdated(snap) if snap.game_started)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_match_flow() {
    let addr = start_server().await;
    let code = RoomCode::from("MATCH001");

    let mut alice = TestClient::login(addr, ALICE).await;
    alice
        .send(&ClientEvent::CreateRoom {
            room_code: code.clone(),
        })
        .await;
    match alice.recv().await {
        ServerEvent::RoomCreated {
            room_code,
            messages,
        } => {
            assert_eq!(room_code, code);
            assert_eq!(
                messages,
                vec![ChatEntry::system("Waiting for opponent to join...")]
            );
        }
        other => panic!("expected room-created, got {other:?}"),
    }

    let mut bob = TestClient::login(addr, BOB).await;
    bob.send(&ClientEvent::JoinRoom {
        room_code: code.clone(),
    })
    .await;

    // Both ride the countdown to the start of the match.
    alice.recv_until(is_started).await;
    bob.recv_until(is_started).await;

    // Alice created the room, so she opens as White.
    alice
        .send(&ClientEvent::MakeMove {
            room_code: code.clone(),
            from: "e2".into(),
            to: "e4".into(),
            promotion: None,
        })
        .await;
    for client in [&mut alice, &mut bob] {
        match client
            .recv_until(|ev| matches!(ev, ServerEvent::MoveMade(_)))
            .await
        {
            ServerEvent::MoveMade(report) => {
                assert_eq!(report.mv.from, "e2");
                assert_eq!(report.turn, Side::Black);
                assert!(!report.game_over);
            }
            _ => unreachable!(),
        }
    }

    // Bob blunders into giving Alice mate on the next exchange.
    bob.send(&ClientEvent::MakeMove {
        room_code: code.clone(),
        from: "f7".into(),
        to: "f6".into(),
        promotion: None,
    })
    .await;
    alice
        .recv_until(|ev| matches!(ev, ServerEvent::MoveMade(_)))
        .await;
    alice
        .send(&ClientEvent::MakeMove {
            room_code: code.clone(),
            from: "d1".into(),
            to: "mate".into(),
            promotion: None,
        })
        .await;

    match bob
        .recv_until(|ev| matches!(ev, ServerEvent::GameOver { .. }))
        .await
    {
        ServerEvent::GameOver { winner, reason } => {
            // Alice joined first, so she plays White and mates.
            assert_eq!(winner.as_deref(), Some("Alice"));
            assert_eq!(reason, GameOverReason::Checkmate);
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_before_authentication_ignored() {
    let addr = start_server().await;

    let mut client = TestClient::connect(addr).await;
    client
        .send(&ClientEvent::CreateRoom {
            room_code: RoomCode::from("SNEAKY00"),
        })
        .await;

    // Only after authenticating does the same request take effect.
    client
        .send(&ClientEvent::Authenticate { user_id: ALICE })
        .await;
    client
        .send(&ClientEvent::CreateRoom {
            room_code: RoomCode::from("LEGIT000"),
        })
        .await;
    match client.recv().await {
        ServerEvent::RoomCreated { room_code, .. } => {
            assert_eq!(room_code, RoomCode::from("LEGIT000"));
        }
        other => panic!("expected room-created, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_unknown_room_reports_not_found() {
    let addr = start_server().await;

    let mut alice = TestClient::login(addr, ALICE).await;
    alice
        .send(&ClientEvent::JoinRoom {
            room_code: RoomCode::from("NOSUCH00"),
        })
        .await;

    match alice
        .recv_until(|ev| matches!(ev, ServerEvent::RoomError { .. }))
        .await
    {
        ServerEvent::RoomError { message } => {
            assert_eq!(message, "Room not found");
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_third_player_reports_room_full() {
    let addr = start_server().await;
    let code = RoomCode::from("FULL0000");

    let mut alice = TestClient::login(addr, ALICE).await;
    alice
        .send(&ClientEvent::CreateRoom {
            room_code: code.clone(),
        })
        .await;
    alice
        .recv_until(|ev| matches!(ev, ServerEvent::RoomCreated { .. }))
        .await;

    let mut bob = TestClient::login(addr, BOB).await;
    bob.send(&ClientEvent::JoinRoom {
        room_code: code.clone(),
    })
    .await;
    bob.recv_until(|ev| matches!(ev, ServerEvent::RoomUpdated(_)))
        .await;

    let mut carol = TestClient::login(addr, CAROL).await;
    carol
        .send(&ClientEvent::JoinRoom {
            room_code: code.clone(),
        })
        .await;
    match carol
        .recv_until(|ev| matches!(ev, ServerEvent::RoomError { .. }))
        .await
    {
        ServerEvent::RoomError { message } => {
            assert_eq!(message, "Room is full");
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_friend_presence_follows_connection() {
    let addr = start_server().await;

    let mut bob = TestClient::login(addr, BOB).await;
    // Give the server a beat to register Bob before Alice arrives.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let alice = TestClient::login(addr, ALICE).await;
    match bob
        .recv_until(|ev| matches!(ev, ServerEvent::FriendStatus { .. }))
        .await
    {
        ServerEvent::FriendStatus { friend_id, online } => {
            assert_eq!(friend_id, ALICE);
            assert!(online);
        }
        _ => unreachable!(),
    }

    alice.close().await;
    match bob
        .recv_until(|ev| matches!(ev, ServerEvent::FriendStatus { .. }))
        .await
    {
        ServerEvent::FriendStatus { friend_id, online } => {
            assert_eq!(friend_id, ALICE);
            assert!(!online);
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_friend_message_relayed_and_persisted() {
    let addr = start_server().await;

    let mut alice = TestClient::login(addr, ALICE).await;
    let mut bob = TestClient::login(addr, BOB).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    alice
        .send(&ClientEvent::FriendMessage {
            receiver_id: BOB,
            message: "up for a game?".into(),
        })
        .await;

    match bob
        .recv_until(|ev| matches!(ev, ServerEvent::FriendMessage { .. }))
        .await
    {
        ServerEvent::FriendMessage {
            sender_id, message, ..
        } => {
            assert_eq!(sender_id, ALICE);
            assert_eq!(message, "up for a game?");
        }
        _ => unreachable!(),
    }
    match alice
        .recv_until(|ev| matches!(ev, ServerEvent::MessageSent { .. }))
        .await
    {
        ServerEvent::MessageSent { success, error } => {
            assert!(success);
            assert_eq!(error, None);
        }
        _ => unreachable!(),
    }

    bob.send(&ClientEvent::ChatHistory { friend_id: ALICE })
        .await;
    match bob
        .recv_until(|ev| matches!(ev, ServerEvent::ChatHistory { .. }))
        .await
    {
        ServerEvent::ChatHistory { messages } => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].message, "up for a game?");
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_connection_close_keeps_new_session() {
    let addr = start_server().await;
    let code = RoomCode::from("STALE000");

    let mut first = TestClient::login(addr, ALICE).await;
    first
        .send(&ClientEvent::CreateRoom {
            room_code: code.clone(),
        })
        .await;
    first
        .recv_until(|ev| matches!(ev, ServerEvent::RoomCreated { .. }))
        .await;

    // A second login for Alice supersedes the first connection. It has
    // to stay alive for the rest of the test, or its own disconnect
    // cleanup would vacate the seat legitimately.
    let _second = TestClient::login(addr, ALICE).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The stale connection going away must not vacate Alice's seat.
    first.close().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut bob = TestClient::login(addr, BOB).await;
    bob.send(&ClientEvent::JoinRoom {
        room_code: code.clone(),
    })
    .await;
    match bob
        .recv_until(|ev| {
            matches!(
                ev,
                ServerEvent::RoomUpdated(_) | ServerEvent::RoomError { .. }
            )
        })
        .await
    {
        ServerEvent::RoomUpdated(snap) => {
            assert_eq!(snap.players.len(), 2);
        }
        other => panic!("room should have survived, got {other:?}"),
    }
}
