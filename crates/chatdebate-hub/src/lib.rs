//! §4.C connection hub: the process-local `(room -> user -> session)`
//! registry, join/leave sequencing, and the single backplane subscription
//! per room that fans messages out to local sessions. Also owns the §4.D
//! inbound routing pipeline (`router`), since both operate on the same
//! session/room-store/orchestrator collaborators.

pub mod router;

use std::collections::HashMap;
use std::sync::Arc;

use chatdebate_core::{RoomId, UserId};
use chatdebate_debate::DebateOrchestrator;
use chatdebate_protocol::envelope::{FrameType, Message, UserRef};
use chatdebate_room::RoomStore;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

const SESSION_BUFFER: usize = 64;

struct Session {
    tx: mpsc::Sender<String>,
}

/// Returned from `Hub::connect`; the caller (the WS acceptance layer) reads
/// from `outgoing` and forwards each payload to the socket.
pub struct Connected {
    pub outgoing: mpsc::Receiver<String>,
}

struct Inner {
    room_store: Arc<RoomStore>,
    debates: Arc<DebateOrchestrator>,
    sessions: DashMap<RoomId, DashMap<UserId, Session>>,
    // Guards subscription setup, not just the map: the lock is held across
    // the `subscribe().await` call so a connect can never publish its join
    // frame before the room's backplane subscription is actually live.
    room_fanout: Mutex<HashMap<RoomId, JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Hub {
    pub fn new(room_store: Arc<RoomStore>, debates: Arc<DebateOrchestrator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                room_store,
                debates,
                sessions: DashMap::new(),
                room_fanout: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a new session for `(room, user)`. The room's backplane
    /// subscription is established (and confirmed live) before history
    /// replay and before the join announcement and presence snapshot are
    /// published, so this connect's own publications are never lost to the
    /// best-effort backplane racing its own subscriber into existence.
    pub async fn connect(&self, room: RoomId, user: UserRef) -> Connected {
        self.ensure_room_fanout(room.clone()).await;

        let (tx, rx) = mpsc::channel(SESSION_BUFFER);

        for msg in self.inner.room_store.read_history(&room).await {
            if let Ok(payload) = serde_json::to_string(&msg) {
                let _ = tx.try_send(payload);
            }
        }

        let user_id = UserId::new(user.id.clone());
        let room_sessions = self.inner.sessions.entry(room.clone()).or_default();
        // A reconnect under the same user id supersedes the old session;
        // dropping its sender ends that session's read loop on its next send.
        room_sessions.insert(user_id, Session { tx });
        drop(room_sessions);

        self.inner.room_store.join(&room, &user).await;
        let join_msg = Message::system(
            room.as_str(),
            format!("{} joined the room", user.name),
            json!({}),
        );
        self.inner.room_store.publish(&room, &join_msg).await;
        self.broadcast_presence(&room).await;

        Connected { outgoing: rx }
    }

    /// Deregisters the session and announces the departure. Idempotent if
    /// called twice for the same `(room, user)` — the second call finds no
    /// local session and no-ops the removal, but still emits the leave
    /// announcement (matching the connection manager this is grounded on).
    pub async fn disconnect(&self, room: &RoomId, user: &UserRef) {
        let user_id = UserId::new(user.id.clone());
        let mut room_now_empty = false;
        if let Some(room_sessions) = self.inner.sessions.get(room) {
            room_sessions.remove(&user_id);
            room_now_empty = room_sessions.is_empty();
        }
        if room_now_empty {
            self.inner.sessions.remove(room);
            if let Some(handle) = self.inner.room_fanout.lock().await.remove(room) {
                handle.abort();
            }
        }

        self.inner.room_store.leave(room, user).await;
        self.inner.room_store.clear_typing(room, &user.id).await;

        let leave_msg = Message::system(
            room.as_str(),
            format!("{} left the room", user.name),
            json!({}),
        );
        self.inner.room_store.publish(room, &leave_msg).await;
        self.broadcast_presence(room).await;
    }

    /// Routes one inbound frame; any resulting error frame is unicast back
    /// to the originating session only, never published or recorded.
    pub async fn handle_inbound(&self, room: &RoomId, user: &UserRef, raw: &str) {
        if let Some(err) = router::route_inbound(&self.inner.room_store, &self.inner.debates, room, user, raw).await
        {
            if let Ok(payload) = serde_json::to_string(&err) {
                self.unicast(room, user, payload);
            }
        }
    }

    pub fn online_sessions(&self, room: &RoomId) -> usize {
        self.inner.sessions.get(room).map(|m| m.len()).unwrap_or(0)
    }

    fn unicast(&self, room: &RoomId, user: &UserRef, payload: String) {
        let user_id = UserId::new(user.id.clone());
        if let Some(room_sessions) = self.inner.sessions.get(room) {
            if let Some(session) = room_sessions.get(&user_id) {
                let _ = session.tx.try_send(payload);
            }
        }
    }

    async fn broadcast_presence(&self, room: &RoomId) {
        let count = self.inner.room_store.online_count(room).await;
        let users = self.inner.room_store.online_users(room).await;
        let presence = Message {
            kind: FrameType::Presence,
            room: room.as_str().to_string(),
            user: UserRef::system(),
            content: None,
            ts: Message::now_ms(),
            client_id: None,
            meta: json!({ "count": count, "users": users }),
        };
        self.inner.room_store.publish(room, &presence).await;
    }

    /// Establishes the room's single backplane subscription, if one isn't
    /// already running, and waits for it to come up before returning. The
    /// lock is held across the `subscribe` call, so two concurrent connects
    /// to a fresh room can't race into subscribing twice; only the
    /// subsequent receive loop runs as a detached task.
    async fn ensure_room_fanout(&self, room: RoomId) {
        let mut fanout = self.inner.room_fanout.lock().await;
        if fanout.contains_key(&room) {
            return;
        }
        let sub = match self.inner.room_store.subscribe(&room).await {
            Ok(s) => s,
            Err(e) => {
                warn!(room = %room, error = %e, "failed to subscribe to room stream");
                return;
            }
        };
        let inner = self.inner.clone();
        let task_room = room.clone();
        let handle = tokio::spawn(async move {
            run_room_fanout(inner, task_room, sub).await;
        });
        fanout.insert(room, handle);
    }
}

async fn run_room_fanout(inner: Arc<Inner>, room: RoomId, mut sub: chatdebate_backplane::Subscription) {
    while let Some(payload) = sub.recv().await {
        if let Some(room_sessions) = inner.sessions.get(&room) {
            // A session whose send fails (full or closed) is dropped
            // silently rather than stalling delivery to everyone else.
            room_sessions.retain(|_, session| session.tx.try_send(payload.clone()).is_ok());
        }
    }

    inner.room_fanout.lock().await.remove(&room);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdebate_agent::AgentRegistry;
    use chatdebate_backplane::local::LocalBackplane;
    use chatdebate_core::config::AppConfig;
    use std::time::Duration;

    fn hub() -> Hub {
        let backplane = Arc::new(LocalBackplane::new());
        let room_store = Arc::new(RoomStore::new(backplane));
        let config = AppConfig::default();
        let registry = Arc::new(AgentRegistry::from_config(&config));
        let debates = Arc::new(DebateOrchestrator::new(room_store.clone(), registry, Duration::from_secs(15)));
        Hub::new(room_store, debates)
    }

    async fn drain_n(rx: &mut mpsc::Receiver<String>, n: usize) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        for _ in 0..n {
            let raw = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timed out waiting for frame")
                .expect("channel closed");
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn join_then_leave_announces_and_updates_presence() {
        let hub = hub();
        let room = RoomId::new("r1");
        let alice = UserRef::new("u1", "Alice");

        let mut conn = hub.connect(room.clone(), alice.clone()).await;
        // No history yet, so the first two frames are the join system
        // message and the presence snapshot.
        let frames = drain_n(&mut conn.outgoing, 2).await;
        assert_eq!(frames[0]["type"], "system");
        assert_eq!(frames[1]["type"], "presence");
        assert_eq!(frames[1]["meta"]["count"], 1);

        hub.disconnect(&room, &alice).await;
        assert_eq!(hub.online_sessions(&room), 0);
    }

    #[tokio::test]
    async fn history_replay_precedes_live_fanout() {
        let hub = hub();
        let room = RoomId::new("r1");
        let alice = UserRef::new("u1", "Alice");
        let bob = UserRef::new("u2", "Bob");

        let mut alice_conn = hub.connect(room.clone(), alice.clone()).await;
        drain_n(&mut alice_conn.outgoing, 2).await; // join + presence for alice herself

        hub.handle_inbound(
            &room,
            &alice,
            &serde_json::json!({"type": "message", "content": "hello"}).to_string(),
        )
        .await;
        // alice sees her own message fan out live.
        let own_echo = drain_n(&mut alice_conn.outgoing, 1).await;
        assert_eq!(own_echo[0]["content"], "hello");

        let mut bob_conn = hub.connect(room.clone(), bob.clone()).await;
        // Bob's very first frame must be the replayed history message, not
        // the join/presence noise his own connect is about to generate.
        let first = drain_n(&mut bob_conn.outgoing, 1).await;
        assert_eq!(first[0]["type"], "message");
        assert_eq!(first[0]["content"], "hello");
    }

    #[tokio::test]
    async fn reconnect_supersedes_old_session() {
        let hub = hub();
        let room = RoomId::new("r1");
        let alice = UserRef::new("u1", "Alice");

        let mut first = hub.connect(room.clone(), alice.clone()).await;
        drain_n(&mut first.outgoing, 2).await;

        let mut second = hub.connect(room.clone(), alice.clone()).await;
        drain_n(&mut second.outgoing, 2).await;

        hub.handle_inbound(
            &room,
            &alice,
            &serde_json::json!({"type": "message", "content": "hi"}).to_string(),
        )
        .await;

        // The superseded session's channel no longer receives live fan-out.
        let timed_out = tokio::time::timeout(Duration::from_millis(200), first.outgoing.recv()).await;
        assert!(timed_out.is_err() || timed_out.unwrap().is_none());

        let delivered = drain_n(&mut second.outgoing, 1).await;
        assert_eq!(delivered[0]["content"], "hi");
    }
}
