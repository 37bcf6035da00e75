//! §4.B room store: a thin typed layer over the backplane. Key names follow
//! the schema in `SPEC_FULL.md` §6 exactly.

pub mod keys;
pub mod ratelimit;

use std::sync::Arc;

use chatdebate_backplane::{Backplane, Subscription};
use chatdebate_core::config::{HistoryConfig, RateLimitConfig, PRESENCE_TTL_SECS, TYPING_TTL_SECS};
use chatdebate_core::RoomId;
use chatdebate_protocol::envelope::{Message, UserRef};
use serde_json::json;

pub use ratelimit::{RateLimitInfo, RateLimitVerdict};

pub struct RoomStore {
    backplane: Arc<dyn Backplane>,
    rate_limit: RateLimitConfig,
    history: HistoryConfig,
}

impl RoomStore {
    pub fn new(backplane: Arc<dyn Backplane>) -> Self {
        Self::with_config(backplane, RateLimitConfig::default(), HistoryConfig::default())
    }

    pub fn with_config(
        backplane: Arc<dyn Backplane>,
        rate_limit: RateLimitConfig,
        history: HistoryConfig,
    ) -> Self {
        Self {
            backplane,
            rate_limit,
            history,
        }
    }

    pub fn backplane(&self) -> &Arc<dyn Backplane> {
        &self.backplane
    }

    pub async fn publish(&self, room: &RoomId, msg: &Message) {
        if let Ok(payload) = serde_json::to_string(msg) {
            let _ = self.backplane.publish(&keys::stream(room), &payload).await;
        }
    }

    pub async fn subscribe(&self, room: &RoomId) -> chatdebate_backplane::Result<Subscription> {
        self.backplane.subscribe(&keys::stream(room)).await
    }

    /// Appends `msg` to history, trims to the configured length, refreshes the TTL.
    pub async fn append_history(&self, room: &RoomId, msg: &Message) {
        let Ok(payload) = serde_json::to_string(msg) else {
            return;
        };
        let key = keys::history(room);
        let _ = self
            .backplane
            .list_push_front_trim(&key, &payload, self.history.max_len)
            .await;
        let _ = self.backplane.expire(&key, self.history.ttl_secs).await;
    }

    /// Up to the configured history length, chronologically oldest-first.
    pub async fn read_history(&self, room: &RoomId) -> Vec<Message> {
        let key = keys::history(room);
        let raw = self
            .backplane
            .list_range(&key, self.history.max_len)
            .await
            .unwrap_or_default();
        let mut messages: Vec<Message> = raw
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect();
        messages.reverse();
        messages
    }

    /// Adds `user` to presence, normalized to `{"id": ...}` so leave is
    /// symmetric regardless of name/avatar changes (§9 open question).
    pub async fn join(&self, room: &RoomId, user: &UserRef) {
        let key = keys::online(room);
        let member = user.presence_key().to_string();
        let _ = self.backplane.set_add(&key, &member).await;
        let _ = self.backplane.expire(&key, PRESENCE_TTL_SECS).await;
    }

    pub async fn leave(&self, room: &RoomId, user: &UserRef) {
        let key = keys::online(room);
        let member = user.presence_key().to_string();
        let _ = self.backplane.set_remove(&key, &member).await;
    }

    pub async fn online_count(&self, room: &RoomId) -> usize {
        self.backplane
            .set_card(&keys::online(room))
            .await
            .unwrap_or(0)
    }

    pub async fn online_users(&self, room: &RoomId) -> Vec<serde_json::Value> {
        self.backplane
            .set_members(&keys::online(room))
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }

    pub async fn start_typing(&self, room: &RoomId, user_id: &str, name: &str) {
        let key = keys::typing(room, user_id);
        let _ = self.backplane.set_with_ttl(&key, name, TYPING_TTL_SECS).await;
    }

    pub async fn clear_typing(&self, room: &RoomId, user_id: &str) {
        let _ = self.backplane.delete(&keys::typing(room, user_id)).await;
    }

    /// Reconstructs `{id, name}` tuples for everyone currently typing in `room`.
    pub async fn typing_snapshot(&self, room: &RoomId) -> Vec<serde_json::Value> {
        let pattern = keys::typing_pattern(room);
        let prefix = keys::typing_prefix(room);
        let mut out = Vec::new();
        for key in self.backplane.keys(&pattern).await.unwrap_or_default() {
            let Some(user_id) = key.strip_prefix(&prefix) else {
                continue;
            };
            if let Ok(Some(name)) = self.backplane.get(&key).await {
                out.push(json!({ "id": user_id, "name": name }));
            }
        }
        out
    }

    pub async fn check_rate_limit(&self, room: &RoomId, user_id: &str) -> RateLimitVerdict {
        ratelimit::check(
            self.backplane.as_ref(),
            &keys::ratelimit(room, user_id),
            &self.rate_limit,
        )
        .await
    }

    pub async fn rate_limit_info(&self, room: &RoomId, user_id: &str) -> RateLimitInfo {
        ratelimit::info(
            self.backplane.as_ref(),
            &keys::ratelimit(room, user_id),
            &self.rate_limit,
        )
        .await
    }

    pub async fn room_stats(&self, room: &RoomId) -> serde_json::Value {
        json!({
            "room": room.as_str(),
            "online_count": self.online_count(room).await,
            "history_len": self.read_history(room).await.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdebate_backplane::local::LocalBackplane;
    use chatdebate_protocol::envelope::FrameType;

    fn store() -> RoomStore {
        RoomStore::new(Arc::new(LocalBackplane::new()))
    }

    #[tokio::test]
    async fn history_is_bounded_and_chronological() {
        let store = store();
        let room = RoomId::new("r1");
        for i in 0..3 {
            let msg = Message {
                kind: FrameType::Message,
                room: room.as_str().to_string(),
                user: UserRef::new("u1", "Alice"),
                content: Some(format!("msg{i}")),
                ts: i,
                client_id: None,
                meta: json!({}),
            };
            store.append_history(&room, &msg).await;
        }
        let history = store.read_history(&room).await;
        let contents: Vec<_> = history.iter().filter_map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["msg0", "msg1", "msg2"]);
    }

    #[tokio::test]
    async fn join_then_leave_restores_presence_cardinality() {
        let store = store();
        let room = RoomId::new("r1");
        let before = store.online_count(&room).await;
        let user = UserRef::new("u1", "Alice");
        store.join(&room, &user).await;
        assert_eq!(store.online_count(&room).await, before + 1);
        store.leave(&room, &user).await;
        assert_eq!(store.online_count(&room).await, before);
    }

    #[tokio::test]
    async fn join_leave_symmetric_despite_name_change() {
        let store = store();
        let room = RoomId::new("r1");
        store.join(&room, &UserRef::new("u1", "Alice")).await;
        // Leave with a differently-named record for the same id.
        store.leave(&room, &UserRef::new("u1", "Alice Renamed")).await;
        assert_eq!(store.online_count(&room).await, 0);
    }

    #[tokio::test]
    async fn typing_snapshot_reflects_active_indicators() {
        let store = store();
        let room = RoomId::new("r1");
        store.start_typing(&room, "u1", "Alice").await;
        let snapshot = store.typing_snapshot(&room).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0]["id"], "u1");
    }
}
