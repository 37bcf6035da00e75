use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::{Backplane, Result, Subscription};

struct TtlEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl TtlEntry {
    fn is_live(&self) -> bool {
        self.expires_at.map(|t| Instant::now() < t).unwrap_or(true)
    }
}

/// In-process backplane: one `DashMap` per data kind, keyed by the same
/// strings the redis backend would use. Used for single-instance deployments
/// and for tests that would otherwise need a live redis server.
#[derive(Default)]
pub struct LocalBackplane {
    channels: DashMap<String, broadcast::Sender<String>>,
    lists: DashMap<String, Mutex<Vec<String>>>,
    sets: DashMap<String, Mutex<HashSet<String>>>,
    strings: DashMap<String, TtlEntry>,
}

impl LocalBackplane {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

#[async_trait]
impl Backplane for LocalBackplane {
    fn connected(&self) -> bool {
        true
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        // No subscribers is not an error — best-effort fan-out, matching §4.A.
        let _ = self.channel(channel).send(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        let mut broadcast_rx = self.channel(channel).subscribe();
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(rx))
    }

    async fn list_push_front_trim(&self, key: &str, item: &str, maxlen: usize) -> Result<()> {
        let entry = self.lists.entry(key.to_string()).or_default();
        let mut list = entry.lock().unwrap();
        list.insert(0, item.to_string());
        list.truncate(maxlen);
        Ok(())
    }

    async fn list_range(&self, key: &str, maxlen: usize) -> Result<Vec<String>> {
        match self.lists.get(key) {
            Some(entry) => {
                let list = entry.lock().unwrap();
                Ok(list.iter().take(maxlen).cloned().collect())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let entry = self.sets.entry(key.to_string()).or_default();
        entry.lock().unwrap().insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        if let Some(entry) = self.sets.get(key) {
            entry.lock().unwrap().remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        match self.sets.get(key) {
            Some(entry) => Ok(entry.lock().unwrap().iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn set_card(&self, key: &str) -> Result<usize> {
        Ok(self.set_members(key).await?.len())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.strings.insert(
            key.to_string(),
            TtlEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.strings.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                self.strings.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.strings.remove(key);
        self.lists.remove(key);
        self.sets.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        match self.strings.get(key) {
            Some(entry) if entry.is_live() => match entry.expires_at {
                Some(at) => Ok(Some(at.saturating_duration_since(Instant::now()).as_secs() as i64)),
                None => Ok(None),
            },
            Some(_) => {
                self.strings.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        if let Some(mut entry) = self.strings.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        // Lists/sets in this implementation live for the process lifetime;
        // the redis backend is the one that actually enforces container TTLs.
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .strings
            .iter()
            .filter(|e| e.is_live())
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_subscribe_round_trip() {
        let bp = LocalBackplane::new();
        let mut sub = bp.subscribe("ch").await.unwrap();
        bp.publish("ch", "hello").await.unwrap();
        let got = sub.recv().await;
        assert_eq!(got.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn list_push_front_trim_keeps_newest_first_and_bounded() {
        let bp = LocalBackplane::new();
        for i in 0..5 {
            bp.list_push_front_trim("k", &i.to_string(), 3).await.unwrap();
        }
        let items = bp.list_range("k", 3).await.unwrap();
        assert_eq!(items, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn set_add_remove_round_trip() {
        let bp = LocalBackplane::new();
        bp.set_add("s", "a").await.unwrap();
        bp.set_add("s", "b").await.unwrap();
        assert_eq!(bp.set_card("s").await.unwrap(), 2);
        bp.set_remove("s", "a").await.unwrap();
        assert_eq!(bp.set_card("s").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ttl_string_expires() {
        let bp = LocalBackplane::new();
        bp.set_with_ttl("t", "name", 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(bp.get("t").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ttl_reports_remaining_seconds_then_none_once_expired() {
        let bp = LocalBackplane::new();
        bp.set_with_ttl("t", "name", 30).await.unwrap();
        let remaining = bp.ttl("t").await.unwrap().expect("has a ttl");
        assert!(remaining > 0 && remaining <= 30);

        bp.set_with_ttl("t", "name", 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(bp.ttl("t").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ttl_is_none_for_missing_key() {
        let bp = LocalBackplane::new();
        assert_eq!(bp.ttl("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_matches_prefix_pattern() {
        let bp = LocalBackplane::new();
        bp.set_with_ttl("ws:rooms:r1:typing:u1", "Alice", 5)
            .await
            .unwrap();
        bp.set_with_ttl("ws:rooms:r1:typing:u2", "Bob", 5)
            .await
            .unwrap();
        bp.set_with_ttl("ws:rooms:r2:typing:u3", "Carl", 5)
            .await
            .unwrap();
        let keys = bp.keys("ws:rooms:r1:typing:*").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
