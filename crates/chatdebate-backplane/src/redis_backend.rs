use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, warn};

use crate::{Backplane, Result, Subscription};

/// Redis-backed backplane. Degrades to no-op writes / empty reads when the
/// server is unreachable rather than propagating the error to callers — see
/// §4.A: client sessions must stay up through a backplane outage.
pub struct RedisBackplane {
    client: redis::Client,
    manager: Mutex<Option<ConnectionManager>>,
    connected: AtomicBool,
}

impl RedisBackplane {
    pub async fn connect(url: &str) -> Self {
        let client = match redis::Client::open(url) {
            Ok(c) => c,
            Err(e) => {
                error!(url, error = %e, "invalid backplane url");
                return Self {
                    client: redis::Client::open("redis://127.0.0.1:0").expect("dummy client url"),
                    manager: Mutex::new(None),
                    connected: AtomicBool::new(false),
                };
            }
        };

        match client.get_connection_manager().await {
            Ok(manager) => Self {
                client,
                manager: Mutex::new(Some(manager)),
                connected: AtomicBool::new(true),
            },
            Err(e) => {
                warn!(url, error = %e, "backplane unreachable at startup, degrading to no-op");
                Self {
                    client,
                    manager: Mutex::new(None),
                    connected: AtomicBool::new(false),
                }
            }
        }
    }

    async fn conn(&self) -> Option<ConnectionManager> {
        self.manager.lock().await.clone()
    }

    fn mark_failed(&self, op: &str, err: &redis::RedisError) {
        warn!(op, error = %err, "backplane command failed, degrading");
        self.connected.store(false, Ordering::Relaxed);
    }
}

#[async_trait]
impl Backplane for RedisBackplane {
    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.publish::<_, _, ()>(channel, payload).await {
            self.mark_failed("publish", &e);
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        if !self.connected() {
            return Ok(Subscription::closed());
        }
        let client = self.client.clone();
        let channel = channel.to_string();
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "failed to open backplane subscription");
                    return;
                }
            };
            if let Err(e) = pubsub.subscribe(&channel).await {
                warn!(error = %e, channel, "failed to subscribe to backplane channel");
                return;
            }
            let mut stream = pubsub.on_message();
            use futures_util::StreamExt;
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::new(rx))
    }

    async fn list_push_front_trim(&self, key: &str, item: &str, maxlen: usize) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        let result: std::result::Result<(), redis::RedisError> = async {
            let _: () = conn.lpush(key, item).await?;
            let _: () = conn.ltrim(key, 0, maxlen as isize - 1).await?;
            Ok(())
        }
        .await;
        if let Err(e) = result {
            self.mark_failed("list_push_front_trim", &e);
        }
        Ok(())
    }

    async fn list_range(&self, key: &str, maxlen: usize) -> Result<Vec<String>> {
        let Some(mut conn) = self.conn().await else {
            return Ok(Vec::new());
        };
        match conn.lrange(key, 0, maxlen as isize - 1).await {
            Ok(items) => Ok(items),
            Err(e) => {
                self.mark_failed("list_range", &e);
                Ok(Vec::new())
            }
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.sadd::<_, _, ()>(key, member).await {
            self.mark_failed("set_add", &e);
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.srem::<_, _, ()>(key, member).await {
            self.mark_failed("set_remove", &e);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let Some(mut conn) = self.conn().await else {
            return Ok(Vec::new());
        };
        match conn.smembers(key).await {
            Ok(members) => Ok(members),
            Err(e) => {
                self.mark_failed("set_members", &e);
                Ok(Vec::new())
            }
        }
    }

    async fn set_card(&self, key: &str) -> Result<usize> {
        let Some(mut conn) = self.conn().await else {
            return Ok(0);
        };
        match conn.scard(key).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.mark_failed("set_card", &e);
                Ok(0)
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            self.mark_failed("set_with_ttl", &e);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(mut conn) = self.conn().await else {
            return Ok(None);
        };
        match conn.get(key).await {
            Ok(v) => Ok(v),
            Err(e) => {
                self.mark_failed("get", &e);
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.del::<_, ()>(key).await {
            self.mark_failed("delete", &e);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<i64>> {
        let Some(mut conn) = self.conn().await else {
            return Ok(None);
        };
        match conn.ttl(key).await {
            // TTL replies -2 (no such key) and -1 (no expiry set) both mean "no TTL" to callers.
            Ok(secs) if secs >= 0 => Ok(Some(secs)),
            Ok(_) => Ok(None),
            Err(e) => {
                self.mark_failed("ttl", &e);
                Ok(None)
            }
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let Some(mut conn) = self.conn().await else {
            return Ok(());
        };
        if let Err(e) = conn.expire::<_, ()>(key, ttl_secs as i64).await {
            self.mark_failed("expire", &e);
        }
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let Some(mut conn) = self.conn().await else {
            return Ok(Vec::new());
        };
        match conn.keys(pattern).await {
            Ok(keys) => Ok(keys),
            Err(e) => {
                self.mark_failed("keys", &e);
                Ok(Vec::new())
            }
        }
    }
}
