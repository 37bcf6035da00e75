use chatdebate_backplane::Backplane;
use chatdebate_core::config::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitVerdict {
    pub allowed: bool,
    pub reset_in: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitInfo {
    pub remaining: f64,
    pub reset_in: f64,
}

const TTL_SECS: u64 = 10;

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

async fn read_bucket(bp: &dyn Backplane, key: &str, cfg: &RateLimitConfig) -> (f64, f64) {
    match bp.get(key).await.ok().flatten() {
        Some(raw) => parse_bucket(&raw, cfg),
        None => (now_secs(), cfg.max_requests as f64),
    }
}

fn parse_bucket(raw: &str, cfg: &RateLimitConfig) -> (f64, f64) {
    match raw.split_once(':') {
        Some((t, n)) => {
            let last_update = t.parse().unwrap_or_else(|_| now_secs());
            let tokens = n.parse().unwrap_or(cfg.max_requests as f64);
            (last_update, tokens)
        }
        None => (now_secs(), cfg.max_requests as f64),
    }
}

/// Token-bucket check per §4.B. Not atomic with respect to the backplane —
/// two concurrent requests for the same user may both read the same bucket
/// state and both allow. Accepted per spec; see `DESIGN.md`.
pub async fn check(bp: &dyn Backplane, key: &str, cfg: &RateLimitConfig) -> RateLimitVerdict {
    let now = now_secs();
    let (last_update, tokens) = read_bucket(bp, key, cfg).await;
    let elapsed = (now - last_update).max(0.0);
    let capacity = cfg.max_requests as f64;
    let refill_rate = capacity / cfg.window_secs as f64;
    let tokens = (tokens + elapsed * refill_rate).min(capacity);

    if tokens >= 1.0 {
        let remaining = tokens - 1.0;
        let _ = bp
            .set_with_ttl(key, &format!("{now}:{remaining}"), TTL_SECS)
            .await;
        RateLimitVerdict {
            allowed: true,
            reset_in: 0.0,
        }
    } else {
        let reset_in = (((1.0 - tokens) * capacity / cfg.window_secs as f64) - elapsed).max(0.0);
        RateLimitVerdict {
            allowed: false,
            reset_in,
        }
    }
}

/// Read-only view of the current bucket state, for diagnostics — does not
/// mutate the stored bucket.
pub async fn info(bp: &dyn Backplane, key: &str, cfg: &RateLimitConfig) -> RateLimitInfo {
    let now = now_secs();
    let (last_update, tokens) = read_bucket(bp, key, cfg).await;
    let elapsed = (now - last_update).max(0.0);
    let capacity = cfg.max_requests as f64;
    let refill_rate = capacity / cfg.window_secs as f64;
    let tokens = (tokens + elapsed * refill_rate).min(capacity);
    let reset_in = (((1.0 - tokens) * capacity / cfg.window_secs as f64) - elapsed).max(0.0);
    RateLimitInfo {
        remaining: tokens,
        reset_in,
    }
}
