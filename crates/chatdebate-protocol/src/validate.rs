use once_cell::sync::Lazy;
use regex::Regex;

use chatdebate_core::config::MAX_MESSAGE_LEN;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,50}$").expect("static id pattern"));

/// Validates a room or user id against `^[A-Za-z0-9_-]{1,50}$`.
pub fn is_valid_id(s: &str) -> bool {
    ID_PATTERN.is_match(s)
}

/// Strips anything not `[A-Za-z0-9_-]` then truncates to 50 chars, matching
/// the sanitize-then-truncate treatment the query-param `room`/`user_id`
/// values receive on connect.
pub fn sanitize_id(s: &str) -> String {
    let cleaned: String = s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect();
    cleaned.chars().take(50).collect()
}

/// Trims and truncates a display name to 50 chars.
pub fn sanitize_display_name(s: &str) -> String {
    s.trim().chars().take(50).collect()
}

pub fn content_too_long(content: &str) -> bool {
    content.chars().count() > MAX_MESSAGE_LEN
}
