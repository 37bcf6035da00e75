use chatdebate_core::RoomId;
use chatdebate_protocol::envelope::UserRef;
use chatdebate_protocol::validate::{sanitize_display_name, sanitize_id};
use serde::Deserialize;

use crate::auth::{TokenVerifier, GUEST_TOKEN};

#[derive(Deserialize)]
pub struct ConnectQuery {
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_token")]
    pub token: String,
}

fn default_room() -> String {
    "general".to_string()
}

fn default_user_id() -> String {
    "anonymous".to_string()
}

fn default_user_name() -> String {
    "Guest".to_string()
}

fn default_token() -> String {
    GUEST_TOKEN.to_string()
}

/// Resolves a connect request to `(room, user)`, or `None` if the presented
/// token is neither `GUEST_TOKEN` nor accepted by `verifier` — the caller
/// closes the socket with code 1008 in that case.
pub fn resolve(query: ConnectQuery, verifier: &dyn TokenVerifier) -> Option<(RoomId, UserRef)> {
    let room = sanitize_id(&query.room);
    let mut user_id = sanitize_id(&query.user_id);
    let mut user_name = sanitize_display_name(&query.user_name);

    if query.token != GUEST_TOKEN {
        let verified = verifier.verify(&query.token)?;
        user_id = verified.id;
        user_name = verified.name;
    }

    Some((RoomId::new(room), UserRef::new(user_id, user_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{GuestOnlyVerifier, VerifiedUser};

    struct AcceptAll;
    impl TokenVerifier for AcceptAll {
        fn verify(&self, token: &str) -> Option<VerifiedUser> {
            Some(VerifiedUser {
                id: format!("verified-{token}"),
                name: "Verified".to_string(),
            })
        }
    }

    fn query(room: &str, user_id: &str, user_name: &str, token: &str) -> ConnectQuery {
        ConnectQuery {
            room: room.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            token: token.to_string(),
        }
    }

    #[test]
    fn guest_token_trusts_query_params_after_sanitizing() {
        let q = query("room one!", "user/1", "  Alice  ", GUEST_TOKEN);
        let (room, user) = resolve(q, &GuestOnlyVerifier).expect("accepted");
        assert_eq!(room.as_str(), "roomone");
        assert_eq!(user.id, "user1");
        assert_eq!(user.name, "Alice");
    }

    #[test]
    fn non_guest_token_rejected_by_default_verifier() {
        let q = query("general", "u1", "Alice", "some-jwt");
        assert!(resolve(q, &GuestOnlyVerifier).is_none());
    }

    #[test]
    fn non_guest_token_accepted_by_a_real_verifier() {
        let q = query("general", "u1", "Alice", "some-jwt");
        let (_, user) = resolve(q, &AcceptAll).expect("accepted");
        assert_eq!(user.id, "verified-some-jwt");
        assert_eq!(user.name, "Verified");
    }
}
