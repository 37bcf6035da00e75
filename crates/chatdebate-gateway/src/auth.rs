//! Guest identity issuance and the pluggable token verifier the WS
//! acceptance layer consults for non-guest tokens. Real deployments swap in
//! a verifier backed by whatever session store or JWT issuer they run;
//! nothing else in the gateway needs to change.

use chatdebate_protocol::validate::sanitize_display_name;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The sentinel that bypasses verification entirely. A client presenting any
/// other token must pass `TokenVerifier::verify`.
pub const GUEST_TOKEN: &str = "guest";

pub struct VerifiedUser {
    pub id: String,
    pub name: String,
}

pub trait TokenVerifier: Send + Sync {
    /// Never called with `GUEST_TOKEN` — see `ws::accept`.
    fn verify(&self, token: &str) -> Option<VerifiedUser>;
}

/// The only verifier this repo ships. Every non-guest token is rejected, so
/// in practice only guest sessions can connect until a real verifier is
/// wired in behind `AppState::verifier`.
pub struct GuestOnlyVerifier;

impl TokenVerifier for GuestOnlyVerifier {
    fn verify(&self, _token: &str) -> Option<VerifiedUser> {
        None
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub name: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: LoginUser,
    pub token: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Mints a fresh guest identity. The returned token is `GUEST_TOKEN` itself
/// — there's no session store behind it, so it's the only token `/ws` will
/// ever accept from a client that went through this endpoint.
pub fn issue_guest(req: LoginRequest) -> LoginResponse {
    let raw_name = req.display_name.as_deref().unwrap_or(&req.name);
    let name = sanitize_display_name(raw_name);
    LoginResponse {
        user: LoginUser {
            id: Uuid::new_v4().to_string(),
            name,
            avatar: None,
        },
        token: GUEST_TOKEN.to_string(),
        kind: "guest".to_string(),
    }
}
