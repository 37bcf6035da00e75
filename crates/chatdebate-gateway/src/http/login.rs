use axum::Json;

use crate::auth::{issue_guest, LoginRequest, LoginResponse};

/// `POST /auth/login` — mints a guest identity. There is no real account
/// system behind this; it exists so a client has somewhere to get a
/// `user_id`/`user_name`/`token` triple to open `/ws` with.
pub async fn login_handler(Json(req): Json<LoginRequest>) -> Json<LoginResponse> {
    Json(issue_guest(req))
}
