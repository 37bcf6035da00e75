use axum::Json;
use serde_json::{json, Value};

/// `GET /` — server banner.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Chatdebate Chat API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
    }))
}
