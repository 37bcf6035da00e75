pub mod debate;
pub mod health;
pub mod login;
pub mod root;

use tower_http::cors::{AllowOrigin, CorsLayer};

/// Builds the CORS layer from `server.allowed_origins`. A bare `*` allows
/// any origin; otherwise each entry is parsed as an exact origin to allow.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(tower_http::cors::Any);
    }

    let origins: Vec<axum::http::HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
