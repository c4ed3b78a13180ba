pub mod handlers;

use std::fmt::Debug;
use std::future::Future;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::serve::Listener;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use handlers::ApiState;

/// CORS policy for the HTTP side. `*` allows any origin.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = if allowed_origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(allowed_origin.trim())
            .with_context(|| format!("invalid allowed origin {allowed_origin:?}"))?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// The relay's routes: the signaling WebSocket at `/` and `/get_users`.
pub fn app(state: ApiState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::handle_signal))
        .route("/get_users", get(handlers::handle_get_users))
        .with_state(state)
        .layer(cors)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<L, F>(listener: L, app: Router, shutdown: F) -> anyhow::Result<()>
where
    L: Listener,
    L::Addr: Debug,
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
