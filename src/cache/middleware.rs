//! Cache scope middleware.
//!
//! Wraps every request in its own local cache scope. The
//! `force_external_cache_miss` query parameter is read on the way in; the
//! scope is cleared on the way out. Server errors take the failure exit.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::Query,
    http::{Request, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use super::{local, scope::ScopeBoundaryHook};

/// Middleware installing a fresh local cache scope per request.
///
/// ```ignore
/// let app = Router::new()
///     .route("/products/{id}", get(product))
///     .with_state(cache)
///     .layer(axum::middleware::from_fn(cache_scope_layer));
/// ```
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn cache_scope_layer(request: Request<Body>, next: Next) -> Response {
    let hook = ScopeBoundaryHook;
    let store = hook.on_scope_enter(&query_params(request.uri()));

    local::scope(store, async move {
        let response = next.run(request).await;
        if response.status().is_server_error() {
            hook.on_scope_exit_failure(response)
        } else {
            hook.on_scope_exit_success(response)
        }
    })
    .await
}

fn query_params(uri: &Uri) -> HashMap<String, String> {
    match Query::<HashMap<String, String>>::try_from_uri(uri) {
        Ok(Query(params)) => params,
        Err(err) => {
            debug!(error = %err, "ignoring unparseable query string");
            HashMap::new()
        }
    }
}
