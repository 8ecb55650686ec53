//! Request handlers and the admission middleware.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::ratelimit::AdmissionControl;

/// Plain-text body sent with every rejected request.
pub const REJECTION_BODY: &str = "Too many requests\n";

/// Build the service router with every route guarded by `limiter`.
pub fn router<A: AdmissionControl + 'static>(limiter: Arc<A>) -> Router {
    with_admission(Router::new().route("/", get(hello)), limiter)
}

/// Guard all routes currently in `router` with `limiter`.
///
/// Routes merged in afterwards are not affected, so different route groups
/// can be given different limiters. Unmatched paths do not consume tokens.
pub fn with_admission<A: AdmissionControl + 'static>(router: Router, limiter: Arc<A>) -> Router {
    router.route_layer(middleware::from_fn_with_state(limiter, admission::<A>))
}

/// Admission middleware: ask the limiter once, before any request work.
pub async fn admission<A: AdmissionControl>(
    State(limiter): State<Arc<A>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.admit() {
        next.run(request).await
    } else {
        let retry_after = limiter.retry_after().as_secs().max(1);
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            REJECTION_BODY,
        )
            .into_response()
    }
}

async fn hello() -> &'static str {
    "Hello, World!"
}
