use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use turnstile::http::router;
use turnstile::ratelimit::{AdmissionControl, RateLimiter};

async fn status_of(app: &Router) -> StatusCode {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test(start_paused = true)]
async fn burst_of_capacity_then_429_until_refill() {
    let limiter = Arc::new(RateLimiter::new(10.0, 10).unwrap());
    let app = router(Arc::clone(&limiter));

    for _ in 0..10 {
        assert_eq!(status_of(&app).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app).await, StatusCode::TOO_MANY_REQUESTS);

    // Half an interval later the bucket is still empty
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(status_of(&app).await, StatusCode::TOO_MANY_REQUESTS);

    // One interval after construction a fresh burst of 10 succeeds
    tokio::time::sleep(Duration::from_millis(60)).await;
    for _ in 0..10 {
        assert_eq!(status_of(&app).await, StatusCode::OK);
    }
    assert_eq!(status_of(&app).await, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn rejection_carries_retry_after() {
    let limiter = Arc::new(RateLimiter::new(0.25, 1).unwrap());
    let app = router(Arc::clone(&limiter));

    assert_eq!(status_of(&app).await, StatusCode::OK);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "4");
    assert_eq!(limiter.retry_after(), Duration::from_secs(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_admit_exactly_capacity() {
    // Refill every 1000 seconds so the race sees a single window
    let limiter = Arc::new(RateLimiter::new(0.001, 25).unwrap());
    let app = router(Arc::clone(&limiter));

    let requests = (0..200).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { status_of(&app).await })
    });

    let statuses: Vec<StatusCode> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();

    assert_eq!(ok, 25);
    assert_eq!(rejected, 175);
    assert_eq!(limiter.available(), 0);
}

#[tokio::test]
async fn rate_limiter_poll_is_immediate() {
    let limiter = RateLimiter::new(1.0, 1).unwrap();

    // The decision never yields, whatever the outcome
    let mut admitted = tokio_test::task::spawn(async { limiter.admit() });
    tokio_test::assert_ready_eq!(admitted.poll(), true);

    let mut rejected = tokio_test::task::spawn(async { limiter.admit() });
    tokio_test::assert_ready_eq!(rejected.poll(), false);
}
