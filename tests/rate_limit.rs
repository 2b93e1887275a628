#![cfg(feature = "inmem-store")]

#[macro_use]
mod common;

use actix_web::test;
use chrono::{Duration, Utc};
use common::{bearer, json_body, Harness};
use folioo::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use serde_json::json;

fn tight_limits() -> RateLimiterFacade {
    // only one booking and one message per large window so the second is denied immediately
    let cfg = RateLimitConfig {
        booking_limit: 1,
        booking_window: std::time::Duration::from_secs(300),
        message_limit: 1,
        message_window: std::time::Duration::from_secs(300),
        upload_limit: 100,
        upload_window: std::time::Duration::from_secs(3600),
    };
    RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg)
}

#[actix_web::test]
#[serial_test::serial]
async fn booking_creation_is_rate_limited() {
    let h = Harness::new().with_rate_limiter(tight_limits());
    let (_, client) = h.user("client@example.com", false).await;
    let (creative, _) = h.user("creative@example.com", false).await;
    let app = test_app!(h);
    let date = (Utc::now().date_naive() + Duration::days(2)).to_string();

    let book = || {
        test::TestRequest::post()
            .uri("/api/v1/bookings")
            .insert_header(bearer(&client))
            .set_json(json!({"creative_id": creative, "date": date}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, book()).await.status(), 201, "first booking allowed");
    let resp = test::call_service(&app, book()).await;
    assert_eq!(resp.status(), 429, "second booking should be rate limited");
    assert_eq!(json_body(resp).await["error"], "too many requests");
}

#[actix_web::test]
#[serial_test::serial]
async fn message_send_is_rate_limited_per_user() {
    let h = Harness::new().with_rate_limiter(tight_limits());
    let (a, a_token) = h.user("a@example.com", false).await;
    let (_, b_token) = h.user("b@example.com", false).await;
    let app = test_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(&b_token))
        .set_json(json!({"peer_id": a}))
        .to_request();
    let convo_id = json_body(test::call_service(&app, req).await).await["id"].as_str().unwrap().to_string();

    let send = |token: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{convo_id}/messages"))
            .insert_header(bearer(token))
            .set_json(json!({"content": "ping"}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, send(&a_token)).await.status(), 201);
    assert_eq!(test::call_service(&app, send(&a_token)).await.status(), 429);
    // the other participant has their own budget
    assert_eq!(test::call_service(&app, send(&b_token)).await.status(), 201);
}
