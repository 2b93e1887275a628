#![cfg(feature = "inmem-store")]

#[macro_use]
mod common;

use actix_web::test;
use common::{bearer, json_body, Harness};
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

#[actix_web::test]
#[serial]
async fn conversation_messages_and_unread() {
    let h = Harness::new();
    let (a, a_token) = h.user("a@example.com", false).await;
    let (b, b_token) = h.user("b@example.com", false).await;
    let (_, outsider) = h.user("c@example.com", false).await;
    let app = test_app!(h);

    // cannot message yourself or a stranger that does not exist
    let req = test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(&a_token))
        .set_json(json!({"peer_id": a}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(&a_token))
        .set_json(json!({"peer_id": Uuid::new_v4()}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(&a_token))
        .set_json(json!({"peer_id": b}))
        .to_request();
    let convo = json_body(test::call_service(&app, req).await).await;
    let convo_id = convo["id"].as_str().unwrap().to_string();

    // opening from the other side returns the same row
    let req = test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(&b_token))
        .set_json(json!({"peer_id": a}))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["id"], convo["id"]);

    let send = |token: &str, content: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{convo_id}/messages"))
            .insert_header(bearer(token))
            .set_json(json!({"content": content}))
            .to_request()
    };

    assert_eq!(test::call_service(&app, send(&a_token, "   ")).await.status(), 400);
    assert_eq!(test::call_service(&app, send(&outsider, "hello?")).await.status(), 403);

    let resp = test::call_service(&app, send(&a_token, "  Hi there ")).await;
    assert_eq!(resp.status(), 201);
    assert_eq!(json_body(resp).await["content"], "Hi there");
    test::call_service(&app, send(&a_token, "Free on Saturday?")).await;

    let req = test::TestRequest::get().uri("/api/v1/messages/unread").insert_header(bearer(&b_token)).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["count"], 2);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{convo_id}/messages"))
        .insert_header(bearer(&outsider))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{convo_id}/messages"))
        .insert_header(bearer(&b_token))
        .to_request();
    let msgs = json_body(test::call_service(&app, req).await).await;
    assert_eq!(msgs.as_array().unwrap().len(), 2);
    assert_eq!(msgs[0]["content"], "Hi there");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/conversations/{convo_id}/read"))
        .insert_header(bearer(&b_token))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["count"], 2);

    let req = test::TestRequest::get().uri("/api/v1/messages/unread").insert_header(bearer(&b_token)).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["count"], 0);

    let req = test::TestRequest::get().uri("/api/v1/conversations").insert_header(bearer(&b_token)).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);
}
