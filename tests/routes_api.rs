#![cfg(feature = "inmem-store")]

#[macro_use]
mod common;

use actix_web::test;
use chrono::{Duration, Utc};
use common::{bearer, json_body, Harness};
use folioo::models::ProfileStatus;
use folioo::repo::ProfileRepo;
use serde_json::json;
use serial_test::serial;

#[actix_web::test]
#[serial]
async fn sign_up_sign_in_and_me() {
    let h = Harness::new();
    std::env::set_var("BOOTSTRAP_ADMIN_EMAILS", "boss@folioo.test");
    let app = test_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "Naledi@Example.com", "password": "supersecret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body = json_body(resp).await;
    assert_eq!(body["roles"], json!(["user"]));

    // duplicate, different case
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "naledi@example.com", "password": "supersecret"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    // validation messages surface as 400 text
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "x@example.com", "password": "short"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("8 characters"));

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signin")
        .set_json(json!({"email": "naledi@example.com", "password": "wrongpassword"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signin")
        .set_json(json!({"email": "naledi@example.com", "password": "supersecret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let token = json_body(resp).await["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get().uri("/api/v1/auth/me").insert_header(bearer(&token)).to_request();
    let me = json_body(test::call_service(&app, req).await).await;
    assert_eq!(me["email"], "naledi@example.com");

    // bootstrap admin
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "boss@folioo.test", "password": "supersecret"}))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["roles"], json!(["user", "admin"]));
    std::env::remove_var("BOOTSTRAP_ADMIN_EMAILS");
}

#[actix_web::test]
#[serial]
async fn banned_account_cannot_sign_in_or_act() {
    let h = Harness::new();
    let app = test_app!(h);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "banned@example.com", "password": "supersecret"}))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    let token = body["token"].as_str().unwrap().to_string();
    let id = body["user_id"].as_str().unwrap().parse().unwrap();
    h.repo.set_profile_status(id, ProfileStatus::Banned).await.unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signin")
        .set_json(json!({"email": "banned@example.com", "password": "supersecret"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::put()
        .uri("/api/v1/profiles/me")
        .insert_header(bearer(&token))
        .set_json(json!({"name": "Still here"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/password")
        .insert_header(bearer(&token))
        .set_json(json!({"current_password": "supersecret", "new_password": "anothersecret"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get().uri("/api/v1/profiles").to_request();
    let list = json_body(test::call_service(&app, req).await).await;
    assert!(list.as_array().unwrap().is_empty(), "banned profiles are hidden from explore");
}

#[actix_web::test]
#[serial]
async fn profile_edit_completion_and_explore() {
    let h = Harness::new();
    let (_, token) = h.user("thandi@example.com", false).await;
    let (_, other) = h.user("reel@example.com", false).await;
    let app = test_app!(h);

    let req = test::TestRequest::get().uri("/api/v1/profiles/me/completion").insert_header(bearer(&token)).to_request();
    let c = json_body(test::call_service(&app, req).await).await;
    assert_eq!(c["complete"], false);
    assert_eq!(c["missing"][0], "Name");

    let req = test::TestRequest::put()
        .uri("/api/v1/profiles/me")
        .insert_header(bearer(&token))
        .set_json(json!({"name": "Thandi", "specialties": ["Photographer"], "location": "Cape Town", "price": 450}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::put()
        .uri("/api/v1/profiles/me")
        .insert_header(bearer(&other))
        .set_json(json!({"name": "Reel Nomad", "specialties": ["Videographer"], "location": "Durban", "price": 1500}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri("/api/v1/profiles/me")
        .insert_header(bearer(&other))
        .set_json(json!({"price": -5}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/api/v1/profiles/me/completion").insert_header(bearer(&token)).to_request();
    let c = json_body(test::call_service(&app, req).await).await;
    assert_eq!(c["missing"], json!(["Bio", "Profile Photo", "Portfolio Images"]));

    let req = test::TestRequest::get().uri("/api/v1/profiles?location=Cape%20Town&specialty=All").to_request();
    let list = json_body(test::call_service(&app, req).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Thandi");
    assert!(list[0]["rating"].is_null());

    let req = test::TestRequest::get().uri("/api/v1/profiles?price=high").to_request();
    let list = json_body(test::call_service(&app, req).await).await;
    assert_eq!(list[0]["name"], "Reel Nomad");

    let req = test::TestRequest::get().uri("/api/v1/profiles?q=video").to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().len(), 1);
}

#[actix_web::test]
#[serial]
async fn booking_answer_and_review_flow() {
    let h = Harness::new();
    let (client, client_token) = h.user("client@example.com", false).await;
    let (creative, creative_token) = h.user("creative@example.com", false).await;
    let app = test_app!(h);
    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();
    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();

    // self-booking and past dates are rejected
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(bearer(&client_token))
        .set_json(json!({"creative_id": client, "date": tomorrow}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(bearer(&client_token))
        .set_json(json!({"creative_id": creative, "date": yesterday}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(bearer(&client_token))
        .set_json(json!({"creative_id": creative, "date": tomorrow, "message": "  Engagement shoot "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let booking = json_body(resp).await;
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["message"], "Engagement shoot");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    {
        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].creative.email, "creative@example.com");
        assert_eq!(sent[0].client.email, "client@example.com");
    }

    let req = test::TestRequest::get().uri("/api/v1/bookings/unread").insert_header(bearer(&creative_token)).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["count"], 1);

    // review before acceptance
    let req = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .insert_header(bearer(&client_token))
        .set_json(json!({"booking_id": booking_id, "rating": 5, "text": "Lovely"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // only the creative answers
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/bookings/{booking_id}/status"))
        .insert_header(bearer(&client_token))
        .set_json(json!({"status": "accepted"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/bookings/{booking_id}/status"))
        .insert_header(bearer(&creative_token))
        .set_json(json!({"status": "accepted"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["client_unread"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/bookings/{booking_id}/status"))
        .insert_header(bearer(&creative_token))
        .set_json(json!({"status": "declined"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .insert_header(bearer(&client_token))
        .set_json(json!({"booking_id": booking_id, "rating": 6}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .insert_header(bearer(&client_token))
        .set_json(json!({"booking_id": booking_id, "rating": 4, "text": "Lovely"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/v1/reviews")
        .insert_header(bearer(&client_token))
        .set_json(json!({"booking_id": booking_id, "rating": 3}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::get().uri(&format!("/api/v1/profiles/{creative}/rating")).to_request();
    let rating = json_body(test::call_service(&app, req).await).await;
    assert_eq!(rating["average"], 4.0);
    assert_eq!(rating["count"], 1);

    let req = test::TestRequest::post().uri("/api/v1/bookings/seen").insert_header(bearer(&client_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let req = test::TestRequest::get().uri("/api/v1/bookings/unread").insert_header(bearer(&client_token)).to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["count"], 0);
}

#[actix_web::test]
#[serial]
async fn protected_routes_need_a_token() {
    let h = Harness::new();
    let app = test_app!(h);
    for uri in ["/api/v1/bookings", "/api/v1/profiles/me", "/api/v1/conversations", "/api/v1/ads/mine"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401, "{uri}");
        assert_eq!(json_body(resp).await["error"], "unauthorized", "{uri}");
    }
    let req = test::TestRequest::get()
        .uri("/api/v1/bookings")
        .insert_header(bearer("not.a.jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["error"], "unauthorized");
}

#[actix_web::test]
#[serial]
async fn malformed_bodies_and_queries_get_json_errors() {
    let h = Harness::new();
    let app = test_app!(h);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"email\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].is_string());

    let req = test::TestRequest::get().uri("/api/v1/profiles?min_rating=lots").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].is_string());
}

#[actix_web::test]
#[serial]
async fn change_password_flow() {
    let h = Harness::new();
    let app = test_app!(h);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({"email": "lerato@example.com", "password": "firstsecret"}))
        .to_request();
    let token = json_body(test::call_service(&app, req).await).await["token"].as_str().unwrap().to_string();

    let change = |current: &str, new: &str| {
        test::TestRequest::post()
            .uri("/api/v1/auth/password")
            .insert_header(bearer(&token))
            .set_json(json!({"current_password": current, "new_password": new}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, change("wrongsecret", "secondsecret")).await.status(), 401);
    let resp = test::call_service(&app, change("firstsecret", "short")).await;
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("8 characters"));
    assert_eq!(test::call_service(&app, change("firstsecret", "secondsecret")).await.status(), 200);

    let sign_in = |password: &str| {
        test::TestRequest::post()
            .uri("/api/v1/auth/signin")
            .set_json(json!({"email": "lerato@example.com", "password": password}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, sign_in("firstsecret")).await.status(), 401);
    assert_eq!(test::call_service(&app, sign_in("secondsecret")).await.status(), 200);
}

#[actix_web::test]
#[serial]
async fn admin_features_a_creative() {
    let h = Harness::new();
    let (_, admin) = h.user("admin@example.com", true).await;
    let (star, star_token) = h.user("star@example.com", false).await;
    let (_, plain_token) = h.user("plain@example.com", false).await;
    let app = test_app!(h);

    for (token, name) in [(&star_token, "Star Studio"), (&plain_token, "Plain Studio")] {
        let req = test::TestRequest::put()
            .uri("/api/v1/profiles/me")
            .insert_header(bearer(token))
            .set_json(json!({"name": name}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    let req = test::TestRequest::get().uri("/api/v1/profiles?featured=true").to_request();
    assert!(json_body(test::call_service(&app, req).await).await.as_array().unwrap().is_empty());

    let feature = |token: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/admin/clients/{star}/featured"))
            .insert_header(bearer(token))
            .set_json(json!({"featured": true}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, feature(&plain_token)).await.status(), 403);
    let resp = test::call_service(&app, feature(&admin)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["featured"], true);

    let req = test::TestRequest::get().uri("/api/v1/profiles?featured=true").to_request();
    let list = json_body(test::call_service(&app, req).await).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Star Studio");
    assert_eq!(list[0]["featured"], true);
}
