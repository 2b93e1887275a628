#![cfg(feature = "inmem-store")]

mod common;

use actix_web::{test, web, App, HttpResponse};
use common::Harness;
use folioo::{config, SecurityHeaders};

#[actix_web::test]
#[serial_test::serial]
async fn test_security_headers_present() {
    std::env::remove_var("ENABLE_HSTS");
    std::env::remove_var("MEDIA_ORIGIN");
    let h = Harness::new();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(web::Data::new(h.state()))
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/ad-slots").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert!(headers.get("content-security-policy").is_some());
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none()); // not enabled
}

#[actix_web::test]
#[serial_test::serial]
async fn test_env_enables_hsts_and_media_origin() {
    std::env::set_var("ENABLE_HSTS", "1");
    std::env::set_var("MEDIA_ORIGIN", "https://media.folioo.test");
    let h = Harness::new();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(web::Data::new(h.state()))
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/ad-slots").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some());
    let csp = resp.headers().get("content-security-policy").unwrap().to_str().unwrap();
    assert!(csp.contains("img-src 'self' data: https://media.folioo.test"));
    std::env::remove_var("ENABLE_HSTS");
    std::env::remove_var("MEDIA_ORIGIN");
}

// builder override disables HSTS even if env set
#[actix_web::test]
#[serial_test::serial]
async fn test_builder_can_disable_hsts_even_when_env_set() {
    std::env::set_var("ENABLE_HSTS", "true");
    let h = Harness::new();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env().with_hsts(false))
            .app_data(web::Data::new(h.state()))
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/ad-slots").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(resp.headers().get("strict-transport-security").is_none());
    std::env::remove_var("ENABLE_HSTS");
}

// existing CSP header should not be overwritten by middleware
#[actix_web::test]
#[serial_test::serial]
async fn test_existing_csp_header_preserved() {
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::default())
            .route("/custom", web::get().to(|| async {
                HttpResponse::Ok()
                    .insert_header((actix_web::http::header::CONTENT_SECURITY_POLICY, "custom-src 'none'"))
                    .finish()
            })),
    )
    .await;
    let req = test::TestRequest::get().uri("/custom").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let csp = resp.headers().get("content-security-policy").unwrap().to_str().unwrap();
    assert_eq!(csp, "custom-src 'none'");
}

// error responses get the headers too
#[actix_web::test]
#[serial_test::serial]
async fn test_headers_on_error_responses() {
    let h = Harness::new();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::default())
            .app_data(web::Data::new(h.state()))
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/bookings").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
}
