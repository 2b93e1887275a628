use std::sync::Arc;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::Profile;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::{Repo, RepoError};
use crate::storage::MediaStore;

pub mod accounts;
pub mod ads;
pub mod admin;
pub mod bookings;
pub mod media;
pub mod messages;
pub mod profiles;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(err.to_string()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    // body and query rejections share the `{"error": ..}` shape
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));
    cfg.service(
        web::scope("/api/v1")
            // accounts
            .service(web::resource("/auth/signup").route(web::post().to(accounts::sign_up)))
            .service(web::resource("/auth/signin").route(web::post().to(accounts::sign_in)))
            .service(web::resource("/auth/refresh").route(web::post().to(accounts::refresh_token)))
            .service(web::resource("/auth/me").route(web::get().to(accounts::auth_me)))
            .service(web::resource("/auth/password").route(web::post().to(accounts::change_password)))
            // profiles; `/me` routes must be registered before `/{id}`
            .service(web::resource("/profiles").route(web::get().to(profiles::explore_profiles)))
            .service(
                web::resource("/profiles/me")
                    .route(web::get().to(profiles::get_my_profile))
                    .route(web::put().to(profiles::upsert_my_profile)),
            )
            .service(web::resource("/profiles/me/completion").route(web::get().to(profiles::my_profile_completion)))
            .service(web::resource("/profiles/me/photo").route(web::post().to(media::upload_profile_photo)))
            .service(web::resource("/profiles/me/portfolio").route(web::post().to(media::upload_portfolio_images)))
            .service(web::resource("/profiles/{id}").route(web::get().to(profiles::get_profile)))
            .service(web::resource("/profiles/{id}/reviews").route(web::get().to(profiles::list_reviews)))
            .service(web::resource("/profiles/{id}/rating").route(web::get().to(profiles::get_rating)))
            // bookings & reviews
            .service(
                web::resource("/bookings")
                    .route(web::get().to(bookings::list_bookings))
                    .route(web::post().to(bookings::create_booking)),
            )
            .service(web::resource("/bookings/seen").route(web::post().to(bookings::mark_bookings_seen)))
            .service(web::resource("/bookings/unread").route(web::get().to(bookings::unread_bookings)))
            .service(web::resource("/bookings/{id}/status").route(web::post().to(bookings::update_booking_status)))
            .service(web::resource("/reviews").route(web::post().to(bookings::create_review)))
            // messaging
            .service(
                web::resource("/conversations")
                    .route(web::get().to(messages::list_conversations))
                    .route(web::post().to(messages::open_conversation)),
            )
            .service(
                web::resource("/conversations/{id}/messages")
                    .route(web::get().to(messages::list_messages))
                    .route(web::post().to(messages::send_message)),
            )
            .service(web::resource("/conversations/{id}/read").route(web::post().to(messages::mark_read)))
            .service(web::resource("/messages/unread").route(web::get().to(messages::unread_messages)))
            // ads; fixed segments before `/ads/{id}`
            .service(
                web::resource("/ad-slots")
                    .route(web::get().to(ads::list_ad_slots))
                    .route(web::post().to(ads::create_ad_slot)),
            )
            .service(
                web::resource("/ad-slots/{id}")
                    .route(web::patch().to(ads::update_ad_slot))
                    .route(web::delete().to(ads::delete_ad_slot)),
            )
            .service(
                web::resource("/ads")
                    .route(web::get().to(ads::list_ads))
                    .route(web::post().to(ads::create_ad)),
            )
            .service(web::resource("/ads/mine").route(web::get().to(ads::list_my_ads)))
            .service(web::resource("/ads/active").route(web::get().to(ads::active_ad)))
            .service(web::resource("/ads/expire").route(web::post().to(ads::expire_ads)))
            .service(web::resource("/ads/analytics").route(web::get().to(ads::list_analytics)))
            .service(
                web::resource("/ads/{id}")
                    .route(web::patch().to(ads::update_ad))
                    .route(web::delete().to(ads::delete_ad)),
            )
            .service(web::resource("/ads/{id}/status").route(web::post().to(ads::update_ad_status)))
            .service(web::resource("/ads/{id}/image").route(web::post().to(media::upload_ad_image)))
            .service(web::resource("/ads/{id}/impression").route(web::post().to(ads::record_impression)))
            .service(web::resource("/ads/{id}/click").route(web::post().to(ads::record_click)))
            // admin
            .service(web::resource("/admin/clients").route(web::get().to(admin::list_clients)))
            .service(web::resource("/admin/clients/{id}/status").route(web::post().to(admin::set_client_status)))
            .service(web::resource("/admin/clients/{id}/featured").route(web::post().to(admin::set_client_featured))),
    );
    // public fetch route (no /api/v1 prefix so <img src="/media/..."> works)
    cfg.route("/media/{bucket}/{key}", web::get().to(media::get_media));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub media_store: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

impl AppState {
    /// Profile of the caller. Banned accounts may read but not act.
    pub(crate) async fn active_profile(&self, auth: &Auth) -> Result<Profile, ApiError> {
        let id = auth.user_id()?;
        let profile = self.repo.get_profile(id).await.map_err(|e| match e {
            RepoError::NotFound => ApiError::Unauthorized,
            other => other.into(),
        })?;
        if profile.is_banned() {
            return Err(ApiError::Forbidden);
        }
        Ok(profile)
    }

    pub(crate) fn check_rate(&self, allow: impl FnOnce(&RateLimiterFacade) -> bool) -> Result<(), ApiError> {
        if let Some(rl) = &self.rate_limiter {
            if !allow(rl) {
                return Err(ApiError::TooManyRequests);
            }
        }
        Ok(())
    }
}

pub(crate) fn ok_status() -> serde_json::Value {
    serde_json::json!({ "status": "ok" })
}
