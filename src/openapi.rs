use crate::auth::Role;
use crate::models::{
    Ad, AdAnalytics, AdDetails, AdSlot, AdStatus, Booking, BookingStatus, ClientAdSummary, ClientOverview,
    Conversation, CreativeListing, Message, NewAd, NewAdSlot, NewBooking, NewMessage, NewReview,
    OpenConversation, Profile, ProfileCompletion, ProfileStatus, ProfileUpdate, RatingSummary, Review,
    UnreadCount, UpdateAd, UpdateAdSlot, UpdateAdStatus, UpdateBookingStatus, UpdateClientStatus, UpdateFeatured,
};
use crate::routes::{accounts, ads, admin, bookings, media, messages, profiles};
use crate::search::PriceBand;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::sign_up,
        accounts::sign_in,
        accounts::refresh_token,
        accounts::auth_me,
        accounts::change_password,
        profiles::explore_profiles,
        profiles::get_my_profile,
        profiles::upsert_my_profile,
        profiles::my_profile_completion,
        profiles::get_profile,
        profiles::list_reviews,
        profiles::get_rating,
        media::upload_profile_photo,
        media::upload_portfolio_images,
        media::upload_ad_image,
        bookings::list_bookings,
        bookings::create_booking,
        bookings::update_booking_status,
        bookings::mark_bookings_seen,
        bookings::unread_bookings,
        bookings::create_review,
        messages::list_conversations,
        messages::open_conversation,
        messages::list_messages,
        messages::send_message,
        messages::mark_read,
        messages::unread_messages,
        ads::list_ad_slots,
        ads::create_ad_slot,
        ads::update_ad_slot,
        ads::delete_ad_slot,
        ads::list_ads,
        ads::create_ad,
        ads::list_my_ads,
        ads::active_ad,
        ads::expire_ads,
        ads::list_analytics,
        ads::update_ad,
        ads::delete_ad,
        ads::update_ad_status,
        ads::record_impression,
        ads::record_click,
        admin::list_clients,
        admin::set_client_status,
        admin::set_client_featured,
    ),
    components(schemas(
        Role, accounts::Credentials, accounts::TokenResponse, accounts::ChangePasswordRequest, accounts::MeResponse,
        Profile, ProfileStatus, ProfileUpdate, ProfileCompletion, CreativeListing, PriceBand,
        Booking, BookingStatus, NewBooking, UpdateBookingStatus, Review, NewReview, RatingSummary,
        Conversation, OpenConversation, Message, NewMessage, UnreadCount,
        AdSlot, NewAdSlot, UpdateAdSlot, Ad, AdStatus, NewAd, UpdateAd, UpdateAdStatus, AdDetails, AdAnalytics,
        ClientAdSummary, ClientOverview, UpdateClientStatus, UpdateFeatured, media::PortfolioUploadResponse,
    )),
    tags(
        (name = "accounts", description = "Sign-up, sign-in and tokens"),
        (name = "marketplace", description = "Profiles, bookings, reviews and messaging"),
        (name = "ads", description = "Ad slots, bookings and analytics"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for p in ["/api/v1/auth/signup", "/api/v1/profiles/{id}", "/api/v1/bookings", "/api/v1/conversations/{id}/messages", "/api/v1/ads/active", "/api/v1/admin/clients", "/api/v1/admin/clients/{id}/featured"] {
            assert!(paths.iter().any(|k| k.as_str() == p), "missing {p}");
        }
    }
}
