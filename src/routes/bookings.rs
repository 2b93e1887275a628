use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Booking, BookingStatus, Id, NewBooking, NewReview, Profile, Review, UnreadCount, UpdateBookingStatus};
use crate::notify::{BookingNotice, Recipient};

use super::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    responses(
        (status = 200, description = "Bookings where the caller is client or creative, newest first", body = [Booking]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_bookings(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let bookings = data.repo.list_bookings_for_user(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = NewBooking,
    responses(
        (status = 201, description = "Booking requested", body = Booking),
        (status = 400, description = "Date in the past or self-booking"),
        (status = 404, description = "Creative not found"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_booking(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewBooking>,
) -> Result<HttpResponse, ApiError> {
    let client = data.active_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_booking(client.id))?;
    let mut new = payload.into_inner();
    if new.creative_id == client.id {
        return Err(ApiError::bad_request("You cannot book yourself"));
    }
    if new.date < Utc::now().date_naive() {
        return Err(ApiError::bad_request("Booking date cannot be in the past"));
    }
    new.message = new.message.trim().to_string();
    let creative = data.repo.get_profile(new.creative_id).await?;
    if creative.is_banned() {
        return Err(ApiError::NotFound);
    }
    let booking = data.repo.create_booking(client.id, new).await?;
    tracing::info!(booking_id = %booking.id, creative_id = %creative.id, "booking created");
    notify_booking(&data, &booking, &client, &creative).await;
    Ok(HttpResponse::Created().json(booking))
}

/// Best effort: a lost email never fails the booking.
async fn notify_booking(data: &AppState, booking: &Booking, client: &Profile, creative: &Profile) {
    let (client_acct, creative_acct) = match (data.repo.get_account(client.id).await, data.repo.get_account(creative.id).await) {
        (Ok(c), Ok(k)) => (c, k),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(booking_id = %booking.id, "skipping booking notification: {e}");
            return;
        }
    };
    let recipient = |p: &Profile, email: String| Recipient {
        name: p.name.clone().unwrap_or_else(|| email.clone()),
        email,
    };
    let notice = BookingNotice {
        booking: booking.clone(),
        creative: recipient(creative, creative_acct.email),
        client: recipient(client, client_acct.email),
    };
    if let Err(e) = data.notifier.booking_created(&notice).await {
        tracing::warn!(booking_id = %booking.id, "booking notification failed: {e}");
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/status",
    request_body = UpdateBookingStatus,
    params(("id" = Id, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking answered", body = Booking),
        (status = 400, description = "Target status must be accepted or declined"),
        (status = 403, description = "Only the booked creative may answer"),
        (status = 409, description = "Booking already answered")
    )
)]
pub async fn update_booking_status(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateBookingStatus>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let status = payload.into_inner().status;
    if status == BookingStatus::Pending {
        return Err(ApiError::bad_request("Status must be accepted or declined"));
    }
    let booking = data.repo.get_booking(path.into_inner()).await?;
    if booking.creative_id != me.id {
        return Err(ApiError::Forbidden);
    }
    if !booking.status.can_transition_to(status) {
        return Err(ApiError::Conflict);
    }
    let updated = data.repo.update_booking_status(booking.id, status).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/seen",
    responses(
        (status = 200, description = "Number of bookings cleared", body = UnreadCount)
    )
)]
pub async fn mark_bookings_seen(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let touched = data.repo.mark_bookings_seen(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { count: touched as i64 }))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/unread",
    responses(
        (status = 200, description = "Bookings with news for the caller", body = UnreadCount)
    )
)]
pub async fn unread_bookings(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let count = data.repo.count_unread_bookings(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { count }))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = NewReview,
    responses(
        (status = 201, description = "Review stored", body = Review),
        (status = 400, description = "Rating out of range or booking not accepted"),
        (status = 403, description = "Only the booking's client may review"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already reviewed")
    )
)]
pub async fn create_review(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewReview>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let mut new = payload.into_inner();
    if !(1..=5).contains(&new.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }
    let booking = data.repo.get_booking(new.booking_id).await?;
    if booking.client_id != me.id {
        return Err(ApiError::Forbidden);
    }
    if booking.status != BookingStatus::Accepted {
        return Err(ApiError::bad_request("Only accepted bookings can be reviewed"));
    }
    new.text = new.text.trim().to_string();
    let review = data.repo.create_review(me.id, booking.creative_id, new).await?;
    Ok(HttpResponse::Created().json(review))
}
