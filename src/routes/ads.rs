use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use rand::seq::SliceRandom;

use crate::auth::{Auth, Role};
use crate::error::ApiError;
use crate::models::{Ad, AdAnalytics, AdDetails, AdSlot, Id, NewAd, NewAdSlot, UnreadCount, UpdateAd, UpdateAdSlot, UpdateAdStatus};
use crate::storage::{self, Bucket};

use super::AppState;

/// Candidates considered for the homepage rotation.
pub const ACTIVE_AD_CANDIDATES: usize = 10;

fn check_window(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::bad_request("Start date must be on or before end date"));
    }
    Ok(())
}

// ---------------------------------------------------------------- slots

#[utoipa::path(
    get,
    path = "/api/v1/ad-slots",
    responses(
        (status = 200, description = "Ad slots ordered by name", body = [AdSlot])
    )
)]
pub async fn list_ad_slots(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let slots = data.repo.list_ad_slots().await?;
    Ok(HttpResponse::Ok().json(slots))
}

#[utoipa::path(
    post,
    path = "/api/v1/ad-slots",
    request_body = NewAdSlot,
    responses(
        (status = 201, description = "Slot created", body = AdSlot),
        (status = 400, description = "Blank name or negative price"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_ad_slot(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewAdSlot>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let mut new = payload.into_inner();
    new.name = new.name.trim().to_string();
    if new.name.is_empty() {
        return Err(ApiError::bad_request("Slot name is required"));
    }
    if new.price < 0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    let slot = data.repo.create_ad_slot(new).await?;
    tracing::info!(slot_id = %slot.id, "ad slot created");
    Ok(HttpResponse::Created().json(slot))
}

#[utoipa::path(
    patch,
    path = "/api/v1/ad-slots/{id}",
    request_body = UpdateAdSlot,
    params(("id" = Id, Path, description = "Slot id")),
    responses(
        (status = 200, description = "Slot updated", body = AdSlot),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Slot not found")
    )
)]
pub async fn update_ad_slot(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateAdSlot>,
) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let upd = payload.into_inner();
    if matches!(upd.name.as_deref().map(str::trim), Some("")) {
        return Err(ApiError::bad_request("Slot name is required"));
    }
    if matches!(upd.price, Some(p) if p < 0) {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    let slot = data.repo.update_ad_slot(path.into_inner(), upd).await?;
    Ok(HttpResponse::Ok().json(slot))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ad-slots/{id}",
    params(("id" = Id, Path, description = "Slot id")),
    responses(
        (status = 200, description = "Slot deleted"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Slot still has ads")
    )
)]
pub async fn delete_ad_slot(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    data.repo.delete_ad_slot(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(super::ok_status()))
}

// ---------------------------------------------------------------- ads

#[utoipa::path(
    get,
    path = "/api/v1/ads",
    responses(
        (status = 200, description = "All ads, newest first, with slot and client name", body = [AdDetails]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_ads(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let ads = data.repo.list_ads().await?;
    let slots: HashMap<Id, AdSlot> = data.repo.list_ad_slots().await?.into_iter().map(|s| (s.id, s)).collect();
    let names: HashMap<Id, Option<String>> = data.repo.list_profiles().await?.into_iter().map(|p| (p.id, p.name)).collect();
    let details: Vec<AdDetails> = ads
        .into_iter()
        .map(|ad| AdDetails {
            slot: slots.get(&ad.slot_id).cloned(),
            client_name: names.get(&ad.client_id).cloned().flatten(),
            ad,
        })
        .collect();
    Ok(HttpResponse::Ok().json(details))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads",
    request_body = NewAd,
    responses(
        (status = 201, description = "Ad submitted for review", body = Ad),
        (status = 400, description = "Inactive slot or bad date range"),
        (status = 404, description = "Slot not found")
    )
)]
pub async fn create_ad(auth: Auth, data: web::Data<AppState>, payload: web::Json<NewAd>) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let new = payload.into_inner();
    check_window(new.start_date, new.end_date)?;
    let slot = data.repo.get_ad_slot(new.slot_id).await?;
    if !slot.is_active {
        return Err(ApiError::bad_request("This ad slot is not available"));
    }
    let ad = data.repo.create_ad(me.id, new).await?;
    tracing::info!(ad_id = %ad.id, slot = %slot.name, "ad submitted");
    Ok(HttpResponse::Created().json(ad))
}

#[utoipa::path(
    get,
    path = "/api/v1/ads/mine",
    responses(
        (status = 200, description = "Caller's ads, newest first", body = [Ad])
    )
)]
pub async fn list_my_ads(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ads = data.repo.list_ads_for_client(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(ads))
}

/// Homepage banner: a random pick among ads live today, or `null`.
#[utoipa::path(
    get,
    path = "/api/v1/ads/active",
    responses(
        (status = 200, description = "A live ad or null", body = Ad)
    )
)]
pub async fn active_ad(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let today = Utc::now().date_naive();
    let candidates = data.repo.live_ads(today, ACTIVE_AD_CANDIDATES).await?;
    let pick: Option<Ad> = candidates.choose(&mut rand::thread_rng()).cloned();
    Ok(HttpResponse::Ok().json(pick))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads/expire",
    responses(
        (status = 200, description = "Number of ads expired", body = UnreadCount),
        (status = 403, description = "Admin only")
    )
)]
pub async fn expire_ads(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let touched = data.repo.expire_ads(Utc::now().date_naive()).await?;
    if touched > 0 {
        tracing::info!(count = touched, "expired past ads");
    }
    Ok(HttpResponse::Ok().json(UnreadCount { count: touched as i64 }))
}

#[utoipa::path(
    get,
    path = "/api/v1/ads/analytics",
    responses(
        (status = 200, description = "Impression and click counters", body = [AdAnalytics]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_analytics(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let rows = data.repo.list_ad_analytics().await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    patch,
    path = "/api/v1/ads/{id}",
    request_body = UpdateAd,
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad updated", body = Ad),
        (status = 400, description = "Bad date range"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn update_ad(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateAd>,
) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let upd = payload.into_inner();
    let current = data.repo.get_ad(path.into_inner()).await?;
    check_window(
        upd.start_date.unwrap_or(current.start_date),
        upd.end_date.unwrap_or(current.end_date),
    )?;
    let ad = data.repo.update_ad(current.id, upd).await?;
    Ok(HttpResponse::Ok().json(ad))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ads/{id}",
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Ad deleted"),
        (status = 403, description = "Only the owner or an admin; banned owners are refused"),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn delete_ad(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ad = data.repo.get_ad(path.into_inner()).await?;
    if !auth.is_admin() {
        let me = data.active_profile(&auth).await?;
        if ad.client_id != me.id {
            return Err(ApiError::Forbidden);
        }
    }
    data.repo.delete_ad(ad.id).await?;
    if let Some(key) = ad.image_url.as_deref().and_then(|u| storage::key_from_url(Bucket::AdImages, u)) {
        if let Err(e) = data.media_store.delete(Bucket::AdImages, key).await {
            tracing::warn!(ad_id = %ad.id, "ad image cleanup failed: {e}");
        }
    }
    Ok(HttpResponse::Ok().json(super::ok_status()))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads/{id}/status",
    request_body = UpdateAdStatus,
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Review decision stored", body = Ad),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Ad already reviewed")
    )
)]
pub async fn update_ad_status(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateAdStatus>,
) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let ad = data.repo.set_ad_status(path.into_inner(), payload.into_inner().status).await?;
    tracing::info!(ad_id = %ad.id, status = ?ad.status, "ad reviewed");
    Ok(HttpResponse::Ok().json(ad))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads/{id}/impression",
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Counter incremented", body = AdAnalytics),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn record_impression(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let row = data.repo.record_impression(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads/{id}/click",
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Counter incremented", body = AdAnalytics),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn record_click(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let row = data.repo.record_click(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}
