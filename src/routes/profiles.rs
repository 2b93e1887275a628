use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{CreativeListing, Id, Profile, ProfileCompletion, ProfileUpdate, RatingSummary, Review};
use crate::search::{self, ExploreQuery};

use super::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    params(ExploreQuery),
    responses(
        (status = 200, description = "Creatives matching the filters", body = [CreativeListing])
    )
)]
pub async fn explore_profiles(data: web::Data<AppState>, query: web::Query<ExploreQuery>) -> Result<HttpResponse, ApiError> {
    let profiles = data.repo.list_profiles().await?;
    let ratings = data.repo.rating_summaries().await?;
    let listings = search::explore(profiles, &ratings, &query);
    Ok(HttpResponse::Ok().json(listings))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/me",
    responses(
        (status = 200, description = "Caller's profile", body = Profile),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_my_profile(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.get_profile(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Partial update; absent fields are left untouched, blank strings clear a field.
#[utoipa::path(
    put,
    path = "/api/v1/profiles/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile saved", body = Profile),
        (status = 400, description = "Invalid price"),
        (status = 403, description = "Account banned")
    )
)]
pub async fn upsert_my_profile(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let upd = payload.into_inner();
    if matches!(upd.price, Some(p) if p < 0) {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    let profile = data.repo.upsert_profile(me.id, upd).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/me/completion",
    responses(
        (status = 200, description = "Blank fields, in display order", body = ProfileCompletion)
    )
)]
pub async fn my_profile_completion(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.get_profile(auth.user_id()?).await?;
    Ok(HttpResponse::Ok().json(profile.completion()))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = Id, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Public profile", body = Profile),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_profile(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.get_profile(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}/reviews",
    params(("id" = Id, Path, description = "Creative id")),
    responses(
        (status = 200, description = "Reviews, newest first", body = [Review])
    )
)]
pub async fn list_reviews(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reviews = data.repo.list_reviews_for_creative(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}/rating",
    params(("id" = Id, Path, description = "Creative id")),
    responses(
        (status = 200, description = "Average is null without reviews", body = RatingSummary)
    )
)]
pub async fn get_rating(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let summary = data.repo.rating_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}
