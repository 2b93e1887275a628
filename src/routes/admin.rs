use std::collections::HashMap;

use actix_web::{web, HttpResponse};

use crate::auth::{Auth, Role};
use crate::error::ApiError;
use crate::models::{Ad, ClientAdSummary, ClientOverview, Id, Profile, UpdateClientStatus, UpdateFeatured};

use super::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/admin/clients",
    responses(
        (status = 200, description = "Every profile with email and ad totals", body = [ClientOverview]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_clients(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let profiles = data.repo.list_profiles().await?;
    let emails: HashMap<Id, String> = data.repo.list_accounts().await?.into_iter().map(|a| (a.id, a.email)).collect();
    let analytics = data.repo.list_ad_analytics().await?;
    let mut ads_by_client: HashMap<Id, Vec<Ad>> = HashMap::new();
    for ad in data.repo.list_ads().await? {
        ads_by_client.entry(ad.client_id).or_default().push(ad);
    }
    let overview: Vec<ClientOverview> = profiles
        .into_iter()
        .map(|profile: Profile| {
            let ads = ads_by_client.get(&profile.id).map(Vec::as_slice).unwrap_or(&[]);
            ClientOverview {
                email: emails.get(&profile.id).cloned(),
                ads: ClientAdSummary::tally(ads, &analytics),
                profile,
            }
        })
        .collect();
    Ok(HttpResponse::Ok().json(overview))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/clients/{id}/status",
    request_body = UpdateClientStatus,
    params(("id" = Id, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Status updated", body = Profile),
        (status = 400, description = "Admins cannot ban themselves"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn set_client_status(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateClientStatus>,
) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let id = path.into_inner();
    let status = payload.into_inner().status;
    if id == auth.user_id()? {
        return Err(ApiError::bad_request("You cannot change your own status"));
    }
    let profile = data.repo.set_profile_status(id, status).await?;
    tracing::info!(profile_id = %id, status = ?status, "client status changed");
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/clients/{id}/featured",
    request_body = UpdateFeatured,
    params(("id" = Id, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Featured flag updated", body = Profile),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn set_client_featured(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: web::Json<UpdateFeatured>,
) -> Result<HttpResponse, ApiError> {
    crate::require_role!(auth, Role::Admin);
    let id = path.into_inner();
    let featured = payload.into_inner().featured;
    let profile = data.repo.set_featured(id, featured).await?;
    tracing::info!(profile_id = %id, featured, "featured flag changed");
    Ok(HttpResponse::Ok().json(profile))
}
