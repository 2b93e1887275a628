use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{self, Auth, Role};
use crate::error::ApiError;
use crate::models::{Id, NewAccount};
use crate::repo::RepoError;

use super::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: Id,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Id,
    pub email: String,
    pub roles: Vec<Role>,
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!("Password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    Ok(())
}

fn issue(user_id: Id, roles: Vec<Role>) -> Result<TokenResponse, ApiError> {
    let token = auth::create_jwt(user_id, roles.clone()).map_err(|e| {
        tracing::error!("jwt encode failed: {e}");
        ApiError::Internal
    })?;
    Ok(TokenResponse { token, user_id, roles })
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = Credentials,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(data: web::Data<AppState>, payload: web::Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let creds = payload.into_inner();
    validate_credentials(&creds.email, &creds.password)?;
    let password_hash = auth::hash_password(&creds.password).map_err(|e| {
        tracing::error!("password hash failed: {e}");
        ApiError::Internal
    })?;
    let is_admin = auth::is_bootstrap_admin(creds.email.trim());
    let (account, profile) = data.repo
        .create_account(NewAccount { email: creds.email, password_hash }, is_admin)
        .await?;
    tracing::info!(user_id = %account.id, is_admin, "account created");
    Ok(HttpResponse::Created().json(issue(account.id, Role::for_profile(&profile))?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account banned")
    )
)]
pub async fn sign_in(data: web::Data<AppState>, payload: web::Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let account = data.repo.find_account_by_email(&payload.email).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::Unauthorized,
        other => other.into(),
    })?;
    if !auth::verify_password(&payload.password, &account.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    let profile = data.repo.get_profile(account.id).await?;
    if profile.is_banned() {
        return Err(ApiError::Forbidden);
    }
    Ok(HttpResponse::Ok().json(issue(account.id, Role::for_profile(&profile))?))
}

/// Reissue a token with roles re-read from the profile, so admin grants and bans take effect.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Fresh token", body = TokenResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account banned")
    )
)]
pub async fn refresh_token(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = data.active_profile(&auth).await?;
    Ok(HttpResponse::Ok().json(issue(profile.id, Role::for_profile(&profile))?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user info", body = MeResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn auth_me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let account = data.repo.get_account(auth.user_id()?).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::Unauthorized,
        other => other.into(),
    })?;
    Ok(HttpResponse::Ok().json(MeResponse { id: account.id, email: account.email, roles: auth.0.roles }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Current password wrong"),
        (status = 403, description = "Account banned")
    )
)]
pub async fn change_password(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let account = data.repo.get_account(me.id).await?;
    if !auth::verify_password(&payload.current_password, &account.password_hash) {
        return Err(ApiError::Unauthorized);
    }
    validate_credentials(&account.email, &payload.new_password)?;
    let hash = auth::hash_password(&payload.new_password).map_err(|_| ApiError::Internal)?;
    data.repo.update_password(account.id, hash).await?;
    Ok(HttpResponse::Ok().json(super::ok_status()))
}
