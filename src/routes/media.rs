use actix_multipart::{Field, Multipart};
use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{Ad, Id, Profile, ProfileUpdate, UpdateAd};
use crate::storage::{self, Bucket, MediaStoreError, MEDIA_SIZE_LIMIT};

use super::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortfolioUploadResponse {
    /// Public URLs of the files that were stored, in upload order.
    pub urls: Vec<String>,
    /// One message per rejected file.
    pub errors: Vec<String>,
}

/// Why a single uploaded file was refused.
#[derive(Debug)]
enum Rejected {
    TooLarge,
    Unsupported,
}

impl Rejected {
    fn message(&self, filename: &str) -> String {
        match self {
            Rejected::TooLarge => format!("{filename}: file exceeds 10MB"),
            Rejected::Unsupported => format!("{filename}: unsupported file type"),
        }
    }

    fn into_response(self) -> HttpResponse {
        match self {
            Rejected::TooLarge => HttpResponse::build(StatusCode::PAYLOAD_TOO_LARGE).finish(),
            Rejected::Unsupported => HttpResponse::UnsupportedMediaType().finish(),
        }
    }
}

struct Upload {
    filename: String,
    mime: &'static str,
    ext: &'static str,
    bytes: Vec<u8>,
}

/// Drains one multipart field. Oversized bodies are still drained so the
/// next field can be read.
async fn read_field(mut field: Field) -> Result<Result<Upload, (String, Rejected)>, ApiError> {
    let filename = field
        .content_disposition()
        .get_filename()
        .unwrap_or("file")
        .to_string();
    let mut bytes: Vec<u8> = Vec::new();
    let mut too_large = false;
    while let Some(chunk) = field.try_next().await.map_err(|e| {
        log::error!("multipart stream read error: {e}");
        ApiError::Internal
    })? {
        if too_large || bytes.len() + chunk.len() > MEDIA_SIZE_LIMIT {
            too_large = true;
            continue;
        }
        bytes.extend_from_slice(&chunk);
    }
    if too_large {
        return Ok(Err((filename, Rejected::TooLarge)));
    }
    match storage::sniff_image(&bytes) {
        Some((mime, ext)) => Ok(Ok(Upload { filename, mime, ext, bytes })),
        None => Ok(Err((filename, Rejected::Unsupported))),
    }
}

/// Reads every field named `file` (or `files`), in order.
async fn read_uploads(mut payload: Multipart) -> Result<Vec<Result<Upload, (String, Rejected)>>, ApiError> {
    let mut out = Vec::new();
    while let Some(field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::Internal
    })? {
        match field.content_disposition().get_name() {
            Some("file") | Some("files") => out.push(read_field(field).await?),
            _ => continue,
        }
    }
    Ok(out)
}

/// Exactly one acceptable file, or the response to send back.
async fn single_upload(payload: Multipart) -> Result<Result<Upload, HttpResponse>, ApiError> {
    match read_uploads(payload).await?.into_iter().next() {
        Some(Ok(upload)) => Ok(Ok(upload)),
        Some(Err((_, rejected))) => Ok(Err(rejected.into_response())),
        None => Err(ApiError::bad_request("No file provided")),
    }
}

async fn store(data: &AppState, bucket: Bucket, key: &str, upload: &Upload) -> Result<String, ApiError> {
    data.media_store.put(bucket, key, upload.mime, &upload.bytes).await.map_err(|e| {
        log::error!("media_store put error: {e}");
        ApiError::Internal
    })?;
    Ok(storage::public_url(bucket, key))
}

#[utoipa::path(
    post,
    path = "/api/v1/profiles/me/photo",
    responses(
        (status = 200, description = "Photo stored and set on the profile", body = Profile),
        (status = 400, description = "No file provided"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn upload_profile_photo(auth: Auth, data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_upload(me.id))?;
    let upload = match single_upload(payload).await? {
        Ok(u) => u,
        Err(resp) => return Ok(resp),
    };
    // one photo per user; re-uploads overwrite
    let key = format!("{}.{}", me.id, upload.ext);
    let url = store(&data, Bucket::ProfilePhotos, &key, &upload).await?;
    let profile = data
        .repo
        .upsert_profile(me.id, ProfileUpdate { photo: Some(url), ..Default::default() })
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/profiles/me/portfolio",
    responses(
        (status = 200, description = "Stored URLs and per-file errors", body = PortfolioUploadResponse),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn upload_portfolio_images(auth: Auth, data: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    data.check_rate(|rl| rl.allow_upload(me.id))?;
    let millis = Utc::now().timestamp_millis();
    let mut resp = PortfolioUploadResponse { urls: Vec::new(), errors: Vec::new() };
    for (i, item) in read_uploads(payload).await?.into_iter().enumerate() {
        match item {
            Ok(upload) => {
                let key = format!("{}-{millis}-{i}.{}", me.id, upload.ext);
                match store(&data, Bucket::PortfolioImages, &key, &upload).await {
                    Ok(url) => resp.urls.push(url),
                    Err(_) => resp.errors.push(format!("{}: upload failed", upload.filename)),
                }
            }
            Err((filename, rejected)) => resp.errors.push(rejected.message(&filename)),
        }
    }
    if !resp.urls.is_empty() {
        data.repo.append_portfolio(me.id, resp.urls.clone()).await?;
    }
    Ok(HttpResponse::Ok().json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/ads/{id}/image",
    params(("id" = Id, Path, description = "Ad id")),
    responses(
        (status = 200, description = "Image stored and set on the ad", body = Ad),
        (status = 403, description = "Only the owner or an admin"),
        (status = 404, description = "Ad not found"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type")
    )
)]
pub async fn upload_ad_image(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let me = data.active_profile(&auth).await?;
    let ad = data.repo.get_ad(path.into_inner()).await?;
    if ad.client_id != me.id && !auth.is_admin() {
        return Err(ApiError::Forbidden);
    }
    data.check_rate(|rl| rl.allow_upload(me.id))?;
    let upload = match single_upload(payload).await? {
        Ok(u) => u,
        Err(resp) => return Ok(resp),
    };
    let key = format!("{}-{}.{}", ad.id, Utc::now().timestamp_millis(), upload.ext);
    let url = store(&data, Bucket::AdImages, &key, &upload).await?;
    let ad = data.repo.update_ad(ad.id, UpdateAd { image_url: Some(url), ..Default::default() }).await?;
    Ok(HttpResponse::Ok().json(ad))
}

pub async fn get_media(data: web::Data<AppState>, path: web::Path<(String, String)>) -> Result<HttpResponse, ApiError> {
    let (bucket, key) = path.into_inner();
    let bucket: Bucket = bucket.parse().map_err(|_| ApiError::NotFound)?;
    match data.media_store.get(bucket, &key).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok()
            .insert_header(("Content-Type", mime))
            .insert_header(("Cache-Control", "public, max-age=86400"))
            .body(bytes)),
        Err(MediaStoreError::NotFound) | Err(MediaStoreError::InvalidKey) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("media_store get error: {e}");
            Err(ApiError::Internal)
        }
    }
}
