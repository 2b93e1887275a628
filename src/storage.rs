use async_trait::async_trait;
use log::{error, info, warn};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Per-file upload ceiling.
pub const MEDIA_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

pub const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("not_found")]
    NotFound,
    #[error("invalid key")]
    InvalidKey,
    #[error("other: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    ProfilePhotos,
    PortfolioImages,
    AdImages,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::ProfilePhotos => "profile-photos",
            Bucket::PortfolioImages => "portfolio-images",
            Bucket::AdImages => "ad-images",
        }
    }
}

impl FromStr for Bucket {
    type Err = MediaStoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile-photos" => Ok(Bucket::ProfilePhotos),
            "portfolio-images" => Ok(Bucket::PortfolioImages),
            "ad-images" => Ok(Bucket::AdImages),
            _ => Err(MediaStoreError::NotFound),
        }
    }
}

/// Keys are flat file names; anything that could escape the bucket is rejected.
pub fn validate_key(key: &str) -> Result<(), MediaStoreError> {
    let ok = !key.is_empty()
        && key.len() <= 200
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok { Ok(()) } else { Err(MediaStoreError::InvalidKey) }
}

/// Sniff an uploaded image. Returns `(mime, extension)` for accepted types only.
pub fn sniff_image(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    let kind = infer::get(bytes)?;
    if ALLOWED_MIME.contains(&kind.mime_type()) {
        Some((kind.mime_type(), kind.extension()))
    } else {
        None
    }
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into())
}

/// Public URL under which `/media/{bucket}/{key}` is served.
pub fn public_url(bucket: Bucket, key: &str) -> String {
    let base = std::env::var("PUBLIC_BASE_URL").unwrap_or_default();
    format!("{}/media/{}/{}", base.trim_end_matches('/'), bucket.as_str(), key)
}

/// Inverse of [`public_url`]: the key of a URL pointing into `bucket`, if any.
pub fn key_from_url(bucket: Bucket, url: &str) -> Option<&str> {
    let marker = format!("/media/{}/", bucket.as_str());
    let idx = url.rfind(&marker)?;
    let key = &url[idx + marker.len()..];
    validate_key(key).ok().map(|_| key)
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upsert: an existing object under the same key is replaced.
    async fn put(&self, bucket: Bucket, key: &str, mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError>;
    async fn get(&self, bucket: Bucket, key: &str) -> Result<(Vec<u8>, String), MediaStoreError>;
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), MediaStoreError>;
}

// ---------------- Filesystem implementation (local dev / tests) ----------------
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new() -> Self {
        let root = std::env::var("FOLIOO_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/media"));
        Self { root }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, bucket: Bucket, key: &str) -> Result<PathBuf, MediaStoreError> {
        validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }
}

impl Default for FsMediaStore {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn put(&self, bucket: Bucket, key: &str, _mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError> {
        let path = self.path_for(bucket, key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| MediaStoreError::Other(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("media write failed path={} err={e}", path.display());
            MediaStoreError::Other(e.to_string())
        })
    }
    async fn get(&self, bucket: Bucket, key: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let path = self.path_for(bucket, key)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaStoreError::NotFound,
            _ => MediaStoreError::Other(e.to_string()),
        })?;
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), MediaStoreError> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaStoreError::Other(e.to_string())),
        }
    }
}

// ---------------- S3 Implementation (MinIO compatible) ----------------
pub struct S3MediaStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3MediaStore {
    pub async fn new(endpoint: String) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "folioo-media".into());
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.clone()))
            .endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing; most MinIO deployments have no wildcard DNS.
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("Initialized S3/MinIO media client (path-style addressing enabled)");

        if let Err(e) = client.head_bucket().bucket(&bucket).send().await {
            warn!("head_bucket failed for '{bucket}' (will attempt create): {e:?}");
            let max_attempts = 8u32;
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match client.create_bucket().bucket(&bucket).send().await {
                    Ok(_) => {
                        info!("created bucket '{bucket}' (attempt {attempt})");
                        break;
                    }
                    Err(e2) if attempt >= max_attempts => {
                        let region_hint = if region != "us-east-1" {
                            " (non us-east-1 regions may need a CreateBucketConfiguration)"
                        } else {
                            ""
                        };
                        error!("create_bucket failed for '{bucket}' after {attempt} attempts: {e2:?}");
                        return Err(anyhow::anyhow!("failed to ensure bucket '{bucket}': {e2}{region_hint}"));
                    }
                    Err(e2) => {
                        let backoff_ms = 200 * attempt.pow(2);
                        warn!("create_bucket attempt {attempt} failed for '{bucket}': {e2:?} (retrying in {backoff_ms}ms)");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
                    }
                }
            }
        }

        Ok(Self { bucket, client })
    }

    fn object_key(bucket: Bucket, key: &str) -> Result<String, MediaStoreError> {
        validate_key(key)?;
        Ok(format!("{}/{}", bucket.as_str(), key))
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn put(&self, bucket: Bucket, key: &str, mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let object_key = Self::object_key(bucket, key)?;
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes.to_vec()))
            .cache_control("max-age=3600")
            .content_type(mime);
        if let Err(e) = put.send().await {
            error!("put_object failed key={object_key} bucket={} err={:?}", self.bucket, e);
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(MediaStoreError::Other(format!("{e}{hint}")));
        }
        Ok(())
    }
    async fn get(&self, bucket: Bucket, key: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let object_key = Self::object_key(bucket, key)?;
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|_| MediaStoreError::NotFound)?;
        let stored_type = obj.content_type().map(str::to_string);
        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| MediaStoreError::Other(e.to_string()))?;
        let bytes = Vec::from(data.into_bytes().as_ref());
        let mime = stored_type.unwrap_or_else(|| sniff_mime(&bytes));
        Ok((bytes, mime))
    }
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), MediaStoreError> {
        let object_key = Self::object_key(bucket, key)?;
        // Treat a missing object as already deleted.
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;
        Ok(())
    }
}

/// S3 when `S3_ENDPOINT` is configured, local filesystem otherwise.
pub async fn build_media_store() -> anyhow::Result<Arc<dyn MediaStore>> {
    match std::env::var("S3_ENDPOINT") {
        Ok(endpoint) => Ok(Arc::new(S3MediaStore::new(endpoint).await?)),
        Err(_) => {
            info!("S3_ENDPOINT not set; storing media on the local filesystem");
            Ok(Arc::new(FsMediaStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_cannot_escape_bucket() {
        assert!(validate_key("abc-123.png").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b.png").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn bucket_names_roundtrip() {
        for b in [Bucket::ProfilePhotos, Bucket::PortfolioImages, Bucket::AdImages] {
            assert_eq!(b.as_str().parse::<Bucket>().unwrap(), b);
        }
        assert!("secrets".parse::<Bucket>().is_err());
    }

    #[test]
    fn key_is_recovered_from_public_url() {
        assert_eq!(key_from_url(Bucket::AdImages, "https://x.test/media/ad-images/a-1.png"), Some("a-1.png"));
        assert_eq!(key_from_url(Bucket::AdImages, "/media/profile-photos/a.png"), None);
        assert_eq!(key_from_url(Bucket::AdImages, "https://elsewhere.test/banner.png"), None);
    }

    #[test]
    fn only_images_are_accepted() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(sniff_image(&png), Some(("image/png", "png")));
        assert_eq!(sniff_image(b"%PDF-1.4\n"), None);
        assert_eq!(sniff_image(b"hello"), None);
    }

    #[tokio::test]
    async fn fs_store_overwrites_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::with_root(dir.path());
        store.put(Bucket::ProfilePhotos, "u.png", "image/png", b"one").await.unwrap();
        store.put(Bucket::ProfilePhotos, "u.png", "image/png", b"two").await.unwrap();
        let (bytes, _) = store.get(Bucket::ProfilePhotos, "u.png").await.unwrap();
        assert_eq!(bytes, b"two");
        store.delete(Bucket::ProfilePhotos, "u.png").await.unwrap();
        assert!(matches!(store.get(Bucket::ProfilePhotos, "u.png").await, Err(MediaStoreError::NotFound)));
    }
}
