//! Payment-proof uploads.
//!
//! Proof files land in one publicly readable bucket so the admin page can
//! embed them directly. The bucket is provisioned lazily: the first upload
//! that needs it runs [`ensure_bucket_public`] through a shared
//! [`tokio::sync::OnceCell`], so concurrent first uploads collapse into a
//! single provisioning attempt and every later upload sees it already done.

use aws_sdk_s3::{Client, primitives::ByteStream};
use axum::body::Bytes;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use regex::Regex;
use tracing::{info, warn};

use crate::{config::Config, error::AppError, state::AppState};

pub const MAX_PROOF_BYTES: usize = 8 * 1024 * 1024;

/// Room above [`MAX_PROOF_BYTES`] so an oversized file reaches our own 413
/// instead of being cut off by the framework body limit.
pub const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

pub async fn init_s3() -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    // Path-style addressing keeps object URLs predictable on MinIO-style
    // endpoints: <public-url>/<bucket>/<key>.
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .force_path_style(true)
        .build();

    Client::from_conf(s3_config)
}

pub fn is_allowed_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type == "application/pdf"
}

/// Uploads one proof file and returns its public URL. Assumes the caller has
/// already enforced size and content-type limits.
pub async fn upload_proof(
    state: &AppState,
    filename: &str,
    content_type: &str,
    bytes: Bytes,
) -> Result<String, AppError> {
    state
        .bucket_ready
        .get_or_try_init(|| ensure_bucket_public(&state.s3, &state.config.proof_bucket))
        .await?;

    let key = object_key(filename);

    state
        .s3
        .put_object()
        .bucket(&state.config.proof_bucket)
        .key(&key)
        .content_type(content_type)
        .cache_control("max-age=3600")
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("Upload failed: {e}")))?;

    Ok(public_url(&state.config, &key))
}

/// Fetch-or-create the proof bucket and make it anonymously readable.
/// Duplicate-exists races during creation count as success.
pub async fn ensure_bucket_public(s3: &Client, bucket: &str) -> Result<(), AppError> {
    match s3.head_bucket().bucket(bucket).send().await {
        Ok(_) => {}
        Err(err) => {
            let not_found = err
                .as_service_error()
                .is_some_and(|e| e.is_not_found());

            if !not_found {
                return Err(AppError::Storage(format!("Bucket lookup failed: {err}")));
            }

            if let Err(err) = s3.create_bucket().bucket(bucket).send().await {
                let duplicate = err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_exists() || e.is_bucket_already_owned_by_you()
                });

                if !duplicate {
                    return Err(AppError::Storage(format!("Bucket creation failed: {err}")));
                }
            } else {
                info!("Created proof bucket {bucket}");
            }
        }
    }

    // Also flips a pre-existing private bucket public. Non-fatal: uploads
    // still work, only anonymous reads would fail.
    if let Err(err) = s3
        .put_bucket_policy()
        .bucket(bucket)
        .policy(public_read_policy(bucket))
        .send()
        .await
    {
        warn!("Failed to set public-read policy on {bucket}: {err}");
    }

    Ok(())
}

fn public_read_policy(bucket: &str) -> String {
    format!(
        r#"{{"Version":"2012-10-17","Statement":[{{"Effect":"Allow","Principal":"*","Action":"s3:GetObject","Resource":"arn:aws:s3:::{bucket}/*"}}]}}"#
    )
}

pub fn public_url(config: &Config, key: &str) -> String {
    format!("{}/{}/{}", config.s3_public_url, config.proof_bucket, key)
}

/// `<12-char-token>-<sanitized-name>`: collision- and traversal-safe without
/// a naming registry.
pub fn object_key(filename: &str) -> String {
    format!("{}-{}", random_token(), sanitize_filename(filename))
}

pub fn sanitize_filename(name: &str) -> String {
    let whitespace = Regex::new(r"\s+").unwrap();
    let sanitized = whitespace.replace_all(name, "_").into_owned();

    let disallowed = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
    let sanitized = disallowed.replace_all(&sanitized, "").into_owned();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

fn random_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}
