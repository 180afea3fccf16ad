//! Question image storage
//!
//! Uploaded question images go to an S3 bucket under `question_images/` and are
//! served either through a CloudFront domain or straight from the bucket.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use qvd_common::config::StorageConfig;
use thiserror::Error;

/// Object-key prefix for uploaded question images
pub const IMAGE_KEY_PREFIX: &str = "question_images";

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Blob store for question images
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ImageStoreError>;

    /// URL under which a stored key can be fetched
    fn public_url(&self, key: &str) -> String;
}

/// Image supplied by the dashboard
#[derive(Debug, Clone)]
pub enum ImageAttachment {
    /// Reference to an already-hosted image (e.g. picked in the image browser)
    Url(String),
    /// Raw upload from a multipart form
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// `question_images/question_{id}_{uuid}{.ext}`
pub fn object_key_for(question_id: i64, file_name: &str) -> String {
    let extension = file_extension(&sanitize_file_name(file_name));
    format!(
        "{}/question_{}_{}{}",
        IMAGE_KEY_PREFIX,
        question_id,
        uuid::Uuid::new_v4().simple(),
        extension
    )
}

/// Strip directories and anything outside `[A-Za-z0-9._-]`
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Extension including the dot, lowercased; empty when there is none
fn file_extension(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < file_name.len() => {
            file_name[pos..].to_ascii_lowercase()
        }
        _ => String::new(),
    }
}

/// S3-backed image store
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    cloudfront_domain: Option<String>,
}

impl S3ImageStore {
    /// Build the S3 client from explicit keys when configured, otherwise from
    /// the default AWS credential chain
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "qvd-config",
            );
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            cloudfront_domain: config.cloudfront_domain.clone(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ImageStoreError> {
        let size = bytes.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|e| ImageStoreError::Upload(format!("S3 put_object failed: {}", e)))?;

        tracing::info!(bucket = %self.bucket, key = %key, size, "Uploaded question image");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, self.cloudfront_domain.as_deref(), key)
    }
}

fn public_url(bucket: &str, cloudfront_domain: Option<&str>, key: &str) -> String {
    match cloudfront_domain {
        Some(domain) => format!("https://{}/{}", domain.trim_end_matches('/'), key),
        None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}
