//! Image browser queries with a short-lived cache
//!
//! Extracted images change only when a new extraction run is loaded, so the
//! browser endpoints are served from an in-process TTL cache. Source files can
//! be referenced either by their full JSON path (`jsons/rafi3-10.json`) or by
//! the short name the extractor used (`rafi3-10`); lookups try both.

use moka::sync::Cache;
use qvd_common::config::CacheConfig;
use qvd_common::db::ExtractedImage;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::db;

/// Image as returned to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: i64,
    pub source_file: String,
    pub page_number: i64,
    pub image_path: String,
    pub url: Option<String>,
    pub question_number: Option<i64>,
    /// True when the image belongs to the question number the caller asked about
    pub is_question_image: bool,
}

impl ImageView {
    fn from_row(row: ExtractedImage, highlight: Option<i64>) -> Self {
        let is_question_image = highlight.is_some() && row.question_number == highlight;
        Self {
            id: row.id,
            source_file: row.source_file,
            page_number: row.page_number,
            image_path: row.image_path,
            url: row.s3_url,
            question_number: row.question_number,
            is_question_image,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileImagesResponse {
    pub images: Vec<ImageView>,
    pub file_path: String,
    pub page_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageImagesResponse {
    pub images: Vec<ImageView>,
    pub page_number: i64,
    /// The variation that matched (or the requested path when nothing matched)
    pub file_path: String,
    /// Requested path, present only when a different variation matched
    pub original_query_path: Option<String>,
    /// Pages that do have images; present only when nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_pages: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailablePagesResponse {
    pub pages: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    ImageFiles,
    FileImages {
        file_path: String,
        page_number: Option<i64>,
        question_number: Option<i64>,
    },
    PageImages {
        file_path: String,
        page_number: i64,
        question_number: Option<i64>,
    },
    AvailablePages(String),
}

#[derive(Debug, Clone)]
enum CachedResponse {
    ImageFiles(ImageFilesResponse),
    FileImages(FileImagesResponse),
    PageImages(PageImagesResponse),
    AvailablePages(AvailablePagesResponse),
}

/// Cached read access to `extracted_images`
pub struct ImageBrowser {
    db: SqlitePool,
    cache: Cache<CacheKey, CachedResponse>,
}

impl ImageBrowser {
    pub fn new(db: SqlitePool, config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self { db, cache }
    }

    pub async fn image_files(&self) -> Result<ImageFilesResponse, sqlx::Error> {
        if let Some(CachedResponse::ImageFiles(hit)) = self.cache.get(&CacheKey::ImageFiles) {
            return Ok(hit);
        }

        let response = ImageFilesResponse {
            files: db::images::list_source_files(&self.db).await?,
        };
        self.cache
            .insert(CacheKey::ImageFiles, CachedResponse::ImageFiles(response.clone()));
        Ok(response)
    }

    pub async fn file_images(
        &self,
        file_path: &str,
        page_number: Option<i64>,
        question_number: Option<i64>,
    ) -> Result<FileImagesResponse, sqlx::Error> {
        let key = CacheKey::FileImages {
            file_path: file_path.to_string(),
            page_number,
            question_number,
        };
        if let Some(CachedResponse::FileImages(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }

        let images = db::images::images_for_file(&self.db, file_path, page_number)
            .await?
            .into_iter()
            .map(|row| ImageView::from_row(row, question_number))
            .collect();

        let response = FileImagesResponse {
            images,
            file_path: file_path.to_string(),
            page_number,
        };
        self.cache
            .insert(key, CachedResponse::FileImages(response.clone()));
        Ok(response)
    }

    pub async fn page_images(
        &self,
        file_path: &str,
        page_number: i64,
        question_number: Option<i64>,
    ) -> Result<PageImagesResponse, sqlx::Error> {
        let key = CacheKey::PageImages {
            file_path: file_path.to_string(),
            page_number,
            question_number,
        };
        if let Some(CachedResponse::PageImages(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }

        let variations = file_variations(file_path);
        for variation in &variations {
            let rows = db::images::images_for_file(&self.db, variation, Some(page_number)).await?;
            if rows.is_empty() {
                continue;
            }

            info!(
                "Found {} images for file {}, page {}",
                rows.len(),
                variation,
                page_number
            );
            let response = PageImagesResponse {
                images: rows
                    .into_iter()
                    .map(|row| ImageView::from_row(row, question_number))
                    .collect(),
                page_number,
                file_path: variation.clone(),
                original_query_path: (variation != file_path).then(|| file_path.to_string()),
                available_pages: None,
                message: None,
            };
            self.cache
                .insert(key, CachedResponse::PageImages(response.clone()));
            return Ok(response);
        }

        warn!(
            "No images found for file variations {:?}, page {}",
            variations, page_number
        );
        let available_pages = self.pages_for_variations(&variations).await?;
        debug!(?available_pages, "Pages with images for {}", file_path);

        let response = PageImagesResponse {
            images: Vec::new(),
            page_number,
            file_path: file_path.to_string(),
            original_query_path: None,
            available_pages: Some(available_pages),
            message: Some(format!(
                "No images found for {}, page {}",
                file_path, page_number
            )),
        };
        self.cache
            .insert(key, CachedResponse::PageImages(response.clone()));
        Ok(response)
    }

    pub async fn available_pages(&self, file_path: &str) -> Result<AvailablePagesResponse, sqlx::Error> {
        let key = CacheKey::AvailablePages(file_path.to_string());
        if let Some(CachedResponse::AvailablePages(hit)) = self.cache.get(&key) {
            return Ok(hit);
        }

        let pages = self.pages_for_variations(&file_variations(file_path)).await?;

        let response = AvailablePagesResponse { pages };
        self.cache
            .insert(key, CachedResponse::AvailablePages(response.clone()));
        Ok(response)
    }

    /// Pages of the first variation that has any images
    async fn pages_for_variations(&self, variations: &[String]) -> Result<Vec<i64>, sqlx::Error> {
        for variation in variations {
            let pages = db::images::pages_for_file(&self.db, variation).await?;
            if !pages.is_empty() {
                return Ok(pages);
            }
        }
        Ok(Vec::new())
    }
}

/// Names under which the extractor may have recorded a source file
///
/// `jsons/rafi3-10.json` is also tried as `rafi3-10`.
pub fn file_variations(file_path: &str) -> Vec<String> {
    let mut variations = vec![file_path.to_string()];
    if file_path.starts_with("jsons/") {
        let last = file_path.rsplit('/').next().unwrap_or(file_path);
        let short_name = last.replace(".json", "");
        if short_name != file_path {
            variations.push(short_name);
        }
    }
    variations
}
