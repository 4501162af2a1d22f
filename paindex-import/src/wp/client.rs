//! WordPress REST API client
//!
//! Reads the public `wp-json/wp/v2` endpoints. Collections are paginated at
//! 100 items per page; a short page ends the walk, and WordPress answers 400
//! for a page past the end, which is also treated as the end.

use paindex_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const PER_PAGE: usize = 100;

/// WordPress category as returned by `/wp/v2/categories`
#[derive(Debug, Clone, Deserialize)]
pub struct WpCategory {
    pub id: u64,
    pub name: String,
    pub slug: String,
    /// Parent category ID; 0 for roots
    #[serde(default)]
    pub parent: u64,
}

/// WordPress tag as returned by `/wp/v2/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct WpTag {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// Rendered-content wrapper used throughout the WordPress API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// WordPress post as returned by `/wp/v2/posts`
#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    /// Featured image attachment ID; 0 when none
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct WpMedia {
    source_url: String,
}

/// Client for one WordPress site
pub struct WpClient {
    client: reqwest::Client,
    base_url: String,
}

impl WpClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<WpCategory>> {
        self.list_all("categories").await
    }

    pub async fn list_tags(&self) -> Result<Vec<WpTag>> {
        self.list_all("tags").await
    }

    pub async fn list_posts(&self) -> Result<Vec<WpPost>> {
        self.list_all("posts").await
    }

    /// Source URL of a media attachment, `None` when it cannot be resolved
    pub async fn media_source_url(&self, media_id: u64) -> Option<String> {
        if media_id == 0 {
            return None;
        }
        let url = format!("{}/wp-json/wp/v2/media/{}", self.base_url, media_id);
        let media: WpMedia = self
            .client
            .get(&url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;
        Some(media.source_url)
    }

    /// Fetch raw image bytes with their content type
    pub async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("Reading {} failed: {}", url, e)))?;
        Ok((bytes.to_vec(), content_type))
    }

    /// Walk every page of a collection endpoint
    async fn list_all<T: serde::de::DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/wp-json/wp/v2/{}?per_page={}&page={}",
                self.base_url, resource, PER_PAGE, page
            );
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

            // Past-the-end pages answer 400 (rest_post_invalid_page_number)
            if response.status() == reqwest::StatusCode::BAD_REQUEST && page > 1 {
                break;
            }
            let response = response
                .error_for_status()
                .map_err(|e| Error::Http(format!("GET {} failed: {}", url, e)))?;

            let batch: Vec<T> = response
                .json()
                .await
                .map_err(|e| Error::Http(format!("Decoding {} failed: {}", url, e)))?;

            let short_page = batch.len() < PER_PAGE;
            items.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(resource, count = items.len(), "WordPress collection fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_with_missing_optional_fields() {
        let json = r#"{
            "id": 42,
            "slug": "managing-chronic-back-pain",
            "date_gmt": "2023-04-01T12:00:00",
            "title": {"rendered": "Managing Chronic Back Pain"},
            "content": {"rendered": "<p>Body</p>"}
        }"#;
        let post: WpPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, 42);
        assert_eq!(post.title.rendered, "Managing Chronic Back Pain");
        assert!(post.excerpt.rendered.is_empty());
        assert_eq!(post.featured_media, 0);
        assert!(post.categories.is_empty());
    }

    #[test]
    fn category_defaults_parent_to_root() {
        let json = r#"{"id": 7, "name": "News", "slug": "news"}"#;
        let category: WpCategory = serde_json::from_str(json).unwrap();
        assert_eq!(category.parent, 0);
    }
}
