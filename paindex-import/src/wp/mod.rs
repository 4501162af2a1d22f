//! WordPress source access and content processing

pub mod client;
pub mod content;
pub mod taxonomy;

pub use client::{WpCategory, WpClient, WpPost, WpTag};
pub use content::{derive_excerpt, rewrite_html, sanitize, strip_tags};
pub use taxonomy::{order_categories, TaxonomyOrder};

use async_trait::async_trait;
use paindex_common::Result;

/// Read access to a WordPress site, as the migration pipeline needs it.
///
/// [`WpClient`] is the production implementation; tests substitute a fixture.
#[async_trait]
pub trait WpSource: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<WpCategory>>;
    async fn list_tags(&self) -> Result<Vec<WpTag>>;
    async fn list_posts(&self) -> Result<Vec<WpPost>>;
    /// Source URL of a media attachment, `None` when it cannot be resolved
    async fn media_source_url(&self, media_id: u64) -> Option<String>;
    /// Raw image bytes with their content type
    async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)>;
}

#[async_trait]
impl WpSource for WpClient {
    async fn list_categories(&self) -> Result<Vec<WpCategory>> {
        WpClient::list_categories(self).await
    }

    async fn list_tags(&self) -> Result<Vec<WpTag>> {
        WpClient::list_tags(self).await
    }

    async fn list_posts(&self) -> Result<Vec<WpPost>> {
        WpClient::list_posts(self).await
    }

    async fn media_source_url(&self, media_id: u64) -> Option<String> {
        WpClient::media_source_url(self, media_id).await
    }

    async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        WpClient::fetch_image(self, url).await
    }
}
