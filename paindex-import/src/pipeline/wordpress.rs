//! WordPress blog migration orchestrator
//!
//! Imports categories (parents before children), tags, then posts. Per-post
//! failures are recorded and the run continues; only a source fetch failure
//! fails the batch. Images referenced by post bodies are copied into the
//! object store where possible, with failed copies left at their original
//! URLs.

use chrono::NaiveDateTime;
use regex::Regex;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use paindex_common::events::{BatchStatus, ErrorEntry, ImportEvent};
use paindex_common::{Error, Result};

use crate::models::{BlogCategory, BlogImportBatch, BlogPost, BlogTag, Redirect};
use crate::object_store::ObjectStore;
use crate::store::{batches, blog};
use crate::wp::{derive_excerpt, order_categories, rewrite_html, strip_tags, WpPost, WpSource};

use super::progress::ProgressSink;

const EXCERPT_MAX_CHARS: usize = 280;

/// Tunables for one migration run
#[derive(Debug, Clone)]
pub struct WpMigrationConfig {
    /// Leave posts whose wp_id already exists untouched
    pub skip_existing: bool,
    /// Copy referenced images into the object store
    pub migrate_images: bool,
    /// Error entries included in the `complete` event payload
    pub error_report_cap: usize,
}

impl Default for WpMigrationConfig {
    fn default() -> Self {
        Self {
            skip_existing: true,
            migrate_images: true,
            error_report_cap: 50,
        }
    }
}

/// Terminal batch record plus any cleanup problems that did not affect it
#[derive(Debug)]
pub struct MigrationOutcome {
    pub batch: BlogImportBatch,
    pub cleanup_warnings: Vec<String>,
}

pub struct WpMigrationPipeline {
    pool: SqlitePool,
    source: Arc<dyn WpSource>,
    object_store: Arc<dyn ObjectStore>,
    sink: Arc<dyn ProgressSink>,
    config: WpMigrationConfig,
}

impl WpMigrationPipeline {
    pub fn new(
        pool: SqlitePool,
        source: Arc<dyn WpSource>,
        object_store: Arc<dyn ObjectStore>,
        sink: Arc<dyn ProgressSink>,
        config: WpMigrationConfig,
    ) -> Self {
        Self {
            pool,
            source,
            object_store,
            sink,
            config,
        }
    }

    /// Run the migration to a terminal state. Same completion contract as
    /// the CSV pipeline: the terminal record is saved before the final
    /// event, and the final event closes the stream.
    pub async fn run(&self, mut batch: BlogImportBatch) -> MigrationOutcome {
        let batch_id = batch.batch_id;
        tracing::info!(batch_id = %batch_id, "Blog migration started");

        let fatal = match self.run_inner(&mut batch).await {
            Ok(()) => {
                batch.transition_to(BatchStatus::Completed);
                None
            }
            Err(e) => {
                let message = e.to_string();
                batch.error_entries.push(ErrorEntry {
                    row: None,
                    item: None,
                    message: message.clone(),
                });
                batch.transition_to(BatchStatus::Failed);
                tracing::error!(batch_id = %batch_id, error = %message, "Blog migration failed");
                Some(message)
            }
        };

        if let Err(e) = batches::save_blog_batch(&self.pool, &batch).await {
            tracing::error!(batch_id = %batch_id, error = %e, "Failed to persist batch record");
        }

        match fatal {
            None => {
                tracing::info!(
                    batch_id = %batch_id,
                    success = batch.posts_success,
                    skipped = batch.posts_skipped,
                    errors = batch.posts_errors,
                    "Blog migration completed"
                );
                self.sink.emit(ImportEvent::Complete {
                    batch_id,
                    stats: batch.stats(self.config.error_report_cap),
                });
            }
            Some(message) => self.sink.emit(ImportEvent::Error {
                batch_id,
                row: None,
                item: None,
                message,
                fatal: true,
            }),
        }

        MigrationOutcome {
            batch,
            cleanup_warnings: Vec::new(),
        }
    }

    async fn run_inner(&self, batch: &mut BlogImportBatch) -> Result<()> {
        self.set_status(batch, BatchStatus::Fetching).await?;

        let categories = self.source.list_categories().await?;
        let tags = self.source.list_tags().await?;
        let posts = self.source.list_posts().await?;

        self.set_status(batch, BatchStatus::Processing).await?;

        let category_map = self.import_categories(batch, categories).await?;
        let tag_map = self.import_tags(batch, tags).await?;

        batch.posts_total = posts.len() as u64;
        self.sink.emit(ImportEvent::Batch {
            batch_id: batch.batch_id,
            source: "wordpress".to_string(),
            total: batch.posts_total,
        });

        for (index, post) in posts.iter().enumerate() {
            self.process_post(batch, post, &category_map, &tag_map)
                .await;
            self.sink.emit(ImportEvent::Progress {
                batch_id: batch.batch_id,
                phase: "posts".to_string(),
                current: index as u64 + 1,
                total: batch.posts_total,
                percentage: percentage(index as u64 + 1, batch.posts_total),
            });
            batches::save_blog_batch(&self.pool, batch).await?;
        }

        Ok(())
    }

    /// Create missing categories parent-before-child; returns wp_id to local
    /// ID for everything now present
    async fn import_categories(
        &self,
        batch: &mut BlogImportBatch,
        categories: Vec<crate::wp::WpCategory>,
    ) -> Result<HashMap<u64, Uuid>> {
        let order = order_categories(categories);
        for warning in &order.warnings {
            tracing::warn!(batch_id = %batch.batch_id, "{}", warning);
        }

        let mut map = HashMap::new();
        for wp_category in order.ordered {
            if let Some(existing) = blog::find_category_by_wp_id(&self.pool, wp_category.id).await? {
                map.insert(wp_category.id, existing.id);
                continue;
            }
            let parent_id = (wp_category.parent != 0)
                .then(|| map.get(&wp_category.parent).copied())
                .flatten();
            let category = BlogCategory {
                id: Uuid::new_v4(),
                wp_id: wp_category.id,
                name: strip_tags(&wp_category.name),
                slug: wp_category.slug.clone(),
                parent_id,
            };
            blog::insert_category(&self.pool, &category).await?;
            map.insert(wp_category.id, category.id);
        }

        // Cycle members still import, as parentless roots, so no content is
        // dropped; the broken parent link is reported.
        for unresolved in order.unresolved {
            let message = format!(
                "category '{}' is part of a parent cycle; imported without a parent",
                unresolved.name
            );
            tracing::warn!(batch_id = %batch.batch_id, wp_id = unresolved.id, "{}", message);
            batch.error_entries.push(ErrorEntry {
                row: None,
                item: Some(unresolved.name.clone()),
                message: message.clone(),
            });
            self.sink.emit(ImportEvent::Error {
                batch_id: batch.batch_id,
                row: None,
                item: Some(unresolved.name.clone()),
                message,
                fatal: false,
            });

            match blog::find_category_by_wp_id(&self.pool, unresolved.id).await? {
                Some(existing) => {
                    map.insert(unresolved.id, existing.id);
                }
                None => {
                    let category = BlogCategory {
                        id: Uuid::new_v4(),
                        wp_id: unresolved.id,
                        name: strip_tags(&unresolved.name),
                        slug: unresolved.slug.clone(),
                        parent_id: None,
                    };
                    blog::insert_category(&self.pool, &category).await?;
                    map.insert(unresolved.id, category.id);
                }
            }
        }

        Ok(map)
    }

    async fn import_tags(
        &self,
        _batch: &mut BlogImportBatch,
        tags: Vec<crate::wp::WpTag>,
    ) -> Result<HashMap<u64, Uuid>> {
        let mut map = HashMap::new();
        for wp_tag in tags {
            if let Some(existing) = blog::find_tag_by_wp_id(&self.pool, wp_tag.id).await? {
                map.insert(wp_tag.id, existing.id);
                continue;
            }
            let tag = BlogTag {
                id: Uuid::new_v4(),
                wp_id: wp_tag.id,
                name: strip_tags(&wp_tag.name),
                slug: wp_tag.slug,
            };
            blog::insert_tag(&self.pool, &tag).await?;
            map.insert(wp_tag.id, tag.id);
        }
        Ok(map)
    }

    /// Import one post, folding any failure into the batch record
    async fn process_post(
        &self,
        batch: &mut BlogImportBatch,
        post: &WpPost,
        category_map: &HashMap<u64, Uuid>,
        tag_map: &HashMap<u64, Uuid>,
    ) {
        let title = strip_tags(&post.title.rendered);

        if self.config.skip_existing {
            match blog::find_post_by_wp_id(&self.pool, post.id).await {
                Ok(Some(_)) => {
                    batch.posts_skipped += 1;
                    self.sink.emit(ImportEvent::PostSkipped {
                        batch_id: batch.batch_id,
                        wp_id: post.id,
                        title,
                    });
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    let message = e.to_string();
                    batch.record_error(post.id, &title, message.clone());
                    self.sink.emit(ImportEvent::PostError {
                        batch_id: batch.batch_id,
                        wp_id: post.id,
                        title,
                        message,
                    });
                    return;
                }
            }
        }

        match self.migrate_post(batch, post, &title, category_map, tag_map).await {
            Ok(slug) => {
                batch.posts_success += 1;
                batch.redirects.push(Redirect {
                    from_slug: post.slug.clone(),
                    to_path: format!("/blog/{}", slug),
                });
                self.sink.emit(ImportEvent::PostComplete {
                    batch_id: batch.batch_id,
                    wp_id: post.id,
                    title,
                    slug,
                });
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    batch_id = %batch.batch_id,
                    wp_id = post.id,
                    error = %message,
                    "Post migration failed"
                );
                batch.record_error(post.id, &title, message.clone());
                self.sink.emit(ImportEvent::PostError {
                    batch_id: batch.batch_id,
                    wp_id: post.id,
                    title,
                    message,
                });
            }
        }
    }

    async fn migrate_post(
        &self,
        batch: &mut BlogImportBatch,
        post: &WpPost,
        title: &str,
        category_map: &HashMap<u64, Uuid>,
        tag_map: &HashMap<u64, Uuid>,
    ) -> Result<String> {
        let cover_source = self.source.media_source_url(post.featured_media).await;

        if self.config.migrate_images {
            let mut image_urls = body_image_urls(&post.content.rendered);
            if let Some(url) = &cover_source {
                image_urls.push(url.clone());
            }
            for url in image_urls {
                if batch.image_map.contains_key(&url) {
                    continue;
                }
                match self.migrate_image(&url).await {
                    Ok(migrated) => {
                        batch.image_map.insert(url.clone(), migrated.clone());
                        self.sink.emit(ImportEvent::Image {
                            batch_id: batch.batch_id,
                            source_url: url,
                            migrated_url: Some(migrated),
                        });
                    }
                    // Keep the original URL; the post still imports
                    Err(e) => {
                        tracing::warn!(
                            batch_id = %batch.batch_id,
                            url = %url,
                            error = %e,
                            "Image migration failed; keeping original URL"
                        );
                        self.sink.emit(ImportEvent::Image {
                            batch_id: batch.batch_id,
                            source_url: url,
                            migrated_url: None,
                        });
                    }
                }
            }
        }

        let html = rewrite_html(&post.content.rendered, &batch.image_map);
        let excerpt_source = if post.excerpt.rendered.trim().is_empty() {
            &post.content.rendered
        } else {
            &post.excerpt.rendered
        };
        let excerpt = derive_excerpt(excerpt_source, EXCERPT_MAX_CHARS);

        let cover_image_url =
            cover_source.map(|url| batch.image_map.get(&url).cloned().unwrap_or(url));

        let entity = BlogPost {
            id: Uuid::new_v4(),
            wp_id: post.id,
            title: title.to_string(),
            slug: post.slug.clone(),
            html,
            excerpt,
            cover_image_url,
            published_at: post.date_gmt.as_deref().and_then(parse_wp_timestamp),
            category_ids: post
                .categories
                .iter()
                .filter_map(|id| category_map.get(id).copied())
                .collect(),
            tag_ids: post
                .tags
                .iter()
                .filter_map(|id| tag_map.get(id).copied())
                .collect(),
        };
        blog::insert_post(&self.pool, &entity).await?;
        Ok(entity.slug)
    }

    async fn migrate_image(&self, url: &str) -> Result<String> {
        let filename = image_filename(url)
            .ok_or_else(|| Error::InvalidInput(format!("Cannot derive filename from {}", url)))?;
        let (bytes, content_type) = self.source.fetch_image(url).await?;
        self.object_store
            .upload(&format!("blog/images/{}", filename), &content_type, bytes)
            .await
    }

    async fn set_status(&self, batch: &mut BlogImportBatch, status: BatchStatus) -> Result<()> {
        batch.transition_to(status);
        batches::save_blog_batch(&self.pool, batch).await?;
        self.sink.emit(ImportEvent::Status {
            batch_id: batch.batch_id,
            status,
        });
        Ok(())
    }
}

fn percentage(current: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        current as f64 / total as f64 * 100.0
    }
}

/// WordPress serves date_gmt without a zone suffix
fn parse_wp_timestamp(text: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Image URLs referenced by `img` tags in a post body
fn body_image_urls(html: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r#"<img[^>]*\ssrc\s*=\s*"([^"]+)""#).unwrap());
    pattern
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Final path segment of an image URL, without any query string
fn image_filename(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query.rsplit('/').next()?;
    (!segment.is_empty() && segment.contains('.')).then(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MemoryObjectStore;
    use crate::pipeline::progress::CollectingSink;
    use crate::store::init_memory_database;
    use crate::wp::client::Rendered;
    use crate::wp::{WpCategory, WpTag};
    use async_trait::async_trait;

    struct FixtureSource {
        categories: Vec<WpCategory>,
        tags: Vec<WpTag>,
        posts: Vec<WpPost>,
        image_fetch_fails: bool,
    }

    #[async_trait]
    impl WpSource for FixtureSource {
        async fn list_categories(&self) -> Result<Vec<WpCategory>> {
            Ok(self.categories.clone())
        }

        async fn list_tags(&self) -> Result<Vec<WpTag>> {
            Ok(self.tags.clone())
        }

        async fn list_posts(&self) -> Result<Vec<WpPost>> {
            Ok(self.posts.clone())
        }

        async fn media_source_url(&self, media_id: u64) -> Option<String> {
            (media_id != 0).then(|| format!("https://old.example.com/media/{}.jpg", media_id))
        }

        async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
            if self.image_fetch_fails {
                return Err(Error::Http(format!("GET {} failed", url)));
            }
            Ok((vec![0xFF, 0xD8], "image/jpeg".to_string()))
        }
    }

    fn fixture_post(id: u64, slug: &str, body: &str) -> WpPost {
        WpPost {
            id,
            slug: slug.to_string(),
            date_gmt: Some("2023-04-01T12:00:00".to_string()),
            title: Rendered {
                rendered: format!("Post {}", id),
            },
            content: Rendered {
                rendered: body.to_string(),
            },
            excerpt: Rendered::default(),
            featured_media: 0,
            categories: vec![2],
            tags: vec![10],
        }
    }

    fn fixture() -> FixtureSource {
        FixtureSource {
            categories: vec![
                WpCategory {
                    id: 2,
                    parent: 1,
                    name: "Injections".to_string(),
                    slug: "injections".to_string(),
                },
                WpCategory {
                    id: 1,
                    parent: 0,
                    name: "Treatments".to_string(),
                    slug: "treatments".to_string(),
                },
            ],
            tags: vec![WpTag {
                id: 10,
                name: "back pain".to_string(),
                slug: "back-pain".to_string(),
            }],
            posts: vec![fixture_post(
                42,
                "managing-chronic-back-pain",
                "<p>Body text</p><img src=\"https://old.example.com/wp-content/a.jpg\" alt=\"x\">",
            )],
            image_fetch_fails: false,
        }
    }

    async fn run_migration(
        pool: &SqlitePool,
        source: FixtureSource,
        config: WpMigrationConfig,
    ) -> (MigrationOutcome, Vec<ImportEvent>) {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = WpMigrationPipeline::new(
            pool.clone(),
            Arc::new(source),
            Arc::new(MemoryObjectStore::new()),
            sink.clone() as Arc<dyn ProgressSink>,
            config,
        );
        let outcome = pipeline.run(BlogImportBatch::new(None)).await;
        (outcome, sink.events())
    }

    #[tokio::test]
    async fn migration_imports_taxonomy_and_posts() {
        let pool = init_memory_database().await.unwrap();
        let (outcome, events) =
            run_migration(&pool, fixture(), WpMigrationConfig::default()).await;

        assert_eq!(outcome.batch.status, BatchStatus::Completed);
        assert_eq!(outcome.batch.posts_success, 1);
        assert_eq!(outcome.batch.posts_errors, 0);

        // child category points at its imported parent
        let child = blog::find_category_by_wp_id(&pool, 2).await.unwrap().unwrap();
        let parent = blog::find_category_by_wp_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(child.parent_id, Some(parent.id));

        let post = blog::find_post_by_wp_id(&pool, 42).await.unwrap().unwrap();
        assert_eq!(post.category_ids, vec![child.id]);
        assert!(post.html.contains("memory://blog/images/a.jpg"));
        assert_eq!(post.published_at.unwrap().to_rfc3339(), "2023-04-01T12:00:00+00:00");

        assert!(matches!(events.last(), Some(ImportEvent::Complete { .. })));
        assert_eq!(
            outcome.batch.redirects,
            vec![Redirect {
                from_slug: "managing-chronic-back-pain".to_string(),
                to_path: "/blog/managing-chronic-back-pain".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn rerun_skips_existing_posts() {
        let pool = init_memory_database().await.unwrap();
        run_migration(&pool, fixture(), WpMigrationConfig::default()).await;
        let (outcome, events) =
            run_migration(&pool, fixture(), WpMigrationConfig::default()).await;

        assert_eq!(outcome.batch.posts_skipped, 1);
        assert_eq!(outcome.batch.posts_success, 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, ImportEvent::PostSkipped { wp_id: 42, .. })));
    }

    #[tokio::test]
    async fn cycle_categories_import_as_parentless_roots() {
        let pool = init_memory_database().await.unwrap();
        let source = FixtureSource {
            categories: vec![
                WpCategory {
                    id: 7,
                    parent: 8,
                    name: "A".to_string(),
                    slug: "a".to_string(),
                },
                WpCategory {
                    id: 8,
                    parent: 7,
                    name: "B".to_string(),
                    slug: "b".to_string(),
                },
            ],
            ..fixture()
        };
        let (outcome, _) = run_migration(&pool, source, WpMigrationConfig::default()).await;

        assert_eq!(outcome.batch.status, BatchStatus::Completed);
        let a = blog::find_category_by_wp_id(&pool, 7).await.unwrap().unwrap();
        assert!(a.parent_id.is_none());
        assert!(blog::find_category_by_wp_id(&pool, 8).await.unwrap().is_some());
        assert_eq!(outcome.batch.error_entries.len(), 2);
    }

    #[tokio::test]
    async fn failed_image_fetch_keeps_original_url() {
        let pool = init_memory_database().await.unwrap();
        let source = FixtureSource {
            image_fetch_fails: true,
            ..fixture()
        };
        let (outcome, events) =
            run_migration(&pool, source, WpMigrationConfig::default()).await;

        // the post still imports, with its original image URL
        assert_eq!(outcome.batch.posts_success, 1);
        let post = blog::find_post_by_wp_id(&pool, 42).await.unwrap().unwrap();
        assert!(post.html.contains("https://old.example.com/wp-content/a.jpg"));
        assert!(events.iter().any(|e| matches!(
            e,
            ImportEvent::Image {
                migrated_url: None,
                ..
            }
        )));
    }
}
