//! The news processing job: scrape, prune, render, post.

use std::collections::HashSet;
use std::sync::Arc;

use nr_core::{ArticleStorage, QueueEntry, Result, VideoRenderer, VideoRequest};
use nr_publish::{DrainOutcome, PostQueue};
use nr_scrapers::ScraperManager;
use tracing::{error, info, warn};

pub mod scheduler;

pub use scheduler::{run_periodic, SCRAPE_INTERVAL};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Articles on the listings this run; `None` when the scrape pass failed
    pub scraped: Option<usize>,
    pub deleted: usize,
    /// Videos rendered and handed to the post queue
    pub rendered: usize,
}

pub struct Pipeline {
    manager: ScraperManager,
    storage: Arc<dyn ArticleStorage>,
    renderer: Arc<dyn VideoRenderer>,
    queue: Arc<PostQueue>,
}

impl Pipeline {
    pub fn new(manager: ScraperManager, renderer: Arc<dyn VideoRenderer>, queue: Arc<PostQueue>) -> Self {
        let storage = manager.storage().clone();
        Self {
            manager,
            storage,
            renderer,
            queue,
        }
    }

    pub fn queue(&self) -> &Arc<PostQueue> {
        &self.queue
    }

    pub async fn run(&self) -> Result<JobReport> {
        info!("🚀 Starting news processing job");
        let mut report = JobReport::default();

        match self.manager.scrape_and_process().await {
            Ok(current) => {
                report.scraped = Some(current.len());
                match self.manager.cleanup_old_articles(&current).await {
                    Ok(deleted) => report.deleted = deleted,
                    Err(e) => error!("Article cleanup error: {}", e),
                }
            }
            // An empty result here would look like "every article is gone".
            Err(e) => error!("News scraping error, skipping cleanup: {}", e),
        }

        report.rendered = self.process_news_videos().await?;
        info!(
            "🏁 Job finished: {} current, {} deleted, {} rendered, {} waiting to post",
            report.scraped.unwrap_or(0),
            report.deleted,
            report.rendered,
            self.queue.len()
        );
        Ok(report)
    }

    /// Retry whatever is still queued, then render every article without a
    /// posted video and queue it for upload. Articles whose video is already
    /// queued are left alone.
    pub async fn process_news_videos(&self) -> Result<usize> {
        if !self.queue.is_empty() {
            info!("🔁 Retrying {} queued videos", self.queue.len());
            self.queue.process_queue().await;
        }

        let pending = self.storage.list_pending_videos().await?;
        let queued: HashSet<i64> = self.queue.snapshot().iter().map(|e| e.article_id).collect();

        let mut rendered = 0;
        for article in pending {
            if queued.contains(&article.id) {
                continue;
            }

            let video_path = match self.renderer.render(&VideoRequest::from(&article)).await {
                Ok(path) => path,
                Err(e) => {
                    error!("Video generation error for {}: {}", article.title, e);
                    continue;
                }
            };
            rendered += 1;

            let outcome = self
                .queue
                .enqueue(QueueEntry {
                    video_path,
                    article_id: article.id,
                })
                .await;
            if let DrainOutcome::Halted { failed, .. } = outcome {
                warn!(
                    "Posting halted at article {}, {} entries waiting for the next run",
                    failed.article_id,
                    self.queue.len()
                );
            }
        }
        Ok(rendered)
    }
}
