use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use nr_core::{ArticleStorage, QueueEntry, Uploader};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was already running; it will pick the entries up.
    Busy,
    /// The queue was emptied.
    Drained { posted: usize },
    /// An upload failed; the entry is back at the head and draining stopped.
    Halted { posted: usize, failed: QueueEntry },
}

/// Serializes uploads so only one browser session talks to the account at a
/// time. Entries live in memory only.
pub struct PostQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    processing: AtomicBool,
    uploader: Arc<dyn Uploader>,
    storage: Arc<dyn ArticleStorage>,
}

/// Clears the busy flag however the drain ends.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PostQueue {
    pub fn new(uploader: Arc<dyn Uploader>, storage: Arc<dyn ArticleStorage>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            processing: AtomicBool::new(false),
            uploader,
            storage,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Pending entries, head first.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueueEntry>> {
        // A panic while holding this lock cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append to the tail and start draining if nobody else is.
    pub async fn enqueue(&self, entry: QueueEntry) -> DrainOutcome {
        info!("📥 Queued video for article {}: {}", entry.article_id, entry.video_path.display());
        self.lock().push_back(entry);
        self.process_queue().await
    }

    /// Drain head to tail. The first failed upload goes back to the head and
    /// ends the pass; later entries wait for the next trigger.
    pub async fn process_queue(&self) -> DrainOutcome {
        if self.processing.swap(true, Ordering::AcqRel) {
            return DrainOutcome::Busy;
        }
        let _guard = ProcessingGuard(&self.processing);

        let mut posted = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(entry) = next else {
                return DrainOutcome::Drained { posted };
            };

            if let Err(e) = self.uploader.upload(&entry.video_path).await {
                error!(
                    "Video posting error on {} for {}: {}",
                    self.uploader.platform(),
                    entry.video_path.display(),
                    e
                );
                self.lock().push_front(entry.clone());
                return DrainOutcome::Halted { posted, failed: entry };
            }

            posted += 1;
            self.finish(&entry).await;
        }
    }

    /// Post-upload bookkeeping. Failures here are logged only: the video is
    /// already live, so retrying the entry would post it twice.
    async fn finish(&self, entry: &QueueEntry) {
        if let Err(e) = tokio::fs::remove_file(&entry.video_path).await {
            warn!("Failed to delete {}: {}", entry.video_path.display(), e);
        }
        match self.storage.mark_video_generated(entry.article_id, Utc::now()).await {
            Ok(()) => info!("✅ Posted and deleted video for article ID: {}", entry.article_id),
            Err(e) => error!("Failed to flag article {} as posted: {}", entry.article_id, e),
        }
    }
}
