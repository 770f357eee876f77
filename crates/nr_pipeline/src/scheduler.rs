use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::Pipeline;

pub const SCRAPE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Runs the job every `period`, starting immediately. A run that overruns
/// the period delays the next one instead of overlapping it.
pub async fn run_periodic(pipeline: Arc<Pipeline>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("⏰ Scheduled run");
        if let Err(e) = pipeline.run().await {
            error!("News processing job failed: {}", e);
        }
        info!("Next run in {}s", period.as_secs());
    }
}
