use std::sync::Arc;
use std::time::Duration;

use tubescribe_core::scraper::TranscriptScraper;
use tubescribe_core::transcript::TranscriptSegment;

/// Runs single scrape attempts against the page's transcript UI.
pub struct TranscriptLoader {
    scraper: Arc<dyn TranscriptScraper>,
    settle_delay: Duration,
}

/// Closes the transcript UI when dropped, whichever way the scrape ends.
struct CloseGuard<'a> {
    scraper: &'a dyn TranscriptScraper,
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        self.scraper.close();
    }
}

impl TranscriptLoader {
    pub fn new(scraper: Arc<dyn TranscriptScraper>, settle_delay: Duration) -> Self {
        Self {
            scraper,
            settle_delay,
        }
    }

    /// One attempt: reveal, let the page settle, read. Never retries; any
    /// failure yields an empty sequence.
    pub async fn scrape(&self) -> Vec<TranscriptSegment> {
        let _guard = CloseGuard {
            scraper: self.scraper.as_ref(),
        };

        match self.scraper.reveal().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("[Content] Transcript button not found");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!("[Content] Revealing transcript failed: {}", err);
                return Vec::new();
            }
        }

        tokio::time::sleep(self.settle_delay).await;

        match self.scraper.read_segments().await {
            Ok(segments) => {
                tracing::info!("[Content] Found {} transcript segments", segments.len());
                segments
            }
            Err(err) => {
                tracing::warn!("[Content] Reading transcript failed: {}", err);
                Vec::new()
            }
        }
    }
}
