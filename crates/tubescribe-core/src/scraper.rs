//! Transcript scraping capability of the host page.

use async_trait::async_trait;

use crate::error::Result;
use crate::transcript::TranscriptSegment;

/// Reads the transcript UI of a page that is displaying a video.
///
/// The capability is deliberately low level: the content layer decides when
/// to reveal, how long to let the page settle, and guarantees `close` runs on
/// every exit path. Implementations never retry.
#[async_trait]
pub trait TranscriptScraper: Send + Sync {
    /// Opens the transcript UI. `Ok(false)` means the page offers none.
    async fn reveal(&self) -> Result<bool>;

    /// Reads the segments currently rendered, in page order.
    async fn read_segments(&self) -> Result<Vec<TranscriptSegment>>;

    /// Closes whatever `reveal` opened. Must be idempotent.
    fn close(&self);
}
