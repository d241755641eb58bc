//! Transcript source for pages hosted by the runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tubescribe_core::Result;
use tubescribe_core::scraper::TranscriptScraper;
use tubescribe_core::transcript::TranscriptSegment;
use tubescribe_core::watch_url::watch_video_id;

/// Transcripts the runtime's pages can show, keyed by video id.
#[derive(Clone, Default)]
pub struct TranscriptLibrary {
    entries: Arc<RwLock<HashMap<String, Vec<TranscriptSegment>>>>,
}

impl TranscriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, video_id: impl Into<String>, segments: Vec<TranscriptSegment>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(video_id.into(), segments);
    }

    pub fn get(&self, video_id: &str) -> Option<Vec<TranscriptSegment>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(video_id)
            .cloned()
    }
}

/// Scraper of one tab: reads whatever transcript the library holds for the
/// video the tab currently shows.
pub struct FixtureScraper {
    library: TranscriptLibrary,
    page_url: Arc<Mutex<String>>,
    open: AtomicBool,
}

impl FixtureScraper {
    pub fn new(library: TranscriptLibrary, page_url: Arc<Mutex<String>>) -> Self {
        Self {
            library,
            page_url,
            open: AtomicBool::new(false),
        }
    }

    /// Whether the transcript UI is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn current(&self) -> Option<Vec<TranscriptSegment>> {
        let url = self
            .page_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        watch_video_id(&url).and_then(|video_id| self.library.get(&video_id))
    }
}

#[async_trait]
impl TranscriptScraper for FixtureScraper {
    async fn reveal(&self) -> Result<bool> {
        let available = self.current().is_some();
        if available {
            self.open.store(true, Ordering::SeqCst);
        }
        Ok(available)
    }

    async fn read_segments(&self) -> Result<Vec<TranscriptSegment>> {
        Ok(self.current().unwrap_or_default())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}
