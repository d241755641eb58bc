//! Transcript segments and the content context's single-video cache.

use serde::{Deserialize, Serialize};

use crate::error::ScribeError;

/// One timed line of a transcript as shown by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Timestamp label as rendered by the page (e.g. "1:05").
    pub time: String,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(time: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            text: text.into(),
        }
    }
}

/// Joins segment texts with single spaces, dropping timestamps.
pub fn full_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Placeholder shown in place of a transcript that could not be scraped.
pub fn unavailable_notice() -> String {
    ScribeError::ScrapeFailed.to_string()
}

/// Loading state of the transcript for the current video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    /// No video observed yet.
    Idle,
    /// A video is known but nothing has been scraped for it.
    VideoDetected,
    /// A scrape is in progress.
    Loading,
    /// Segments are cached.
    Ready,
    /// The last scrape came back empty.
    Unavailable,
}

/// Transcript of the single visibly active video.
///
/// Owned by the content context. Any change of the observed video drops the
/// cached segments; there is never more than one live entry.
#[derive(Debug, Clone)]
pub struct TranscriptCache {
    video_id: Option<String>,
    segments: Vec<TranscriptSegment>,
    status: TranscriptStatus,
}

impl Default for TranscriptCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptCache {
    pub fn new() -> Self {
        Self {
            video_id: None,
            segments: Vec::new(),
            status: TranscriptStatus::Idle,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn status(&self) -> TranscriptStatus {
        self.status
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// Records the currently visible video.
    ///
    /// Returns `true` when the video differs from the previous one, in which
    /// case the cache is invalidated.
    pub fn observe_video(&mut self, video_id: &str) -> bool {
        if self.video_id.as_deref() == Some(video_id) {
            return false;
        }
        self.video_id = Some(video_id.to_string());
        self.segments.clear();
        self.status = TranscriptStatus::VideoDetected;
        true
    }

    /// True while a scrape is running or segments are already cached.
    pub fn is_settled_or_loading(&self) -> bool {
        matches!(
            self.status,
            TranscriptStatus::Loading | TranscriptStatus::Ready
        )
    }

    /// Cached segments for `video_id`, if the cache holds them.
    pub fn ready_segments(&self, video_id: &str) -> Option<&[TranscriptSegment]> {
        if self.status == TranscriptStatus::Ready && self.video_id.as_deref() == Some(video_id) {
            Some(self.segments.as_slice())
        } else {
            None
        }
    }

    /// Marks a scrape for `video_id` as started; ignored for a stale video.
    pub fn begin_loading(&mut self, video_id: &str) -> bool {
        if self.video_id.as_deref() != Some(video_id) {
            return false;
        }
        self.status = TranscriptStatus::Loading;
        true
    }

    /// Stores a scrape result.
    ///
    /// The result is discarded when the visible video changed while the
    /// scrape was running. Returns whether it was stored.
    pub fn store(&mut self, video_id: &str, segments: Vec<TranscriptSegment>) -> bool {
        if self.video_id.as_deref() != Some(video_id) {
            return false;
        }
        self.status = if segments.is_empty() {
            TranscriptStatus::Unavailable
        } else {
            TranscriptStatus::Ready
        };
        self.segments = segments;
        true
    }
}
