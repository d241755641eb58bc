//! Recognition of video watch pages.

use url::Url;

const WATCH_PATH: &str = "/watch";
const VIDEO_PARAM: &str = "v";

/// Extracts the video id from a watch-page URL.
///
/// Only `https://(www.|m.)youtube.com/watch?v=<id>` qualifies; any other
/// page, or a watch page without a non-empty `v` parameter, yields `None`.
pub fn watch_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !is_video_host(host) || parsed.path() != WATCH_PATH {
        return None;
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == VIDEO_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// True when `url` is a watch page the content script should run on.
pub fn is_watch_page(url: &str) -> bool {
    watch_video_id(url).is_some()
}

/// True for any page of the video site, watch page or not.
pub fn is_video_site(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(is_video_host))
        .unwrap_or(false)
}

fn is_video_host(host: &str) -> bool {
    host == "youtube.com" || host.ends_with(".youtube.com")
}

/// Builds the canonical watch URL for `video_id`.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com{WATCH_PATH}?{VIDEO_PARAM}={video_id}")
}
