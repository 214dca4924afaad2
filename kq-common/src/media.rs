//! Media identifier extraction
//!
//! Maps a submitted video link to the identifier the player loads. The mapping
//! is persisted alongside every queue entry, so the accepted shapes and their
//! results must never change:
//!
//! - `https://www.youtube.com/watch?v=VIDEO_ID` (any `youtube.com` host, `v` query parameter)
//! - `https://youtu.be/VIDEO_ID` (first path segment; later segments are ignored)
//! - `https://www.youtube.com/embed/VIDEO_ID?start=10` (segment after `/embed/`)

use url::Url;

const LONG_HOST: &str = "youtube.com";
const SHORT_HOST: &str = "youtu.be";
const EMBED_MARKER: &str = "/embed/";

/// Extract the media identifier from a submitted link
///
/// Returns `None` for unrelated domains, unsupported paths, empty identifiers
/// and links that do not parse as absolute URLs.
pub fn extract_media_id(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();

    let id = if is_long_host(&host) {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
            Some(v.into_owned())
        } else {
            url.path()
                .split_once(EMBED_MARKER)
                .and_then(|(_, rest)| rest.split('/').next())
                .map(str::to_string)
        }
    } else if host == SHORT_HOST {
        url.path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else {
        None
    };

    id.filter(|id| !id.is_empty())
}

fn is_long_host(host: &str) -> bool {
    host == LONG_HOST || host.ends_with(".youtube.com")
}
