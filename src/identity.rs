//! Video identity resolution.
//!
//! Maps an arbitrary page URL to a canonical identity string so that every
//! URL variant of the same logical video (query-string noise, short links,
//! embeds, playlist positions) shares one persisted settings record.
//!
//! Resolution is pure and deterministic: the same URL always yields the same
//! identity, and a URL that is not a recognized video yields `None`. Parse
//! failures are not errors — they resolve to `None`.

use serde::{Deserialize, Serialize};
use url::Url;

/// Canonical identity of a logical video.
///
/// Rendered as `youtube:<videoId>` or `iyftv:<playId>[:<videoId>]`. Opaque to
/// callers; only the store derives keys from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoIdentity(String);

impl VideoIdentity {
    /// Wrap an identity string that was previously produced by [`resolve`]
    /// (e.g. one round-tripped through an export file or a delete request).
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<VideoIdentity> for String {
    fn from(identity: VideoIdentity) -> Self {
        identity.0
    }
}

/// Resolve a raw page URL to a canonical video identity.
///
/// Returns `None` for unparseable URLs, non-video hosts, and video hosts
/// where no usable id can be extracted (including empty-string segments).
#[must_use]
pub fn resolve(url: &str) -> Option<VideoIdentity> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    if host.contains("youtube.com") || host.contains("youtu.be") {
        return youtube_video_id(&parsed).map(|id| VideoIdentity(format!("youtube:{id}")));
    }

    if host.contains("iyf.tv") {
        return iyftv_video_id(&parsed).map(|id| VideoIdentity(format!("iyftv:{id}")));
    }

    None
}

/// True iff the URL resolves to a video identity.
#[must_use]
pub fn is_video_url(url: &str) -> bool {
    resolve(url).is_some()
}

/// Best-effort display label for an identity when no page title was captured.
///
/// Falls back to `hostname+path` for original URLs outside the recognized
/// hosts, and to the raw string when the original URL itself is unparseable.
#[must_use]
pub fn display_name(identity: &VideoIdentity, original_url: &str) -> String {
    if let Some(id) = identity.as_str().strip_prefix("youtube:") {
        return format!("YouTube: {id}");
    }
    if let Some(id) = identity.as_str().strip_prefix("iyftv:") {
        return format!("iyf.tv視頻: {id}");
    }
    match Url::parse(original_url) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path()),
        Err(_) => original_url.to_owned(),
    }
}

/// Extract a YouTube video id from a watch, short-link, or embed URL.
fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;

    // Standard watch URL: youtube.com/watch?v=VIDEO_ID
    if host.contains("youtube.com") && url.path() == "/watch" {
        let id = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?;
        return non_empty(id);
    }

    // Short link: youtu.be/VIDEO_ID
    if host.contains("youtu.be") {
        return non_empty(url.path().trim_start_matches('/').to_owned());
    }

    // Embed URL: youtube.com/embed/VIDEO_ID
    if host.contains("youtube.com") && url.path().contains("/embed/") {
        let tail = url.path().rsplit('/').next().unwrap_or("");
        return non_empty(tail.to_owned());
    }

    None
}

/// Extract an iyf.tv id from a `/play/` URL.
///
/// The path tail is the play id; the `id` query parameter is the video id.
/// Both present → joined; one present → that one alone.
fn iyftv_video_id(url: &Url) -> Option<String> {
    if !url.path().contains("/play/") {
        return None;
    }

    let play_id = non_empty(url.path().rsplit('/').next().unwrap_or("").to_owned());
    let video_id = url
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .and_then(non_empty);

    match (play_id, video_id) {
        (Some(play), Some(video)) => Some(format!("{play}:{video}")),
        (Some(play), None) => Some(play),
        (None, Some(video)) => Some(video),
        (None, None) => None,
    }
}

fn non_empty(segment: String) -> Option<String> {
    if segment.is_empty() { None } else { Some(segment) }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn watch_short_link_and_embed_share_one_identity() {
        let watch = resolve("https://www.youtube.com/watch?v=abc123").unwrap();
        let short = resolve("https://youtu.be/abc123").unwrap();
        let embed = resolve("https://www.youtube.com/embed/abc123").unwrap();

        assert_eq!(watch.as_str(), "youtube:abc123");
        assert_eq!(watch, short);
        assert_eq!(watch, embed);
    }

    #[test]
    fn query_string_noise_does_not_change_identity() {
        let plain = resolve("https://www.youtube.com/watch?v=Zq9x").unwrap();
        let noisy = resolve("https://www.youtube.com/watch?v=Zq9x&t=120s&list=PL123").unwrap();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn iyftv_combines_play_and_video_ids() {
        assert_eq!(
            resolve("https://www.iyf.tv/play/XYZ?id=QW1").unwrap().as_str(),
            "iyftv:XYZ:QW1"
        );
        assert_eq!(
            resolve("https://www.iyf.tv/play/XYZ").unwrap().as_str(),
            "iyftv:XYZ"
        );
    }

    #[test]
    fn iyftv_without_play_path_is_not_a_video() {
        assert!(resolve("https://www.iyf.tv/browse").is_none());
    }

    #[test]
    fn unrecognized_hosts_resolve_to_none() {
        assert!(resolve("https://example.com/").is_none());
        assert!(!is_video_url("https://example.com/"));
        assert!(resolve("not a url at all").is_none());
    }

    #[test]
    fn empty_segments_are_rejected() {
        assert!(resolve("https://www.youtube.com/embed/").is_none());
        assert!(resolve("https://youtu.be/").is_none());
        assert!(resolve("https://www.youtube.com/watch?v=").is_none());
    }

    #[test]
    fn resolution_is_deterministic() {
        let url = "https://www.youtube.com/watch?v=abc123";
        assert_eq!(resolve(url), resolve(url));
    }

    #[test]
    fn display_names_follow_identity_kind() {
        let yt = resolve("https://youtu.be/abc123").unwrap();
        assert_eq!(display_name(&yt, "https://youtu.be/abc123"), "YouTube: abc123");

        let iyf = resolve("https://www.iyf.tv/play/XYZ").unwrap();
        assert_eq!(display_name(&iyf, ""), "iyf.tv視頻: XYZ");

        let other = VideoIdentity::from_raw("video:misc");
        assert_eq!(
            display_name(&other, "https://example.com/some/page?x=1"),
            "example.com/some/page"
        );
        assert_eq!(display_name(&other, "garbage"), "garbage");
    }
}
