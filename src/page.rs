//! Page document boundary and title cleanup.
//!
//! The host document model is a collaborator: the controller only needs the
//! current address, title candidates, and media-element handles. DOM
//! mutation and visibility events arrive separately as
//! [`PageEvent`](crate::controller::PageEvent)s.

use crate::audio::MediaElementId;
use crate::memory::UNKNOWN_TITLE;
use std::sync::Mutex;
use url::Url;

/// Read-only view of the page document.
pub trait PageProbe: Send + Sync {
    /// Current address of the page, reflecting in-page navigation.
    fn current_url(&self) -> String;

    /// Raw document title, if any.
    fn document_title(&self) -> Option<String>;

    /// Heading/title candidates in selector priority order.
    fn title_candidates(&self) -> Vec<String>;

    /// Media elements currently present in the document.
    fn media_elements(&self) -> Vec<MediaElementId>;

    /// Dedicated player element for sites that render it late.
    /// May stay `None` forever on pages without one.
    fn player_element(&self) -> Option<MediaElementId>;
}

/// Maximum length of a generically extracted title.
const GENERIC_TITLE_MAX: usize = 100;

/// Extract a clean display title for the current video.
///
/// Host-specific rules: YouTube prefers the watch-page heading and strips
/// the " - YouTube" suffix from the document title; iyf.tv and generic pages
/// require a minimum candidate length to skip navigation chrome. Falls back
/// to the placeholder when nothing usable exists.
#[must_use]
pub fn clean_video_title(probe: &dyn PageProbe) -> String {
    let url = probe.current_url();
    let host = Url::parse(&url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default();
    let doc_title = probe.document_title().unwrap_or_default();
    let candidates = probe.title_candidates();

    if host.contains("youtube.com") || host.contains("youtu.be") {
        for candidate in &candidates {
            let title = candidate.trim();
            if !title.is_empty() {
                return title.to_owned();
            }
        }
        let stripped = doc_title
            .strip_suffix(" - YouTube")
            .unwrap_or(&doc_title)
            .trim();
        if !stripped.is_empty() {
            return stripped.to_owned();
        }
    }

    if host.contains("iyf.tv") {
        for candidate in &candidates {
            let title = candidate.trim();
            if title.chars().count() > 5 {
                return title.to_owned();
            }
        }
    }

    for candidate in &candidates {
        let title = candidate.trim();
        if title.chars().count() > 10 {
            return title.chars().take(GENERIC_TITLE_MAX).collect();
        }
    }

    let fallback = doc_title.trim();
    if fallback.is_empty() {
        UNKNOWN_TITLE.to_owned()
    } else {
        fallback.to_owned()
    }
}

/// Scriptable [`PageProbe`] for tests and headless use.
///
/// Interior-mutable so a shared handle can simulate navigation and
/// late-appearing elements while a controller is driving it.
#[derive(Debug, Default)]
pub struct FixedPage {
    url: Mutex<String>,
    title: Mutex<Option<String>>,
    candidates: Mutex<Vec<String>>,
    elements: Mutex<Vec<MediaElementId>>,
    player: Mutex<Option<MediaElementId>>,
}

impl FixedPage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(url.into()),
            ..Self::default()
        }
    }

    pub fn navigate(&self, url: impl Into<String>) {
        *self.url.lock().unwrap_or_else(|e| e.into_inner()) = url.into();
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock().unwrap_or_else(|e| e.into_inner()) = Some(title.into());
    }

    pub fn set_candidates(&self, candidates: Vec<String>) {
        *self.candidates.lock().unwrap_or_else(|e| e.into_inner()) = candidates;
    }

    pub fn add_element(&self, element: MediaElementId) {
        self.elements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(element);
    }

    pub fn set_player(&self, element: MediaElementId) {
        *self.player.lock().unwrap_or_else(|e| e.into_inner()) = Some(element);
    }
}

impl PageProbe for FixedPage {
    fn current_url(&self) -> String {
        self.url.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn document_title(&self) -> Option<String> {
        self.title.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn title_candidates(&self) -> Vec<String> {
        self.candidates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn media_elements(&self) -> Vec<MediaElementId> {
        self.elements.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn player_element(&self) -> Option<MediaElementId> {
        *self.player.lock().unwrap_or_else(|e| e.into_inner())
    }
}
