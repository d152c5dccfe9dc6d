//! Fragment focus on page load.
//!
//! When a page is opened with `#id` in its URL, the element with that id is
//! brought to the reader's attention once, after a short delay: its parent
//! block gets the highlight class and the element is scrolled to the end of
//! the viewport.

use super::page::{ElementInfo, HtmlPage};
use percent_encoding::percent_decode_str;
use quire_core::KeyNavSettings;
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct FocusSettings {
    pub delay: Duration,
    pub highlight_class: String,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self::from_settings(&KeyNavSettings::default())
    }
}

impl FocusSettings {
    pub fn from_settings(settings: &KeyNavSettings) -> Self {
        Self { delay: settings.focus_delay(), highlight_class: settings.highlight_class.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    Start,
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollOptions {
    pub block: ScrollAlign,
    pub inline: ScrollAlign,
}

impl ScrollOptions {
    pub const END_NEAREST: Self = Self { block: ScrollAlign::End, inline: ScrollAlign::Nearest };
}

/// Visual side effects on the rendered page.
pub trait Viewport {
    fn add_class(&mut self, element: &ElementInfo, class: &str);
    fn scroll_into_view(&mut self, element: &ElementInfo, options: ScrollOptions);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub element: ElementInfo,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scroll {
    pub element: ElementInfo,
    pub options: ScrollOptions,
}

/// A viewport that records what was asked of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewportLog {
    pub highlights: Vec<Highlight>,
    pub scrolls: Vec<Scroll>,
}

impl ViewportLog {
    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty() && self.scrolls.is_empty()
    }
}

impl Viewport for ViewportLog {
    fn add_class(&mut self, element: &ElementInfo, class: &str) {
        self.highlights.push(Highlight { element: element.clone(), class: class.to_string() });
    }

    fn scroll_into_view(&mut self, element: &ElementInfo, options: ScrollOptions) {
        self.scrolls.push(Scroll { element: element.clone(), options });
    }
}

/// Non-empty fragment of `url`, percent-decoded so it compares against raw
/// `id` attribute values.
pub fn fragment_of(url: &Url) -> Option<String> {
    url.fragment()
        .filter(|f| !f.is_empty())
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
}

/// Highlight the parent of the element with id `fragment` and scroll the
/// element into view. Returns the element, or `None` if no element has that id.
pub fn focus_fragment(
    page: &HtmlPage, fragment: &str, settings: &FocusSettings, viewport: &mut dyn Viewport,
) -> Option<ElementInfo> {
    let target = page.element_by_id(fragment)?;
    if let Some(parent) = page.parent_of_id(fragment) {
        viewport.add_class(&parent, &settings.highlight_class);
    }
    viewport.scroll_into_view(&target, ScrollOptions::END_NEAREST);
    Some(target)
}

/// Schedule the one-shot fragment focus for a freshly loaded page.
///
/// Returns `None` when the URL has no fragment; nothing is scheduled then.
pub fn schedule_fragment_focus(url: &Url, html: &str, settings: &FocusSettings) -> Option<JoinHandle<ViewportLog>> {
    let fragment = fragment_of(url)?;
    let html = html.to_string();
    let settings = settings.clone();

    Some(tokio::spawn(async move {
        tokio::time::sleep(settings.delay).await;

        let mut log = ViewportLog::default();
        let page = HtmlPage::parse(&html);
        if focus_fragment(&page, &fragment, &settings, &mut log).is_none() {
            tracing::debug!(%fragment, "no element for fragment");
        }
        log
    }))
}
