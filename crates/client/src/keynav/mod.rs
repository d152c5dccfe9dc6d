//! Keyboard navigation between reading pages.
//!
//! A key-release on the page is translated into a full-page navigation:
//!
//! | key          | link read                     |
//! |--------------|-------------------------------|
//! | `ArrowLeft`  | `a.go-previous`               |
//! | `ArrowRight` | `a.go-next`                   |
//! | `Escape`     | `span#reader-toc a`           |
//!
//! Targets are read from the document on every event so pages that rewrite
//! their links are honoured. The event's default action is suppressed after
//! every key-release, whether or not it navigated.

pub mod focus;
pub mod listeners;
pub mod page;

use quire_core::{Error, KeyNavSettings, MissingLinkPolicy};
use scraper::Selector;

pub use focus::{FocusSettings, ScrollAlign, ScrollOptions, Viewport, ViewportLog, focus_fragment, schedule_fragment_focus};
pub use listeners::{KeyUpListener, KeyUpListeners, Subscription};
pub use page::{AttrLookup, ElementInfo, HtmlPage};

/// Key identifier carried by a key-release event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Other(String),
}

impl Key {
    /// Parse a key identifier, accepting the legacy `Left`/`Right`/`Esc` names.
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "Escape" | "Esc" => Self::Escape,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A key-release event.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
    default_prevented: bool,
}

impl KeyEvent {
    pub fn key_up(key: Key) -> Self {
        Self { key, default_prevented: false }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// The designated links a key can lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavLink {
    Previous,
    Next,
    TableOfContents,
}

impl NavLink {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Next => "next",
            Self::TableOfContents => "table_of_contents",
        }
    }
}

/// Sets the browsing context's location.
pub trait Navigate {
    fn assign(&mut self, target: &str);
}

/// Records the last assigned location; the host performs the load.
#[derive(Debug, Default)]
pub struct PendingNavigation {
    target: Option<String>,
}

impl PendingNavigation {
    pub fn take(&mut self) -> Option<String> {
        self.target.take()
    }
}

impl Navigate for PendingNavigation {
    fn assign(&mut self, target: &str) {
        self.target = Some(target.to_string());
    }
}

#[derive(Debug, Clone)]
struct LinkSelector {
    source: String,
    selector: Selector,
}

impl LinkSelector {
    fn parse(source: &str) -> Result<Self, Error> {
        let selector = Selector::parse(source).map_err(|e| Error::InvalidSelector(format!("{source}: {e}")))?;
        Ok(Self { source: source.to_string(), selector })
    }
}

/// Translates key-release events into navigations.
#[derive(Debug, Clone)]
pub struct KeyNav {
    previous: LinkSelector,
    next: LinkSelector,
    toc: LinkSelector,
    attribute: String,
    policy: MissingLinkPolicy,
}

impl KeyNav {
    /// Compile the configured selectors.
    pub fn from_settings(settings: &KeyNavSettings) -> Result<Self, Error> {
        Ok(Self {
            previous: LinkSelector::parse(&settings.previous_selector)?,
            next: LinkSelector::parse(&settings.next_selector)?,
            toc: LinkSelector::parse(&settings.toc_selector)?,
            attribute: settings.link_attribute.clone(),
            policy: settings.missing_link,
        })
    }

    pub fn with_policy(mut self, policy: MissingLinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn link_for(key: &Key) -> Option<NavLink> {
        match key {
            Key::ArrowLeft => Some(NavLink::Previous),
            Key::ArrowRight => Some(NavLink::Next),
            Key::Escape => Some(NavLink::TableOfContents),
            Key::Other(_) => None,
        }
    }

    fn selector(&self, link: NavLink) -> &LinkSelector {
        match link {
            NavLink::Previous => &self.previous,
            NavLink::Next => &self.next,
            NavLink::TableOfContents => &self.toc,
        }
    }

    /// Read the target of a designated link.
    pub fn target(&self, link: NavLink, page: &HtmlPage) -> Result<String, Error> {
        let sel = self.selector(link);
        match page.attribute(&sel.selector, &self.attribute) {
            AttrLookup::Found(target) => Ok(target),
            AttrLookup::NoElement => Err(Error::MissingLink(format!("no element matches {}", sel.source))),
            AttrLookup::NoAttribute => {
                Err(Error::MissingLink(format!("{} has no {} attribute", sel.source, self.attribute)))
            }
        }
    }

    /// Resolve the navigation target for `key`, if the key navigates at all.
    pub fn resolve(&self, key: &Key, page: &HtmlPage) -> Result<Option<String>, Error> {
        match Self::link_for(key) {
            Some(link) => self.target(link, page).map(Some),
            None => Ok(None),
        }
    }

    /// Targets of all three designated links that are present on `page`.
    pub fn targets(&self, page: &HtmlPage) -> Vec<(NavLink, String)> {
        [NavLink::Previous, NavLink::Next, NavLink::TableOfContents]
            .into_iter()
            .filter_map(|link| self.target(link, page).ok().map(|t| (link, t)))
            .collect()
    }

    /// Handle one key-release: resolve, suppress the default, navigate.
    ///
    /// Returns the target navigated to, if any.
    pub fn handle_key_up(
        &self, event: &mut KeyEvent, page: &HtmlPage, location: &mut dyn Navigate,
    ) -> Result<Option<String>, Error> {
        let resolved = self.resolve(&event.key, page);
        event.prevent_default();

        let target = match resolved {
            Ok(target) => target,
            Err(e @ Error::MissingLink(_)) if self.policy == MissingLinkPolicy::Ignore => {
                tracing::warn!(key = ?event.key, "ignoring key press: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(target) = &target {
            tracing::debug!(key = ?event.key, %target, "navigating");
            location.assign(target);
        }

        Ok(target)
    }
}

impl KeyUpListener for KeyNav {
    fn on_key_up(&self, event: &mut KeyEvent, page: &HtmlPage, location: &mut dyn Navigate) -> Result<(), Error> {
        self.handle_key_up(event, page, location).map(|_| ())
    }
}
