//! Parsed reading page.
//!
//! `HtmlPage` wraps a scraper document and exposes the few lookups the
//! reader needs: designated link attributes, elements by id and the title.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Identity of an element within one parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Position in document order, counting elements only.
    pub index: usize,
    pub tag: String,
    pub id: Option<String>,
}

/// Result of reading an attribute from the first element matching a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrLookup {
    Found(String),
    NoElement,
    NoAttribute,
}

/// A parsed HTML page.
pub struct HtmlPage {
    document: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self { document: Html::parse_document(html) }
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document.root_element().descendants().filter_map(ElementRef::wrap)
    }

    fn info(index: usize, element: ElementRef<'_>) -> ElementInfo {
        ElementInfo {
            index,
            tag: element.value().name().to_string(),
            id: element.value().id().map(str::to_string),
        }
    }

    /// Text of the `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        self.elements()
            .find(|e| e.value().name() == "title")
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Read `attribute` from the first element matching `selector`.
    pub fn attribute(&self, selector: &Selector, attribute: &str) -> AttrLookup {
        match self.document.select(selector).next() {
            None => AttrLookup::NoElement,
            Some(element) => match element.value().attr(attribute) {
                Some(value) => AttrLookup::Found(value.to_string()),
                None => AttrLookup::NoAttribute,
            },
        }
    }

    /// The element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<ElementInfo> {
        self.elements()
            .enumerate()
            .find(|(_, e)| e.value().id() == Some(id))
            .map(|(index, e)| Self::info(index, e))
    }

    /// The parent element of the element whose `id` equals `id`.
    pub fn parent_of_id(&self, id: &str) -> Option<ElementInfo> {
        let target = self.elements().find(|e| e.value().id() == Some(id))?;
        let parent = target.parent().and_then(ElementRef::wrap)?;
        self.elements()
            .enumerate()
            .find(|(_, e)| *e == parent)
            .map(|(index, e)| Self::info(index, e))
    }
}
