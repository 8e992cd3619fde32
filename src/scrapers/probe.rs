//! Field probes: small named extractors that each try one way of reading a
//! field from an element. Sources compose them into fallback chains.

use crate::text::{collapse_whitespace, parse_date, truncate_chars};
use scraper::{ElementRef, Selector};
use tracing::{trace, warn};

/// One attempt at reading a field
pub type Probe = fn(&ElementRef<'_>) -> Option<String>;

#[derive(Clone, Copy)]
pub struct NamedProbe {
    pub name: &'static str,
    pub run: Probe,
}

impl NamedProbe {
    pub const fn new(name: &'static str, run: Probe) -> Self {
        Self { name, run }
    }
}

/// Characters kept when a title has to be cut from an element's whole text
pub const LEADING_TEXT_CHARS: usize = 80;

/// Run probes in order and return the first value found
pub fn first_match(element: &ElementRef<'_>, field: &str, probes: &[NamedProbe]) -> Option<String> {
    probes.iter().find_map(|probe| {
        let value = (probe.run)(element)?;
        trace!(field, probe = probe.name, value = %value, "Probe matched");
        Some(value)
    })
}

pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            warn!(css, error = %err, "Invalid selector");
            None
        }
    }
}

/// Collapsed text of an element, with a space between its text nodes so
/// adjacent cells never run together
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Collapsed text of the first descendant matching `css`, if non-empty
pub fn text_of(element: &ElementRef<'_>, css: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    element
        .select(&selector)
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
}

/// Attribute of the first descendant matching `css`
pub fn attr_of(element: &ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = parse_selector(css)?;
    element
        .select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The element's own text when it is itself a link
pub fn own_link_text(element: &ElementRef<'_>) -> Option<String> {
    (element.value().name() == "a")
        .then(|| element_text(element))
        .filter(|text| !text.is_empty())
}

/// The element's own `href` when it is itself a link
pub fn own_href(element: &ElementRef<'_>) -> Option<String> {
    (element.value().name() == "a")
        .then(|| element.value().attr("href"))
        .flatten()
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

/// Text of a heading-like descendant
pub fn heading_text(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "h1, h2, h3, h4, h5, h6, strong, .tit, .title, .subject")
}

/// First characters of the element's whole text
pub fn leading_text(element: &ElementRef<'_>) -> Option<String> {
    let text = element_text(element);
    (!text.is_empty()).then(|| truncate_chars(&text, LEADING_TEXT_CHARS))
}

/// Href of the first link inside the element
pub fn first_link_href(element: &ElementRef<'_>) -> Option<String> {
    attr_of(element, "a[href]", "href")
}

/// Text of the first link inside the element
pub fn first_link_text(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "a")
}

/// Text of an element marked as a date, when it parses as one
pub fn date_marked_text(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "td.date, .date, .reg_date, .regdate, time").filter(|text| parse_date(text).is_some())
}

/// First table cell whose text parses as a date
pub fn date_cell(element: &ElementRef<'_>) -> Option<String> {
    let selector = parse_selector("td")?;
    element
        .select(&selector)
        .map(|cell| element_text(&cell))
        .find(|text| parse_date(text).is_some())
}

/// The whole element text, when it contains a date anywhere
pub fn date_in_text(element: &ElementRef<'_>) -> Option<String> {
    let text = element_text(element);
    parse_date(&text).map(|_| text)
}

/// Text of the board's title cell link
pub fn title_cell_link(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "td.title a, td.subject a, td.tit a")
}

/// Text of the board's title cell
pub fn title_cell(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "td.title, td.subject, td.tit")
}

/// Href of the board's title cell link
pub fn title_cell_href(element: &ElementRef<'_>) -> Option<String> {
    attr_of(element, "td.title a[href], td.subject a[href], td.tit a[href]", "href")
}

/// Title probes for board rows, most specific first
pub const BOARD_TITLE: &[NamedProbe] = &[
    NamedProbe::new("title-cell-link", title_cell_link),
    NamedProbe::new("title-cell", title_cell),
    NamedProbe::new("first-link", first_link_text),
    NamedProbe::new("own-link", own_link_text),
    NamedProbe::new("heading", heading_text),
    NamedProbe::new("leading-text", leading_text),
];

/// Item link probes for board rows
pub const BOARD_HREF: &[NamedProbe] = &[
    NamedProbe::new("title-cell-href", title_cell_href),
    NamedProbe::new("first-link-href", first_link_href),
    NamedProbe::new("own-href", own_href),
];

/// Registration date probes for board rows
pub const BOARD_DATE: &[NamedProbe] = &[
    NamedProbe::new("date-cell", date_marked_text),
    NamedProbe::new("any-date-cell", date_cell),
    NamedProbe::new("date-in-text", date_in_text),
];
