//! Ordered selector strategies and the shared listing loop.
//!
//! A source declares its strategies from most to least specific. The first
//! strategy that selects anything decides the elements for the whole page;
//! later tiers are never mixed in.

use crate::error::ExtractError;
use crate::models::{Posting, Source};
use crate::scrapers::candidate::Candidate;
use crate::scrapers::probe::{element_text, parse_selector};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Fallback level a strategy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Secondary,
    FreeText,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Primary => "primary",
            Tier::Secondary => "secondary",
            Tier::FreeText => "free-text",
        };
        f.write_str(name)
    }
}

/// What a selected element represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Board table row: first cell must be a sequence number
    TableRow,
    /// Self-contained list item or card
    Item,
}

/// Predicate over an element's collapsed text
pub type TextMatcher = fn(&str) -> bool;

/// Longest element text the free-text tier will consider, to skip page-wide containers
const FREE_TEXT_MAX_CHARS: usize = 400;

#[derive(Debug, Clone)]
pub enum Strategy {
    Structural {
        tier: Tier,
        css: &'static str,
        shape: Shape,
    },
    FreeText {
        scan: &'static str,
        matcher: TextMatcher,
    },
}

impl Strategy {
    pub fn tier(&self) -> Tier {
        match self {
            Strategy::Structural { tier, .. } => *tier,
            Strategy::FreeText { .. } => Tier::FreeText,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Strategy::Structural { shape, .. } => *shape,
            Strategy::FreeText { .. } => Shape::Item,
        }
    }

    /// Elements this strategy selects, in document order
    pub fn apply<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Strategy::Structural { css, .. } => match parse_selector(css) {
                Some(selector) => document.select(&selector).collect(),
                None => Vec::new(),
            },
            Strategy::FreeText { scan, matcher } => {
                let Some(selector) = parse_selector(scan) else {
                    return Vec::new();
                };
                let matching: Vec<ElementRef<'a>> = document
                    .select(&selector)
                    .filter(|el| {
                        let text = element_text(&el);
                        !text.is_empty()
                            && text.chars().count() <= FREE_TEXT_MAX_CHARS
                            && matcher(&text)
                    })
                    .collect();
                innermost(matching)
            }
        }
    }
}

/// Drop matches that contain another match, keeping the most specific element
fn innermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: Vec<_> = elements.iter().map(|el| el.id()).collect();
    elements
        .iter()
        .filter(|el| {
            !el.descendants()
                .skip(1)
                .any(|node| ids.contains(&node.id()))
        })
        .copied()
        .collect()
}

/// Elements picked by the first strategy that matched
pub struct Selection<'a> {
    pub tier: Tier,
    pub shape: Shape,
    pub elements: Vec<ElementRef<'a>>,
}

/// Ordered strategy list for one source
#[derive(Debug, Clone)]
pub struct StrategyChain {
    strategies: Vec<Strategy>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn primary(mut self, css: &'static str, shape: Shape) -> Self {
        self.strategies.push(Strategy::Structural {
            tier: Tier::Primary,
            css,
            shape,
        });
        self
    }

    pub fn secondary(mut self, css: &'static str, shape: Shape) -> Self {
        self.strategies.push(Strategy::Structural {
            tier: Tier::Secondary,
            css,
            shape,
        });
        self
    }

    pub fn free_text(mut self, scan: &'static str, matcher: TextMatcher) -> Self {
        self.strategies.push(Strategy::FreeText { scan, matcher });
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Try each strategy in order; the first non-empty result wins
    pub fn select<'a>(&self, document: &'a Html) -> Option<Selection<'a>> {
        self.strategies.iter().find_map(|strategy| {
            let elements = strategy.apply(document);
            (!elements.is_empty()).then(|| Selection {
                tier: strategy.tier(),
                shape: strategy.shape(),
                elements,
            })
        })
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new()
    }
}

const HEADER_LABELS: &[&str] = &["번호", "순번", "no", "no.", "num"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVerdict {
    Keep,
    Header,
    NotARecord,
}

/// Structural sanity check for board table rows.
///
/// The first header row of a page is recognised once by its label; every
/// other row must start with a numeric sequence number. Notice rows
/// ("공지") and decorative rows fail that check.
#[derive(Debug, Default)]
pub struct RowGate {
    header_seen: bool,
}

impl RowGate {
    pub fn check(&mut self, row: &ElementRef<'_>) -> RowVerdict {
        let first_cell = parse_selector("td, th")
            .and_then(|selector| row.select(&selector).next())
            .map(|cell| element_text(&cell))
            .unwrap_or_default();

        if !self.header_seen && HEADER_LABELS.contains(&first_cell.to_lowercase().as_str()) {
            self.header_seen = true;
            return RowVerdict::Header;
        }

        if !first_cell.is_empty() && first_cell.chars().all(|c| c.is_ascii_digit()) {
            RowVerdict::Keep
        } else {
            RowVerdict::NotARecord
        }
    }
}

/// Run a strategy chain over `document` and turn the selected elements into
/// postings, at most `limit` of them, without duplicate ids.
pub fn collect_postings<'a, F>(
    source: Source,
    chain: &StrategyChain,
    document: &'a Html,
    crawled_at: DateTime<Utc>,
    limit: usize,
    parse: F,
) -> Result<Vec<Posting>, ExtractError>
where
    F: Fn(&ElementRef<'a>, Tier) -> Option<Candidate>,
{
    let selection = chain.select(document).ok_or(ExtractError::NoMatch {
        source_name: source.tag(),
    })?;

    if selection.tier != Tier::Primary {
        warn!(
            source = source.tag(),
            tier = %selection.tier,
            elements = selection.elements.len(),
            "Primary selector found nothing, using fallback tier"
        );
    }

    let mut gate = RowGate::default();
    let mut seen = HashSet::new();
    let mut postings = Vec::new();

    for element in &selection.elements {
        if postings.len() >= limit {
            debug!(source = source.tag(), limit, "Reached per-source cap");
            break;
        }

        if selection.shape == Shape::TableRow {
            match gate.check(element) {
                RowVerdict::Keep => {}
                RowVerdict::Header => {
                    debug!(source = source.tag(), "Skipping header row");
                    continue;
                }
                RowVerdict::NotARecord => continue,
            }
        }

        let Some(candidate) = parse(element, selection.tier) else {
            continue;
        };

        match candidate.into_posting(source, crawled_at) {
            Ok(posting) => {
                if seen.insert(posting.id.clone()) {
                    postings.push(posting);
                }
            }
            Err(rejection) => debug!(source = source.tag(), %rejection, "Dropped candidate"),
        }
    }

    Ok(postings)
}
