//! Vacant-house sources: the county return-to-farm center board and the
//! Greendaero rural housing portal.

use crate::error::ExtractError;
use crate::models::{Posting, Source};
use crate::scrapers::candidate::Candidate;
use crate::scrapers::house_details::parse_house_details;
use crate::scrapers::probe::{
    element_text, first_link_href, first_link_text, first_match, heading_text, leading_text,
    own_href, own_link_text, NamedProbe, BOARD_DATE, BOARD_HREF, BOARD_TITLE,
};
use crate::scrapers::strategy::{collect_postings, Shape, StrategyChain};
use crate::scrapers::traits::SourceExtractor;
use crate::scrapers::types::FailurePolicy;
use crate::text::mentions_house;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};

/// Most postings taken from one house source per cycle
pub const MAX_HOUSES_PER_SOURCE: usize = 20;

const REGION: &str = "남해";

const FREE_TEXT_SCAN: &str = "a, li, tr";

fn house_candidate(element: &ElementRef<'_>, title: &[NamedProbe], href: &[NamedProbe]) -> Option<Candidate> {
    let body = element_text(element);
    Some(Candidate {
        title: first_match(element, "title", title)?,
        natural_key: None,
        date_text: first_match(element, "date", BOARD_DATE),
        href: first_match(element, "href", href),
        house: Some(parse_house_details(&body)),
        body,
    })
}

/// 남해군 귀농귀촌지원센터: the county's own vacant-house board
pub struct RefarmExtractor {
    chain: StrategyChain,
}

impl RefarmExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .primary("table tbody tr", Shape::TableRow)
                .secondary(
                    "ul.gallery_list > li, ul.photo_list > li, div.gallery_list li, ul.house_list > li",
                    Shape::Item,
                )
                .free_text(FREE_TEXT_SCAN, mentions_house),
        }
    }
}

impl Default for RefarmExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExtractor for RefarmExtractor {
    fn source(&self) -> Source {
        Source::Refarm
    }

    fn extract(&self, document: &Html, crawled_at: DateTime<Utc>) -> Result<Vec<Posting>, ExtractError> {
        collect_postings(
            self.source(),
            &self.chain,
            document,
            crawled_at,
            MAX_HOUSES_PER_SOURCE,
            |element, _tier| house_candidate(element, BOARD_TITLE, BOARD_HREF),
        )
    }
}

/// Greendaero lists houses nationwide; only items mentioning Namhae are kept
pub struct GreendaeroExtractor {
    chain: StrategyChain,
}

const CARD_TITLE: &[NamedProbe] = &[
    NamedProbe::new("heading", heading_text),
    NamedProbe::new("own-link", own_link_text),
    NamedProbe::new("first-link", first_link_text),
    NamedProbe::new("leading-text", leading_text),
];

const CARD_HREF: &[NamedProbe] = &[
    NamedProbe::new("own-href", own_href),
    NamedProbe::new("first-link-href", first_link_href),
];

fn namhae_house_text(text: &str) -> bool {
    text.contains(REGION) && mentions_house(text)
}

impl GreendaeroExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .primary("ul.house_list > li, div.house_list .item, ul.list_house > li", Shape::Item)
                .secondary("div.card, div.item_box, li.item", Shape::Item)
                .free_text(FREE_TEXT_SCAN, namhae_house_text),
        }
    }
}

impl Default for GreendaeroExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExtractor for GreendaeroExtractor {
    fn source(&self) -> Source {
        Source::Greendaero
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Tolerant
    }

    fn extract(&self, document: &Html, crawled_at: DateTime<Utc>) -> Result<Vec<Posting>, ExtractError> {
        collect_postings(
            self.source(),
            &self.chain,
            document,
            crawled_at,
            MAX_HOUSES_PER_SOURCE,
            |element, _tier| {
                if !element_text(element).contains(REGION) {
                    return None;
                }
                house_candidate(element, CARD_TITLE, CARD_HREF)
            },
        )
    }
}
