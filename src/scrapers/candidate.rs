use crate::identity::generate_id;
use crate::models::{HouseDetails, Posting, PostingKind, Source};
use crate::text::{extract_keywords, extract_phone_numbers, normalize_title, parse_date};
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Shortest title, in characters, worth keeping
pub const MIN_TITLE_CHARS: usize = 4;

/// Query parameters that carry a board item's own number
const ITEM_ID_PARAMS: &[&str] = &[
    "not_ancmt_mgt_no",
    "nttId",
    "nttSn",
    "wantedAuthNo",
    "idx",
    "seq",
    "bIdx",
    "articleNo",
    "houseId",
    "no",
];

/// Titles that are navigation chrome when they make up the whole text
const DENY_EXACT: &[&str] = &[
    "메뉴", "홈", "검색", "더보기", "이전", "다음", "목록", "처음", "마지막", "닫기", "로그아웃",
    "menu", "home", "search", "more", "prev", "next",
];

/// Fragments that mark navigation chrome anywhere in a title
const DENY_CONTAINS: &[&str] = &[
    "로그인",
    "회원가입",
    "이용약관",
    "개인정보처리방침",
    "개인정보 처리방침",
    "사이트맵",
    "바로가기",
    "전체메뉴",
    "저작권",
    "login",
    "sign up",
    "terms of use",
    "privacy policy",
    "sitemap",
];

/// Raw fields read from one selected element, before normalization
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub title: String,
    /// Explicit identifying value; derived from the link or title when absent
    pub natural_key: Option<String>,
    pub date_text: Option<String>,
    pub href: Option<String>,
    /// Text scanned for phone numbers and keywords
    pub body: String,
    /// Present for house sources
    pub house: Option<HouseDetails>,
}

/// Why a candidate never became a posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyTitle,
    TooShort(String),
    DenyListed(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyTitle => write!(f, "empty title"),
            Rejection::TooShort(title) => write!(f, "title too short: {title:?}"),
            Rejection::DenyListed(title) => write!(f, "navigation text: {title:?}"),
        }
    }
}

impl Candidate {
    /// Normalize, filter and assign an id
    pub fn into_posting(self, source: Source, crawled_at: DateTime<Utc>) -> Result<Posting, Rejection> {
        let title = normalize_title(&self.title);
        if title.is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(Rejection::TooShort(title));
        }
        if is_deny_listed(&title) {
            return Err(Rejection::DenyListed(title));
        }

        let item_link = self.href.as_deref().and_then(|href| resolve_link(source, href));
        let natural_key = self
            .natural_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| item_link.as_ref().map(natural_key_from_link))
            .unwrap_or_else(|| title.clone());
        let link = item_link
            .map(|url| url.to_string())
            .unwrap_or_else(|| source.landing_url().to_string());

        let scanned = format!("{} {}", title, self.body);
        let mut phones = extract_phone_numbers(&scanned);
        if phones.is_empty() {
            phones.push(source.default_phone().to_string());
        }

        let kind = match self.house {
            Some(details) => PostingKind::House(details),
            None => PostingKind::Job,
        };

        Ok(Posting {
            id: generate_id(source, &natural_key),
            source,
            source_name: source.display_name().to_string(),
            date: self.date_text.as_deref().and_then(parse_date),
            link,
            phones,
            keywords: extract_keywords(&scanned),
            kind,
            crawled_at,
            title,
        })
    }
}

/// Whether a title is UI boilerplate rather than a listing
pub fn is_deny_listed(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    DENY_EXACT.contains(&lower.as_str()) || DENY_CONTAINS.iter().any(|term| lower.contains(term))
}

/// Absolute URL for an item link; `None` for script and fragment links
pub fn resolve_link(source: Source, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
        return None;
    }

    // Root-relative paths hang off the site origin; page-relative ones off the landing page
    let base = if href.starts_with('/') {
        source.base_origin()
    } else {
        source.landing_url()
    };
    let base = Url::parse(base).ok()?;
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Identifying part of an item URL: its item-number parameter, else path and query
pub fn natural_key_from_link(url: &Url) -> String {
    for param in ITEM_ID_PARAMS {
        if let Some((name, value)) = url.query_pairs().find(|(name, _)| name == param) {
            if !value.is_empty() {
                return format!("{name}={value}");
            }
        }
    }

    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
