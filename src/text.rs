//! Text normalization helpers: phone numbers, keyword tags, dates and titles.
//!
//! Everything here is pure. Inputs that cannot be understood produce `None`
//! or an empty list instead of an error.

use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Upper bound on a normalized title, in characters
pub const MAX_TITLE_CHARS: usize = 200;

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // 055-123-4567, 010-1234-5678
        r"\d{2,3}-\d{3,4}-\d{4}",
        // 055.123.4567
        r"\d{2,3}\.\d{3,4}\.\d{4}",
        // (055) 123-4567
        r"\(\d{2,3}\)\s?\d{3,4}-\d{4}",
        // 01012345678
        r"\d{10,11}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hardcoded regex pattern is valid"))
    .collect()
});

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").expect("hardcoded regex pattern is valid")
});

static SHORT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{2})[-./](\d{1,2})[-./](\d{1,2})").expect("hardcoded regex pattern is valid")
});

static KOREAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일").expect("hardcoded regex pattern is valid")
});

static LABELED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"등록일\s*[:：]\s*(\S+)").expect("hardcoded regex pattern is valid")
});

const JOB_TERMS: &[&str] = &[
    "구인", "채용", "모집", "일자리", "취업", "알바", "파트타임", "정규직", "계약직",
];

const FIELD_TERMS: &[&str] = &[
    "사무직", "밭일", "농사", "어업", "수산", "관광", "숙박", "요식업", "건설",
];

const HOUSE_TERMS: &[&str] = &[
    "빈집", "매매", "임대", "월세", "전세", "촌집", "귀농", "귀촌", "농가주택",
];

/// Extract Korean phone numbers from free text.
///
/// Matches are returned in the order they appear, normalized to hyphenated
/// form, without duplicates. Digit runs that do not look like a phone number
/// are dropped.
pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    let mut matches: Vec<(usize, &str)> = PHONE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    matches.sort_by_key(|(start, _)| *start);

    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter_map(|(_, raw)| normalize_phone(raw))
        .filter(|phone| seen.insert(phone.clone()))
        .collect()
}

/// Re-segment a raw phone match by digit count and prefix
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 if digits.starts_with("01") => Some(format!(
            "{}-{}-{}",
            &digits[..3],
            &digits[3..7],
            &digits[7..]
        )),
        10 if digits.starts_with("02") => Some(format!(
            "{}-{}-{}",
            &digits[..2],
            &digits[2..6],
            &digits[6..]
        )),
        10 => Some(format!(
            "{}-{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..]
        )),
        9 if digits.starts_with("02") => Some(format!(
            "{}-{}-{}",
            &digits[..2],
            &digits[2..5],
            &digits[5..]
        )),
        _ => None,
    }
}

/// Tag text with the job, field and housing terms it mentions
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();

    for term in JOB_TERMS.iter().chain(FIELD_TERMS).chain(HOUSE_TERMS) {
        if lower.contains(term) && !matched.iter().any(|m| m == term) {
            matched.push(term.to_string());
        }
    }

    matched
}

/// True when the text carries a job-intent term
pub fn mentions_job(text: &str) -> bool {
    JOB_TERMS.iter().any(|term| text.contains(term))
}

/// True when the text carries a housing-intent term
pub fn mentions_house(text: &str) -> bool {
    HOUSE_TERMS.iter().any(|term| text.contains(term))
}

/// Parse a date string into `YYYY-MM-DD`.
///
/// Two-digit years pivot at 50: `51` is 1951, `50` is 2050.
pub fn parse_date(text: &str) -> Option<String> {
    let cleaned = text.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = FULL_DATE.captures(cleaned) {
        return canonical_date(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = KOREAN_DATE.captures(cleaned) {
        return canonical_date(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = SHORT_DATE.captures(cleaned) {
        let short: u32 = caps[1].parse().ok()?;
        let century = if short > 50 { 1900 } else { 2000 };
        return canonical_date(&(century + short).to_string(), &caps[2], &caps[3]);
    }

    if let Some(caps) = LABELED_DATE.captures(cleaned) {
        let inner = caps[1].to_string();
        if inner != cleaned {
            return parse_date(&inner);
        }
    }

    None
}

fn canonical_date(year: &str, month: &str, day: &str) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Collapse whitespace runs (newlines and tabs included) to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalize a title and cap its length
pub fn normalize_title(text: &str) -> String {
    truncate_chars(&collapse_whitespace(text), MAX_TITLE_CHARS)
}

/// Keep at most `max` characters, never splitting a character
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
