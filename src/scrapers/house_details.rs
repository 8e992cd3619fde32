//! Labelled detail parsing for vacant-house listings.
//!
//! Listings describe a house as loose "label: value" text, e.g.
//! `주소: 남해군 상주면 상주리 12 대지면적: 330㎡ 구조: 목조`. Each label
//! occurrence owns the text up to the next recognised label.

use crate::models::HouseDetails;
use crate::text::{collapse_whitespace, truncate_chars};
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Address,
    LandArea,
    BuildArea,
    Structure,
    BuildYear,
    Price,
    Location,
    Area,
}

const LABELS: &[(&str, Field)] = &[
    ("주소", Field::Address),
    ("소재지", Field::Address),
    ("대지면적", Field::LandArea),
    ("토지면적", Field::LandArea),
    ("대지", Field::LandArea),
    ("건축면적", Field::BuildArea),
    ("건물면적", Field::BuildArea),
    ("연면적", Field::BuildArea),
    ("구조", Field::Structure),
    ("건축년도", Field::BuildYear),
    ("준공년도", Field::BuildYear),
    ("준공", Field::BuildYear),
    ("매매가", Field::Price),
    ("희망가격", Field::Price),
    ("가격", Field::Price),
    ("임대료", Field::Price),
    ("보증금", Field::Price),
    ("위치", Field::Location),
    ("면적", Field::Area),
];

/// Namhae's town (읍) and townships (면)
pub const NAMHAE_DISTRICTS: &[&str] = &[
    "남해읍", "이동면", "상주면", "삼동면", "미조면", "남면", "서면", "고현면", "설천면", "창선면",
];

const MAX_VALUE_CHARS: usize = 60;

static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,.]*\s*(?:억|만)\s*(?:\d[\d,.]*\s*만\s*)?원?").expect("hardcoded regex pattern is valid")
});

static AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,.]*\s*(?:㎡|m²|m2|평)").expect("hardcoded regex pattern is valid")
});

/// Read house details out of free listing text
pub fn parse_house_details(text: &str) -> HouseDetails {
    let text = collapse_whitespace(text);
    let mut details = HouseDetails::default();

    for (field, value) in labelled_values(&text) {
        let slot = match field {
            Field::Address => &mut details.address,
            Field::LandArea => &mut details.land_area,
            Field::BuildArea => &mut details.build_area,
            Field::Structure => &mut details.structure,
            Field::BuildYear => &mut details.build_year,
            Field::Price => &mut details.price,
            Field::Location => &mut details.location,
            Field::Area => &mut details.area,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    details.district = find_district(&text);

    if details.price.is_none() {
        details.price = first_match(&PRICE, &text);
    }
    if details.area.is_none() && details.land_area.is_none() && details.build_area.is_none() {
        details.area = first_match(&AREA, &text);
    }
    if details.location.is_none() {
        details.location = details
            .district
            .as_ref()
            .map(|district| format!("경상남도 남해군 {district}"));
    }

    details
}

/// First Namhae district named in the text
pub fn find_district(text: &str) -> Option<String> {
    NAMHAE_DISTRICTS
        .iter()
        .filter_map(|district| text.find(district).map(|pos| (pos, *district)))
        .filter(|(pos, district)| is_word_start(text, *pos) || district.chars().count() > 2)
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, district)| district.to_string())
}

/// Two-syllable names ("남면", "서면") only count at a word start, so that
/// "전남면" or "동서면" do not match.
fn is_word_start(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .map_or(true, |c| c.is_whitespace() || c.is_ascii_punctuation())
}

fn first_match(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().trim().to_string())
}

/// Every label occurrence with the value that follows it, in text order
fn labelled_values(text: &str) -> Vec<(Field, String)> {
    let mut hits: Vec<(usize, usize, Field)> = Vec::new();
    for (label, field) in LABELS {
        for (start, matched) in text.match_indices(label) {
            hits.push((start, start + matched.len(), *field));
        }
    }

    // Longest label wins where labels overlap ("대지면적" over "대지" and "면적").
    hits.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));
    let mut kept: Vec<(usize, usize, Field)> = Vec::new();
    for hit in hits {
        if kept.last().map_or(true, |last| hit.0 >= last.1) {
            kept.push(hit);
        }
    }

    kept.iter()
        .enumerate()
        .filter_map(|(i, (_, end, field))| {
            let stop = kept.get(i + 1).map_or(text.len(), |next| next.0);
            let value = clean_value(&text[*end..stop]);
            (!value.is_empty()).then(|| (*field, value))
        })
        .collect()
}

fn clean_value(raw: &str) -> String {
    let field = raw.split('|').next().unwrap_or_default();
    let trimmed = field
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '：' | '-' | ')' | ']'))
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '|' | '/' | '·' | ',' | '(' | '['));
    truncate_chars(trimmed, MAX_VALUE_CHARS)
}
