use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posting category. Each category is its own store collection and push topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Job,
    House,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Job, Category::House];

    /// Store collection holding this category's documents
    pub fn collection(&self) -> &'static str {
        match self {
            Category::Job => "jobs",
            Category::House => "houses",
        }
    }

    /// Push topic subscribers of this category listen on
    pub fn topic(&self) -> &'static str {
        self.collection()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Job => "일자리",
            Category::House => "빈집",
        }
    }
}

/// Site a posting was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Namhae county notice board (새올 고시공고)
    Saeol,
    /// Namhae county job board (구인구직 게시판)
    Board,
    /// Gyeongnam regional job network, Namhae branch
    Worknet,
    /// Namhae return-to-farm support center housing board
    Refarm,
    /// Greendaero rural housing portal
    Greendaero,
}

const COUNTY_OFFICE_PHONE: &str = "055-860-3114";

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Saeol,
        Source::Board,
        Source::Worknet,
        Source::Refarm,
        Source::Greendaero,
    ];

    /// Short tag used in ids
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Saeol => "saeol",
            Source::Board => "board",
            Source::Worknet => "worknet",
            Source::Refarm => "refarm",
            Source::Greendaero => "greendaero",
        }
    }

    /// Human-readable label, display only
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Saeol => "남해군청 새올 고시공고",
            Source::Board => "남해군청 구인구직",
            Source::Worknet => "경남 일자리 (남해)",
            Source::Refarm => "남해군 귀농귀촌지원센터",
            Source::Greendaero => "그린대로",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Source::Saeol | Source::Board | Source::Worknet => Category::Job,
            Source::Refarm | Source::Greendaero => Category::House,
        }
    }

    /// Page the crawler navigates to
    pub fn landing_url(&self) -> &'static str {
        match self {
            Source::Saeol => {
                "https://www.namhae.go.kr/modules/saeol/gosi.do?pageCd=SM010110000&siteGubun=socialm"
            }
            Source::Board => {
                "https://www.namhae.go.kr/portal/board/List.do?gcode=1617&pageCd=WW0201022000&siteGubun=portal"
            }
            Source::Worknet => "https://gyeongnam.work.go.kr/namhae/main.do",
            Source::Refarm => "http://refarm.namhae.go.kr",
            Source::Greendaero => "https://greendaero.go.kr",
        }
    }

    /// Origin that relative item links are resolved against
    pub fn base_origin(&self) -> &'static str {
        match self {
            Source::Saeol | Source::Board => "https://www.namhae.go.kr",
            Source::Worknet => "https://gyeongnam.work.go.kr",
            Source::Refarm => "http://refarm.namhae.go.kr",
            Source::Greendaero => "https://greendaero.go.kr",
        }
    }

    /// Contact used when a posting carries no phone number of its own
    pub fn default_phone(&self) -> &'static str {
        COUNTY_OFFICE_PHONE
    }
}

/// House-specific details. Source pages vary in completeness, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HouseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

impl HouseDetails {
    pub fn is_empty(&self) -> bool {
        *self == HouseDetails::default()
    }
}

/// Variant-specific part of a posting, discriminated by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostingKind {
    Job,
    House(HouseDetails),
}

/// Normalized job or vacant-house record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    pub source: Source,
    pub source_name: String,
    pub title: String,
    pub date: Option<String>,
    pub link: String,
    pub phones: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub kind: PostingKind,
    pub crawled_at: DateTime<Utc>,
}

impl Posting {
    pub fn category(&self) -> Category {
        match self.kind {
            PostingKind::Job => Category::Job,
            PostingKind::House(_) => Category::House,
        }
    }

    pub fn house(&self) -> Option<&HouseDetails> {
        match &self.kind {
            PostingKind::House(details) => Some(details),
            PostingKind::Job => None,
        }
    }
}

/// A persisted posting with its store-assigned creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPosting {
    #[serde(flatten)]
    pub posting: Posting,
    pub created_at: DateTime<Utc>,
}
