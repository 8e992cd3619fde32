//! Job-posting sources: the county notice board, the county job board and
//! the regional job network.

use crate::error::ExtractError;
use crate::models::{Posting, Source};
use crate::scrapers::candidate::Candidate;
use crate::scrapers::probe::{
    attr_of, date_cell, date_in_text, date_marked_text, element_text, first_link_href,
    first_link_text, first_match, heading_text, leading_text, own_href, own_link_text, text_of,
    NamedProbe, BOARD_DATE, BOARD_HREF, BOARD_TITLE,
};
use crate::scrapers::strategy::{collect_postings, Shape, StrategyChain, Tier};
use crate::scrapers::traits::SourceExtractor;
use crate::scrapers::types::FailurePolicy;
use crate::text::{mentions_job, parse_date};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};

/// Most postings taken from one job source per cycle
pub const MAX_JOBS_PER_SOURCE: usize = 30;

/// Terms that mark a county notice as a hiring notice
const HIRING_TERMS: &[&str] = &["구인", "채용", "모집", "일자리", "근로자", "인력"];

const FREE_TEXT_SCAN: &str = "a, li, tr";

fn is_hiring_notice(text: &str) -> bool {
    HIRING_TERMS.iter().any(|term| text.contains(term))
}

fn fourth_cell(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, "td:nth-child(4)").filter(|text| parse_date(text).is_some())
}

fn card_title(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, ".tit a, .title a, .subject a, dt a")
}

fn card_href(element: &ElementRef<'_>) -> Option<String> {
    attr_of(element, ".tit a[href], .title a[href], dt a[href]", "href")
}

/// Read a board row or list item with the shared probe chains
fn board_candidate(element: &ElementRef<'_>, date_probes: &[NamedProbe]) -> Option<Candidate> {
    Some(Candidate {
        title: first_match(element, "title", BOARD_TITLE)?,
        natural_key: None,
        date_text: first_match(element, "date", date_probes),
        href: first_match(element, "href", BOARD_HREF),
        body: element_text(element),
        house: None,
    })
}

/// 남해군청 새올 고시공고: a general notice board, filtered to hiring notices
pub struct SaeolExtractor {
    chain: StrategyChain,
}

impl SaeolExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .primary("table tbody tr", Shape::TableRow)
                .secondary("ul.board_list > li, div.board_list li, ul.bbs_list > li", Shape::Item)
                .free_text(FREE_TEXT_SCAN, is_hiring_notice),
        }
    }
}

impl Default for SaeolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExtractor for SaeolExtractor {
    fn source(&self) -> Source {
        Source::Saeol
    }

    fn extract(&self, document: &Html, crawled_at: DateTime<Utc>) -> Result<Vec<Posting>, ExtractError> {
        collect_postings(
            self.source(),
            &self.chain,
            document,
            crawled_at,
            MAX_JOBS_PER_SOURCE,
            |element, _tier| {
                let candidate = board_candidate(element, BOARD_DATE)?;
                is_hiring_notice(&candidate.title).then_some(candidate)
            },
        )
    }
}

/// 남해군청 구인구직 게시판: every row is a job posting
pub struct BoardExtractor {
    chain: StrategyChain,
}

/// The job board lists its registration date in the fourth column
const JOB_BOARD_DATE: &[NamedProbe] = &[
    NamedProbe::new("fourth-cell", fourth_cell),
    NamedProbe::new("date-cell", date_marked_text),
    NamedProbe::new("any-date-cell", date_cell),
    NamedProbe::new("date-in-text", date_in_text),
];

impl BoardExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .primary("table tbody tr", Shape::TableRow)
                .secondary("ul.bbs_list > li, div.board_list li", Shape::Item)
                .free_text(FREE_TEXT_SCAN, mentions_job),
        }
    }
}

impl Default for BoardExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExtractor for BoardExtractor {
    fn source(&self) -> Source {
        Source::Board
    }

    fn extract(&self, document: &Html, crawled_at: DateTime<Utc>) -> Result<Vec<Posting>, ExtractError> {
        collect_postings(
            self.source(),
            &self.chain,
            document,
            crawled_at,
            MAX_JOBS_PER_SOURCE,
            |element, tier| {
                let dates = if tier == Tier::Primary { JOB_BOARD_DATE } else { BOARD_DATE };
                board_candidate(element, dates)
            },
        )
    }
}

/// 경남 일자리 (남해): a script-rendered job network page, best effort
pub struct WorknetExtractor {
    chain: StrategyChain,
}

const WORKNET_TITLE: &[NamedProbe] = &[
    NamedProbe::new("card-title", card_title),
    NamedProbe::new("own-link", own_link_text),
    NamedProbe::new("heading", heading_text),
    NamedProbe::new("first-link", first_link_text),
    NamedProbe::new("leading-text", leading_text),
];

const WORKNET_HREF: &[NamedProbe] = &[
    NamedProbe::new("card-href", card_href),
    NamedProbe::new("own-href", own_href),
    NamedProbe::new("first-link-href", first_link_href),
];

/// Company name, shown ahead of the title where the card carries one
fn worknet_company(element: &ElementRef<'_>) -> Option<String> {
    text_of(element, ".company, .corp, .cp_name")
}

impl WorknetExtractor {
    pub fn new() -> Self {
        Self {
            chain: StrategyChain::new()
                .primary("ul.job_list > li, ul.recruit_list > li, div.recruit_list li", Shape::Item)
                .secondary("table.board_list tbody tr, table tbody tr", Shape::TableRow)
                .free_text(FREE_TEXT_SCAN, mentions_job),
        }
    }
}

impl Default for WorknetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExtractor for WorknetExtractor {
    fn source(&self) -> Source {
        Source::Worknet
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
            MAX_JOBS_PER_SOURCE,
            |element, _tier| {
                let title = first_match(element, "title", WORKNET_TITLE)?;
                let title = match worknet_company(element) {
                    Some(company) if !title.contains(&company) => format!("[{company}] {title}"),
                    _ => title,
                };
                Some(Candidate {
                    title,
                    natural_key: None,
                    date_text: first_match(element, "date", BOARD_DATE),
                    href: first_match(element, "href", WORKNET_HREF),
                    body: element_text(element),
                    house: None,
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(extractor: &dyn SourceExtractor, html: &str) -> Result<Vec<Posting>, ExtractError> {
        extractor.extract(&Html::parse_document(html), Utc::now())
    }

    const SAEOL_PAGE: &str = r#"
        <table><tbody>
            <tr><td>번호</td><td>제목</td><td>등록일</td></tr>
            <tr><td>공지</td><td class="title"><a href="/notice/1">홈페이지 이용 안내</a></td><td class="date">2024-01-02</td></tr>
            <tr><td>103</td><td class="title"><a href="/modules/saeol/gosi.do?mode=view&amp;not_ancmt_mgt_no=5512">2024년 상반기 기간제 근로자 채용 공고</a></td><td class="date">2024-03-05</td></tr>
            <tr><td>102</td><td class="title"><a href="/modules/saeol/gosi.do?mode=view&amp;not_ancmt_mgt_no=5511">도시계획시설 결정 고시</a></td><td class="date">2024-03-04</td></tr>
            <tr><td>101</td><td class="title"><a href="javascript:void(0)">청년 일자리 지원사업 참여자 모집</a></td><td class="date">24.3.1</td></tr>
        </tbody></table>"#;

    #[test]
    fn saeol_keeps_only_hiring_notices() {
        let postings = run(&SaeolExtractor::new(), SAEOL_PAGE).unwrap();
        let titles: Vec<&str> = postings.iter().map(|p| p.title.as_str()).collect();

        assert_eq!(
            titles,
            vec!["2024년 상반기 기간제 근로자 채용 공고", "청년 일자리 지원사업 참여자 모집"]
        );
        assert_eq!(
            postings[0].link,
            "https://www.namhae.go.kr/modules/saeol/gosi.do?mode=view&not_ancmt_mgt_no=5512"
        );
        assert_eq!(postings[0].date.as_deref(), Some("2024-03-05"));
        assert_eq!(postings[1].link, Source::Saeol.landing_url());
        assert_eq!(postings[1].date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn board_reads_fourth_column_date_and_row_phone() {
        let html = r#"
            <table><tbody>
                <tr><td>7</td><td><a href="/portal/board/View.do?idx=77">굴 까기 작업자 구합니다</a></td><td>홍길동</td><td>2024.02.28</td><td>12</td></tr>
                <tr><td>6</td><td><a href="/portal/board/View.do?idx=76">펜션 청소 파트타임 (010-1234-5678)</a></td><td>김철수</td><td>2024.02.27</td><td>30</td></tr>
            </tbody></table>"#;
        let postings = run(&BoardExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].date.as_deref(), Some("2024-02-28"));
        assert_eq!(postings[0].phones, vec![Source::Board.default_phone()]);
        assert_eq!(postings[1].phones, vec!["010-1234-5678"]);
        assert!(postings[1].keywords.contains(&"파트타임".to_string()));
    }

    #[test]
    fn board_skips_non_date_fourth_column() {
        let html = r#"
            <table><tbody>
                <tr><td>7</td><td><a href="/portal/board/View.do?idx=77">멸치 선별 작업자 모집</a></td><td>홍길동</td><td>152</td><td>2024.02.28</td></tr>
            </tbody></table>"#;
        let postings = run(&BoardExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].date.as_deref(), Some("2024-02-28"));
    }

    #[test]
    fn board_reads_phone_from_its_own_cell() {
        let html = r#"
            <table><tbody>
                <tr><td>5</td><td><a href="/portal/board/View.do?idx=55">굴 양식장 작업자 모집</a></td><td>박영희</td><td>2024.02.20</td><td>12</td><td>0558641234</td></tr>
            </tbody></table>"#;
        let postings = run(&BoardExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].phones, vec!["055-864-1234"]);
    }

    #[test]
    fn board_without_structure_uses_free_text_heuristic() {
        let html = r#"
            <div class="content">
                <p><a href="/portal/board/View.do?idx=90">수산물 가공공장 생산직 채용</a></p>
                <p><a href="/portal/main.do">메인으로</a></p>
            </div>"#;
        let postings = run(&BoardExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "수산물 가공공장 생산직 채용");
        assert!(postings[0].id.starts_with("board_idx90_"));
    }

    #[test]
    fn board_without_structure_or_keywords_yields_no_match() {
        let html = r#"<div><p><a href="/portal/main.do">메인으로</a></p></div>"#;
        assert!(matches!(
            run(&BoardExtractor::new(), html),
            Err(ExtractError::NoMatch { .. })
        ));
    }

    #[test]
    fn deny_listed_rows_are_never_emitted() {
        let html = r#"
            <table><tbody>
                <tr><td>2</td><td><a href="/login.do">로그인 바로가기</a></td><td>-</td><td>2024.02.28</td></tr>
                <tr><td>1</td><td><a href="/portal/board/View.do?idx=1">마늘 수확 일손 모집</a></td><td>-</td><td>2024.02.27</td></tr>
            </tbody></table>"#;
        let postings = run(&BoardExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "마늘 수확 일손 모집");
    }

    #[test]
    fn results_are_capped_per_source() {
        let rows: String = (1..=45)
            .map(|n| {
                format!(
                    r#"<tr><td>{n}</td><td><a href="/portal/board/View.do?idx={n}">농장 일손 모집 {n}</a></td><td>-</td><td>2024.01.01</td></tr>"#
                )
            })
            .collect();
        let html = format!("<table><tbody>{rows}</tbody></table>");

        let postings = run(&BoardExtractor::new(), &html).unwrap();
        assert_eq!(postings.len(), MAX_JOBS_PER_SOURCE);
    }

    #[test]
    fn worknet_prefixes_company_name() {
        let html = r#"
            <ul class="job_list">
                <li>
                    <span class="company">남해수협</span>
                    <p class="tit"><a href="/empInfo/empInfoSrch/detail/empDetailAuthView.do?wantedAuthNo=K123">위판장 계약직 사무원</a></p>
                    <span class="date">2024-03-02</span>
                </li>
            </ul>"#;
        let postings = run(&WorknetExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "[남해수협] 위판장 계약직 사무원");
        assert!(postings[0].id.starts_with("worknet_wantedAuthNoK123_"));
        assert_eq!(postings[0].date.as_deref(), Some("2024-03-02"));
    }

    #[test]
    fn worknet_table_rows_pass_the_row_gate() {
        let html = r#"
            <table class="board_list"><tbody>
                <tr><th>번호</th><th>채용제목</th><th>회사명</th><th>등록일</th></tr>
                <tr><td>공지</td><td><a href="/notice.do">채용정보 이용 안내</a></td><td>-</td><td>2024-01-01</td></tr>
                <tr><td>31</td><td><a href="/empInfo/empDetailAuthView.do?wantedAuthNo=K777">수산물 가공 생산직 채용</a></td><td>남해식품</td><td>2024-03-04</td></tr>
            </tbody></table>"#;
        let postings = run(&WorknetExtractor::new(), html).unwrap();

        assert_eq!(postings.len(), 1);
        assert!(postings[0].title.contains("수산물 가공 생산직 채용"));
        assert_eq!(postings[0].date.as_deref(), Some("2024-03-04"));
    }
}
