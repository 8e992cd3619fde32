use async_trait::async_trait;
use namhae_scout::error::{CycleError, FetchError, NotifyError};
use namhae_scout::models::{Category, Source};
use namhae_scout::notify::{Notification, Notifier, RecordingNotifier};
use namhae_scout::scrapers::types::{FetchSettings, NavigateOptions, RetryPolicy, WaitUntil};
use namhae_scout::scrapers::{LoaderFactory, PageLoader};
use namhae_scout::store::MemoryStore;
use namhae_scout::{is_interrupted, Scout};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SAEOL_PAGE: &str = r#"
<table><tbody>
    <tr><th>번호</th><th>제목</th><th>부서</th><th>등록일</th></tr>
    <tr><td>120</td><td class="title"><a href="/modules/saeol/gosi_view.do?not_ancmt_mgt_no=5501">2024년 산불감시원 채용 공고</a></td><td>산림과</td><td class="date">2024-02-01</td></tr>
    <tr><td>119</td><td class="title"><a href="/modules/saeol/gosi_view.do?not_ancmt_mgt_no=5500">도로 점용 허가 고시</a></td><td>건설과</td><td class="date">2024-01-30</td></tr>
</tbody></table>"#;

const REFARM_PAGE: &str = r#"
<table><tbody>
    <tr><td>8</td><td class="subject"><a href="/board/view.do?bIdx=88">미조면 바닷가 빈집 임대</a></td><td class="date">2024-02-03</td></tr>
</tbody></table>"#;

const GREENDAERO_PAGE: &str = r#"
<ul class="house_list">
    <li><a href="/house/detail/7"><h3>남해군 고현면 농가주택 매매</h3></a></li>
    <li><a href="/house/detail/8"><h3>산청군 빈집 임대</h3></a></li>
</ul>"#;

/// Serves canned pages; unknown URLs answer 503
struct Script {
    pages: Mutex<HashMap<String, String>>,
    loads: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    load_delay: Duration,
}

impl Script {
    fn new(pages: &[(Source, &str)]) -> Arc<Self> {
        Self::slow(pages, Duration::ZERO)
    }

    fn slow(pages: &[(Source, &str)], load_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(
                pages
                    .iter()
                    .map(|(source, html)| (source.landing_url().to_string(), html.to_string()))
                    .collect(),
            ),
            loads: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            load_delay,
        })
    }

    fn set_page(&self, source: Source, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(source.landing_url().to_string(), html.to_string());
    }

    fn loads_of(&self, source: Source) -> usize {
        self.loads
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.as_str() == source.landing_url())
            .count()
    }
}

struct ScriptedLoader(Arc<Script>);

#[async_trait]
impl PageLoader for ScriptedLoader {
    async fn load(&self, url: &str, _options: &NavigateOptions) -> Result<String, FetchError> {
        self.0.loads.lock().unwrap().push(url.to_string());
        if !self.0.load_delay.is_zero() {
            tokio::time::sleep(self.0.load_delay).await;
        }
        let page = self.0.pages.lock().unwrap().get(url).cloned();
        page.ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 503,
        })
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedFactory(Arc<Script>);

#[async_trait]
impl LoaderFactory for ScriptedFactory {
    async fn open(&self) -> anyhow::Result<Box<dyn PageLoader>> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedLoader(Arc::clone(&self.0))))
    }
}

/// Completes a publish only once `n` publishes are waiting at the same time
struct GatheringNotifier(tokio::sync::Barrier);

#[async_trait]
impl Notifier for GatheringNotifier {
    async fn publish(&self, _topic: &str, _notification: &Notification) -> Result<(), NotifyError> {
        self.0.wait().await;
        Ok(())
    }
}

fn fast_settings() -> FetchSettings {
    FetchSettings {
        navigate: NavigateOptions {
            wait_until: WaitUntil::Load,
            timeout: Duration::from_secs(1),
            delay_after: Duration::ZERO,
        },
        retry: RetryPolicy {
            retries: 1,
            delay: Duration::from_millis(1),
        },
    }
}

fn scout(script: &Arc<Script>, store: &Arc<MemoryStore>, notifier: &Arc<RecordingNotifier>) -> Scout {
    Scout::new(
        store.clone(),
        notifier.clone(),
        Arc::new(ScriptedFactory(Arc::clone(script))),
    )
    .with_settings(fast_settings())
}

fn all_pages() -> Arc<Script> {
    // The county job board and worknet are left unanswered
    Script::new(&[
        (Source::Saeol, SAEOL_PAGE),
        (Source::Refarm, REFARM_PAGE),
        (Source::Greendaero, GREENDAERO_PAGE),
    ])
}

#[tokio::test]
async fn failing_sources_do_not_stop_the_cycle() {
    let script = all_pages();
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let report = scout(&script, &store, &notifier).run_cycle().await.unwrap();

    let jobs = report.category(Category::Job).unwrap();
    assert_eq!(jobs.collected, 1);
    assert_eq!(jobs.new, 1);
    assert_eq!(jobs.failed_sources, vec![Source::Board]);

    let houses = report.category(Category::House).unwrap();
    assert_eq!(houses.collected, 2);
    assert_eq!(houses.new, 2);
    assert!(houses.failed_sources.is_empty());

    // Board retries once; worknet is tolerant and tried once
    assert_eq!(script.loads_of(Source::Board), 2);
    assert_eq!(script.loads_of(Source::Worknet), 1);

    assert_eq!(script.opened.load(Ordering::SeqCst), 1);
    assert_eq!(script.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn new_postings_are_stored_and_notified_once() {
    let script = all_pages();
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let scout = scout(&script, &store, &notifier);

    let first = scout.run_cycle().await.unwrap();
    assert_eq!(first.total_new(), 3);
    assert_eq!(store.count("jobs").await, 1);
    assert_eq!(store.count("houses").await, 2);

    let second = scout.run_cycle().await.unwrap();
    assert_eq!(second.total_new(), 0);
    assert_eq!(store.count("houses").await, 2);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 3);

    let (topic, job) = sent.iter().find(|(topic, _)| topic == "jobs").unwrap();
    assert_eq!(topic, "jobs");
    assert_eq!(job.title, "💼 새 일자리 정보");
    assert_eq!(job.body, "2024년 산불감시원 채용 공고");
    assert_eq!(job.source, Source::Saeol);

    let stored = store.documents("jobs").await;
    assert_eq!(stored[0].posting.id, job.item_id);
    assert_eq!(stored[0].posting.date.as_deref(), Some("2024-02-01"));
}

#[tokio::test]
async fn later_cycles_pick_up_newly_listed_items() {
    let script = all_pages();
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let scout = scout(&script, &store, &notifier);

    scout.run_cycle().await.unwrap();

    script.set_page(
        Source::Refarm,
        r#"<table><tbody>
            <tr><td>9</td><td class="subject"><a href="/board/view.do?bIdx=91">서면 농가주택 매매</a></td><td class="date">2024-02-09</td></tr>
            <tr><td>8</td><td class="subject"><a href="/board/view.do?bIdx=88">미조면 바닷가 빈집 임대</a></td><td class="date">2024-02-03</td></tr>
        </tbody></table>"#,
    );

    let report = scout.run_cycle().await.unwrap();
    let houses = report.category(Category::House).unwrap();
    assert_eq!(houses.collected, 3);
    assert_eq!(houses.new, 1);

    let last = notifier.sent().pop().unwrap().1;
    assert_eq!(last.body, "서면 농가주택 매매");
    assert_eq!(last.title, "🏠 새 빈집 정보");
}

#[tokio::test]
async fn overlapping_cycle_is_refused() {
    let script = Script::slow(&[(Source::Saeol, SAEOL_PAGE)], Duration::from_millis(50));
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let scout = scout(&script, &store, &notifier);

    let (first, second) = tokio::join!(scout.run_cycle(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        scout.run_cycle().await
    });

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CycleError>(),
        Some(CycleError::AlreadyRunning)
    ));
    assert_eq!(script.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scheduler_runs_immediately_and_stops_on_shutdown() {
    let script = all_pages();
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let scout = scout(&script, &store, &notifier);

    scout
        .run_scheduled(Duration::from_secs(3600), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
        })
        .await
        .unwrap();

    assert_eq!(script.opened.load(Ordering::SeqCst), 1);
    assert_eq!(store.count("jobs").await, 1);
}

#[tokio::test]
async fn notifications_go_out_side_by_side() {
    let script = all_pages();
    let store = Arc::new(MemoryStore::new());
    // One job and two houses are new, so three publishes must overlap
    let notifier = Arc::new(GatheringNotifier(tokio::sync::Barrier::new(3)));
    let scout = Scout::new(
        store.clone(),
        notifier,
        Arc::new(ScriptedFactory(Arc::clone(&script))),
    )
    .with_settings(fast_settings());

    let report = tokio::time::timeout(Duration::from_secs(2), scout.run_cycle())
        .await
        .expect("cycle waited on one publish at a time")
        .unwrap();
    assert_eq!(report.total_new(), 3);
}

#[tokio::test]
async fn shutdown_interrupts_a_running_cycle() {
    let script = Script::slow(
        &[
            (Source::Saeol, SAEOL_PAGE),
            (Source::Refarm, REFARM_PAGE),
            (Source::Greendaero, GREENDAERO_PAGE),
        ],
        Duration::from_millis(200),
    );
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let scout = scout(&script, &store, &notifier);

    let err = scout
        .run_cycle_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(is_interrupted(&err));
    assert_eq!(script.closed.load(Ordering::SeqCst), 1);
    assert_eq!(store.count("jobs").await, 0);
    assert!(notifier.sent().is_empty());

    let stopped = tokio::time::timeout(
        Duration::from_millis(500),
        scout.run_scheduled(Duration::from_secs(3600), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }),
    )
    .await;
    assert!(stopped.expect("scheduler waited for the whole cycle").is_ok());
    assert_eq!(script.opened.load(Ordering::SeqCst), 2);
    assert_eq!(script.closed.load(Ordering::SeqCst), 2);
    assert_eq!(store.count("houses").await, 0);
}
