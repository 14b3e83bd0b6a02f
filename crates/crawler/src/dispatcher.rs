//! Concurrent, resumable crawl dispatcher.
//!
//! The dispatcher walks the subject catalog sequentially, discovers lesson
//! links per subject, and processes lessons on a bounded worker pool. Every
//! lesson is processed at most once per run: the progress ledger and the
//! filesystem are consulted before any session is opened, and only exhausted
//! navigation leaves a lesson eligible for a future run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use lessonforge_convert::{Converter, DocumentWriter, JsonDocumentWriter};
use lessonforge_ledger::ProgressLedger;
use lessonforge_shared::{
    CatalogEntry, CrawlConfig, LessonForgeError, LessonLink, Result, sanitize_name,
};

use crate::fetcher::{Anchor, PageFetcher, PageSession, USER_AGENT};

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// Summary of a completed crawl run.
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Lessons fetched and marked processed during this run.
    pub lessons_processed: usize,
    /// Lessons skipped (ledger hit, artifact on disk, or cancellation).
    pub lessons_skipped: usize,
    /// Lessons abandoned after the navigation retry budget.
    pub lessons_failed: usize,
    /// Errors encountered (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Total duration of the run.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Orchestrates catalog processing over a [`PageFetcher`].
pub struct Dispatcher<F: PageFetcher> {
    ctx: Arc<TaskCtx<F>>,
}

/// Per-run shared state handed into every lesson task. The ledger is the
/// only mutable state shared across tasks.
struct TaskCtx<F: PageFetcher> {
    config: CrawlConfig,
    fetcher: F,
    ledger: ProgressLedger,
    converter: Converter,
    writer: Box<dyn DocumentWriter>,
    client: Client,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Dispatcher<F> {
    /// Create a dispatcher writing documents as JSON.
    pub fn new(config: CrawlConfig, fetcher: F, ledger: ProgressLedger) -> Result<Self> {
        Self::with_writer(config, fetcher, ledger, Box::new(JsonDocumentWriter))
    }

    /// Create a dispatcher with a custom document writer.
    pub fn with_writer(
        config: CrawlConfig,
        fetcher: F,
        ledger: ProgressLedger,
        writer: Box<dyn DocumentWriter>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.navigation_timeout_secs))
            .build()
            .map_err(|e| {
                LessonForgeError::AssetFetch(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            ctx: Arc::new(TaskCtx {
                converter: Converter::new(client.clone()),
                writer,
                client,
                config,
                fetcher,
                ledger,
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Token an operator can trigger to stop opening new sessions. In-flight
    /// artifact writes complete; they go through temp-then-rename anyway.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Process the whole catalog: sequential per-subject discovery feeding a
    /// worker pool bounded at `config.concurrency`.
    #[instrument(skip_all, fields(subjects = catalog.len()))]
    pub async fn run(&self, catalog: &[CatalogEntry]) -> CrawlReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.ctx.config.concurrency as usize));
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut report = CrawlReport::default();

        info!(
            concurrency = self.ctx.config.concurrency,
            ledger_entries = self.ctx.ledger.len(),
            "starting crawl"
        );

        for subject in catalog {
            if self.ctx.cancel.is_cancelled() {
                info!("cancellation requested, stopping discovery");
                break;
            }

            let anchors = match self.discover(subject).await {
                Ok(anchors) => anchors,
                Err(e) => {
                    warn!(subject = %subject.name, url = %subject.url, error = %e,
                        "subject discovery failed, skipping");
                    report.errors.push((subject.url.clone(), e.to_string()));
                    continue;
                }
            };
            info!(subject = %subject.name, lessons = anchors.len(), "subject discovered");

            for anchor in anchors {
                if anchor.href.is_empty() || anchor.text.is_empty() {
                    continue;
                }
                let link = LessonLink {
                    subject_name: subject.name.clone(),
                    folder_path: subject.folder_save.clone(),
                    url: anchor.href,
                    display_text: anchor.text,
                };
                tasks.spawn(process_lesson(
                    Arc::clone(&self.ctx),
                    Arc::clone(&semaphore),
                    link,
                ));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Processed) => report.lessons_processed += 1,
                Ok(TaskOutcome::Skipped) => report.lessons_skipped += 1,
                Ok(TaskOutcome::Failed { url, error }) => {
                    report.lessons_failed += 1;
                    report.errors.push((url, error));
                }
                Err(e) => {
                    report.lessons_failed += 1;
                    report.errors.push(("task".into(), e.to_string()));
                }
            }
        }

        report.duration = start.elapsed();
        info!(
            processed = report.lessons_processed,
            skipped = report.lessons_skipped,
            failed = report.lessons_failed,
            duration_ms = report.duration.as_millis(),
            "crawl completed"
        );
        report
    }

    /// Sequential discovery pass for one subject.
    async fn discover(&self, subject: &CatalogEntry) -> Result<Vec<Anchor>> {
        let session = self.ctx.fetcher.navigate(&subject.url).await?;
        Ok(session.links(&self.ctx.config.lesson_link_selector))
    }
}

// ---------------------------------------------------------------------------
// Per-lesson task
// ---------------------------------------------------------------------------

enum TaskOutcome {
    Processed,
    Skipped,
    Failed { url: String, error: String },
}

async fn process_lesson<F: PageFetcher>(
    ctx: Arc<TaskCtx<F>>,
    semaphore: Arc<Semaphore>,
    link: LessonLink,
) -> TaskOutcome {
    let _permit = semaphore.acquire().await.expect("semaphore closed");

    // Step 1: ledger truth.
    if ctx.ledger.contains(&link.url) {
        debug!(url = %link.url, "already processed, skipping");
        return TaskOutcome::Skipped;
    }

    // Step 2: filesystem truth, reconciled into the ledger.
    let stem = sanitize_name(&link.display_text);
    let folder = PathBuf::from(&link.folder_path);
    let asset_path = folder.join(format!("{stem}.{}", ctx.config.asset_ext));
    let doc_path = folder.join(format!("{stem}.{}", ctx.config.doc_ext));

    if asset_path.exists() || doc_path.exists() {
        debug!(url = %link.url, "artifact already on disk, reconciling ledger");
        if let Err(e) = ctx.ledger.add(&link.url) {
            warn!(url = %link.url, error = %e, "ledger append failed during reconciliation");
        }
        return TaskOutcome::Skipped;
    }

    // Step 3: isolated session with a bounded retry budget. Exhaustion
    // leaves the ledger untouched so a later run can retry.
    let session = match navigate_with_retry(&ctx, &link.url).await {
        Some(session) => session,
        None => {
            if ctx.cancel.is_cancelled() {
                return TaskOutcome::Skipped;
            }
            return TaskOutcome::Failed {
                error: format!(
                    "navigation failed after {} attempts",
                    ctx.config.max_attempts
                ),
                url: link.url,
            };
        }
    };

    // Steps 4 and 5: asset or conversion; every error past this point is
    // logged and the lesson is still marked processed.
    if let Err(e) = handle_page(&ctx, &session, &link, &asset_path, &doc_path).await {
        warn!(url = %link.url, error = %e, "lesson handling failed, marking processed anyway");
    }
    drop(session);

    if let Err(e) = ctx.ledger.add(&link.url) {
        warn!(url = %link.url, error = %e, "ledger append failed");
        return TaskOutcome::Failed {
            url: link.url,
            error: e.to_string(),
        };
    }
    TaskOutcome::Processed
}

/// Navigate with the configured retry budget and randomized backoff.
/// Returns `None` on exhaustion or cancellation.
async fn navigate_with_retry<F: PageFetcher>(
    ctx: &TaskCtx<F>,
    url: &str,
) -> Option<F::Session> {
    let (min_ms, max_ms) = ctx.config.backoff_ms;
    for attempt in 1..=ctx.config.max_attempts {
        if ctx.cancel.is_cancelled() {
            info!(url, "cancellation requested, not opening a session");
            return None;
        }
        match ctx.fetcher.navigate(url).await {
            Ok(session) => return Some(session),
            Err(e) => {
                warn!(url, attempt, error = %e, "navigation attempt failed");
                if attempt < ctx.config.max_attempts {
                    let wait_ms = {
                        let mut rng = rand::thread_rng();
                        rng.gen_range(min_ms..=max_ms)
                    };
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
            }
        }
    }
    None
}

/// Either stream a direct asset or convert the page content into a document.
/// Never both for the same lesson.
async fn handle_page<F: PageFetcher>(
    ctx: &TaskCtx<F>,
    session: &F::Session,
    link: &LessonLink,
    asset_path: &Path,
    doc_path: &Path,
) -> Result<()> {
    if let Some(download_url) = session.find_download_link(&ctx.config.download_link_selector) {
        debug!(url = %link.url, download = %download_url, "direct asset found");
        return download_asset(&ctx.client, &download_url, asset_path).await;
    }

    let markup = session
        .extract_region(&ctx.config.content_region_selector)
        .unwrap_or_else(|| {
            debug!(url = %link.url, "content region absent, falling back to whole page");
            session.full_markup()
        });

    let doc = ctx.converter.convert(&markup, &link.display_text).await;
    ctx.writer.write(&doc, doc_path)
}

/// Stream an asset to disk through a `.part` file and a rename.
async fn download_asset(client: &Client, url: &Url, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| LessonForgeError::io(parent, e))?;
        }
    }

    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| LessonForgeError::AssetFetch(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(LessonForgeError::AssetFetch(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }

    let tmp = path.with_extension("part");
    let result = stream_to_file(&mut response, &tmp).await;
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|e| LessonForgeError::io(path, e))?;
    debug!(url = %url, path = %path.display(), "asset downloaded");
    Ok(())
}

async fn stream_to_file(response: &mut reqwest::Response, path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path).map_err(|e| LessonForgeError::io(path, e))?;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                file.write_all(&chunk)
                    .map_err(|e| LessonForgeError::io(path, e))?;
            }
            Ok(None) => break,
            Err(e) => {
                return Err(LessonForgeError::AssetFetch(format!(
                    "body read failed: {e}"
                )));
            }
        }
    }
    file.flush().map_err(|e| LessonForgeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lessonforge_convert::document::{Document, Run};

    use crate::fetcher::HttpSession;

    use super::*;

    // -- fake fetcher ------------------------------------------------------

    #[derive(Default)]
    struct Counters {
        sessions_opened: AtomicUsize,
        live: AtomicUsize,
        max_live: AtomicUsize,
    }

    struct FakeFetcher {
        pages: HashMap<String, String>,
        failures: Mutex<HashMap<String, u32>>,
        counters: Arc<Counters>,
        hold: Duration,
    }

    impl FakeFetcher {
        fn new(pages: Vec<(&str, String)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(u, m)| (u.to_string(), m)).collect(),
                failures: Mutex::new(HashMap::new()),
                counters: Arc::new(Counters::default()),
                hold: Duration::ZERO,
            }
        }

        /// Make the next `times` navigations to `url` fail.
        fn fail_times(self, url: &str, times: u32) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(url.to_string(), times);
            self
        }

        /// Keep each session open for `hold` before yielding it.
        fn hold_sessions(mut self, hold: Duration) -> Self {
            self.hold = hold;
            self
        }

        fn counters(&self) -> Arc<Counters> {
            Arc::clone(&self.counters)
        }
    }

    struct LiveGuard(Arc<Counters>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct FakeSession {
        inner: HttpSession,
        _guard: LiveGuard,
    }

    impl PageSession for FakeSession {
        fn find_download_link(&self, selector: &str) -> Option<Url> {
            self.inner.find_download_link(selector)
        }

        fn extract_region(&self, selector: &str) -> Option<String> {
            self.inner.extract_region(selector)
        }

        fn full_markup(&self) -> String {
            self.inner.full_markup()
        }

        fn links(&self, selector: &str) -> Vec<Anchor> {
            self.inner.links(selector)
        }
    }

    impl PageFetcher for FakeFetcher {
        type Session = FakeSession;

        fn navigate(&self, url: &str) -> impl Future<Output = Result<Self::Session>> + Send {
            let url = url.to_string();
            async move {
                {
                    let mut failures = self.failures.lock().unwrap();
                    if let Some(remaining) = failures.get_mut(&url) {
                        if *remaining > 0 {
                            *remaining -= 1;
                            return Err(LessonForgeError::navigation(&url, "connection reset"));
                        }
                    }
                }

                let markup = self
                    .pages
                    .get(&url)
                    .cloned()
                    .ok_or_else(|| LessonForgeError::navigation(&url, "no such page"))?;

                self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
                let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.counters.max_live.fetch_max(live, Ordering::SeqCst);
                if !self.hold.is_zero() {
                    tokio::time::sleep(self.hold).await;
                }

                Ok(FakeSession {
                    inner: HttpSession::from_markup(Url::parse(&url).unwrap(), markup),
                    _guard: LiveGuard(Arc::clone(&self.counters)),
                })
            }
        }
    }

    // -- helpers -----------------------------------------------------------

    fn test_config(dir: &Path) -> CrawlConfig {
        CrawlConfig {
            concurrency: 5,
            ledger_path: dir.join("processed_links.txt"),
            asset_ext: "pdf".into(),
            doc_ext: "doc.json".into(),
            navigation_timeout_secs: 5,
            max_attempts: 3,
            backoff_ms: (1, 2),
            lesson_link_selector: "a.leaf2".into(),
            download_link_selector: "a#btn-download-md".into(),
            content_region_selector: "div#content-post".into(),
        }
    }

    fn dispatcher(config: CrawlConfig, fetcher: FakeFetcher) -> Dispatcher<FakeFetcher> {
        let ledger = ProgressLedger::open(&config.ledger_path).expect("open ledger");
        Dispatcher::new(config, fetcher, ledger).expect("build dispatcher")
    }

    fn catalog_entry(url: &str, folder: &Path) -> CatalogEntry {
        CatalogEntry {
            name: "Toán 10".into(),
            url: url.into(),
            folder_save: folder.to_string_lossy().into_owned(),
        }
    }

    fn subject_page(lessons: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (href, text) in lessons {
            body.push_str(&format!(r#"<a class="leaf2" href="{href}">{text}</a>"#));
        }
        format!("<html><body>{body}</body></html>")
    }

    fn content_page(text: &str) -> String {
        format!(
            r#"<html><body><nav>menu</nav><div id="content-post"><p>{text}</p></div></body></html>"#
        )
    }

    fn read_doc(path: &Path) -> Document {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).expect("valid document")
    }

    // -- tests -------------------------------------------------------------

    #[tokio::test]
    async fn processes_lessons_and_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let fetcher = FakeFetcher::new(vec![
            (
                "https://site.test/toan-10",
                subject_page(&[
                    ("https://site.test/bai-1", "Bài 1"),
                    ("https://site.test/bai-2", "Bài 2"),
                ]),
            ),
            ("https://site.test/bai-1", content_page("Mệnh đề")),
            ("https://site.test/bai-2", content_page("Tập hợp")),
        ]);
        let counters = fetcher.counters();
        let d = dispatcher(test_config(dir.path()), fetcher);
        let catalog = vec![catalog_entry("https://site.test/toan-10", &folder)];

        let report = d.run(&catalog).await;
        assert_eq!(report.lessons_processed, 2);
        assert_eq!(report.lessons_failed, 0);
        assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 3);

        let doc = read_doc(&folder.join("Bài_1.doc.json"));
        assert_eq!(doc.title, "Bài 1");
        assert!(
            doc.paragraphs
                .iter()
                .any(|p| p.runs.contains(&Run::text("Mệnh đề")))
        );

        // Second run revisits only the subject index.
        let report = d.run(&catalog).await;
        assert_eq!(report.lessons_processed, 0);
        assert_eq!(report.lessons_skipped, 2);
        assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn reconciles_on_disk_artifacts_into_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join("Bài_1.doc.json"),
            r#"{"title":"Bài 1","paragraphs":[]}"#,
        )
        .unwrap();

        // The lesson page is deliberately absent: fetching it would fail.
        let fetcher = FakeFetcher::new(vec![(
            "https://site.test/toan-10",
            subject_page(&[("https://site.test/bai-1", "Bài 1")]),
        )]);
        let counters = fetcher.counters();
        let config = test_config(dir.path());
        let ledger_path = config.ledger_path.clone();
        let d = dispatcher(config, fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_skipped, 1);
        assert_eq!(report.lessons_failed, 0);
        assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 1);

        let ledger = ProgressLedger::open(&ledger_path).unwrap();
        assert!(ledger.contains("https://site.test/bai-1"));
    }

    #[tokio::test]
    async fn navigation_exhaustion_leaves_ledger_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let fetcher = FakeFetcher::new(vec![(
            "https://site.test/toan-10",
            subject_page(&[("https://site.test/bai-1", "Bài 1")]),
        )])
        .fail_times("https://site.test/bai-1", 3);
        let config = test_config(dir.path());
        let ledger_path = config.ledger_path.clone();
        let d = dispatcher(config, fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_failed, 1);
        assert_eq!(report.lessons_processed, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, "https://site.test/bai-1");

        let ledger = ProgressLedger::open(&ledger_path).unwrap();
        assert!(!ledger.contains("https://site.test/bai-1"));
        assert!(!folder.exists());
    }

    #[tokio::test]
    async fn retries_transient_navigation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let fetcher = FakeFetcher::new(vec![
            (
                "https://site.test/toan-10",
                subject_page(&[("https://site.test/bai-1", "Bài 1")]),
            ),
            ("https://site.test/bai-1", content_page("Mệnh đề")),
        ])
        .fail_times("https://site.test/bai-1", 1);
        let d = dispatcher(test_config(dir.path()), fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_processed, 1);
        assert_eq!(report.lessons_failed, 0);
        assert!(folder.join("Bài_1.doc.json").exists());
    }

    #[tokio::test]
    async fn concurrent_sessions_respect_bound() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let lessons: Vec<(String, String)> = (1..=8)
            .map(|i| (format!("https://site.test/bai-{i}"), format!("Bài {i}")))
            .collect();
        let anchors: Vec<(&str, &str)> = lessons
            .iter()
            .map(|(u, t)| (u.as_str(), t.as_str()))
            .collect();

        let mut pages = vec![("https://site.test/toan-10", subject_page(&anchors))];
        for (url, _) in &lessons {
            pages.push((url.as_str(), content_page("nội dung")));
        }

        let fetcher =
            FakeFetcher::new(pages).hold_sessions(Duration::from_millis(30));
        let counters = fetcher.counters();
        let mut config = test_config(dir.path());
        config.concurrency = 3;
        let d = dispatcher(config, fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_processed, 8);
        assert!(counters.max_live.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn downloads_direct_asset_instead_of_converting() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/files/bai-1.pdf"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");
        let lesson_page = format!(
            r##"<html><body><a id="btn-download-md" href="{}/files/bai-1.pdf">Download</a></body></html>"##,
            server.uri()
        );

        let fetcher = FakeFetcher::new(vec![
            (
                "https://site.test/toan-10",
                subject_page(&[("https://site.test/bai-1", "Bài 1")]),
            ),
            ("https://site.test/bai-1", lesson_page),
        ]);
        let d = dispatcher(test_config(dir.path()), fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_processed, 1);

        let asset = folder.join("Bài_1.pdf");
        assert_eq!(std::fs::read(&asset).unwrap(), b"%PDF-1.7");
        assert!(!folder.join("Bài_1.doc.json").exists());
        assert!(!folder.join("Bài_1.part").exists());
    }

    #[tokio::test]
    async fn falls_back_to_whole_page_without_content_region() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let fetcher = FakeFetcher::new(vec![
            (
                "https://site.test/toan-10",
                subject_page(&[("https://site.test/bai-1", "Bài 1")]),
            ),
            (
                "https://site.test/bai-1",
                "<html><body><p>chỉ nội dung</p></body></html>".to_string(),
            ),
        ]);
        let d = dispatcher(test_config(dir.path()), fetcher);

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_processed, 1);

        let doc = read_doc(&folder.join("Bài_1.doc.json"));
        assert!(
            doc.paragraphs
                .iter()
                .any(|p| p.runs.contains(&Run::text("chỉ nội dung")))
        );
    }

    #[tokio::test]
    async fn cancelled_run_opens_no_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Toan10");

        let fetcher = FakeFetcher::new(vec![(
            "https://site.test/toan-10",
            subject_page(&[("https://site.test/bai-1", "Bài 1")]),
        )]);
        let counters = fetcher.counters();
        let d = dispatcher(test_config(dir.path()), fetcher);
        d.cancellation_token().cancel();

        let report = d
            .run(&[catalog_entry("https://site.test/toan-10", &folder)])
            .await;
        assert_eq!(report.lessons_processed, 0);
        assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 0);
    }
}
