//! Page fetching capability: a narrow interface over page retrieval.
//!
//! The dispatcher only ever talks to [`PageFetcher`]/[`PageSession`], so any
//! compliant backend satisfies it: the bundled HTTP fetcher, a browser
//! automation service, or a deterministic test fake with canned markup.
//!
//! A session is exclusively owned by the task that created it and is never
//! pooled; dropping it releases the session on every exit path.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use lessonforge_shared::{LessonForgeError, Result};

/// User-Agent string for page requests.
pub(crate) const USER_AGENT: &str = concat!("lessonforge/", env!("CARGO_PKG_VERSION"));

/// An anchor discovered on a page: resolved target plus display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// An isolated, exclusively-owned view of one fetched page.
pub trait PageSession: Send + Sync {
    /// Direct-download link matching `selector`, resolved against the page
    /// URL, if the page offers one.
    fn find_download_link(&self, selector: &str) -> Option<Url>;

    /// Markup of the first region matching `selector`; `None` when the
    /// region is absent (callers fall back to [`full_markup`]).
    ///
    /// [`full_markup`]: PageSession::full_markup
    fn extract_region(&self, selector: &str) -> Option<String>;

    /// Whole-page markup fallback.
    fn full_markup(&self) -> String;

    /// Anchors matching `selector`, with resolved targets; used for
    /// per-subject lesson discovery.
    fn links(&self, selector: &str) -> Vec<Anchor>;
}

/// Creates page sessions. One `navigate` call is one attempt; the retry
/// budget lives in the dispatcher.
pub trait PageFetcher: Send + Sync + 'static {
    type Session: PageSession + 'static;

    fn navigate(&self, url: &str) -> impl Future<Output = Result<Self::Session>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Plain HTTP fetcher backed by `reqwest` + `scraper`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with a bounded per-navigation timeout.
    pub fn new(navigation_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(navigation_timeout)
            .build()
            .map_err(|e| {
                LessonForgeError::navigation("", format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    type Session = HttpSession;

    fn navigate(&self, url: &str) -> impl Future<Output = Result<Self::Session>> + Send {
        let client = self.client.clone();
        let url = url.to_string();
        async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| LessonForgeError::navigation(&url, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(LessonForgeError::navigation(&url, format!("HTTP {status}")));
            }

            // Redirects may have moved us; resolve relative links against
            // the final URL.
            let base = response.url().clone();
            let html = response
                .text()
                .await
                .map_err(|e| LessonForgeError::navigation(&url, format!("body read: {e}")))?;

            Ok(HttpSession { base, html })
        }
    }
}

/// Session over a fetched page. Holds the raw markup; `scraper`'s DOM is not
/// `Send`, so parsing happens inside each (synchronous) accessor.
#[derive(Debug)]
pub struct HttpSession {
    base: Url,
    html: String,
}

impl HttpSession {
    /// Construct a session directly from markup (test fakes reuse this).
    pub fn from_markup(base: Url, html: impl Into<String>) -> Self {
        Self {
            base,
            html: html.into(),
        }
    }
}

impl PageSession for HttpSession {
    fn find_download_link(&self, selector: &str) -> Option<Url> {
        let selector = Selector::parse(selector).ok()?;
        let doc = Html::parse_document(&self.html);
        let href = doc.select(&selector).next()?.value().attr("href")?;
        self.base.join(href).ok()
    }

    fn extract_region(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        let doc = Html::parse_document(&self.html);
        doc.select(&selector).next().map(|el| el.inner_html())
    }

    fn full_markup(&self) -> String {
        let doc = Html::parse_document(&self.html);
        if let Ok(body_sel) = Selector::parse("body") {
            if let Some(body) = doc.select(&body_sel).next() {
                return body.inner_html();
            }
        }
        self.html.clone()
    }

    fn links(&self, selector: &str) -> Vec<Anchor> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        let mut anchors = Vec::new();
        for el in doc.select(&selector) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = self.base.join(href) else {
                continue;
            };
            anchors.push(Anchor {
                href: resolved.to_string(),
                text: el.text().collect::<String>().trim().to_string(),
            });
        }
        anchors
    }
}
