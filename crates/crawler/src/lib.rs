//! Crawl orchestration for lessonforge: the page-fetching capability and the
//! concurrent, resumable lesson dispatcher built on top of it.

pub mod dispatcher;
pub mod fetcher;

pub use dispatcher::{CrawlReport, Dispatcher};
pub use fetcher::{Anchor, HttpFetcher, HttpSession, PageFetcher, PageSession};
