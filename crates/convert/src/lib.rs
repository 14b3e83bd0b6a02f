//! Conversion engine: page markup → structured rich-document model.
//!
//! The engine lowers a markup fragment into an owned [`ContentFragment`]
//! tree, runs the cleaning pre-pass, maps top-level children to paragraphs,
//! and produces runs recursively per node kind: styled text, line breaks,
//! transcribed math, and embedded images. A failed subtree degrades to a
//! placeholder run; one bad fragment never aborts a whole document.
//!
//! The paragraph mapping is intentionally shallow: nested block structure
//! inside one top-level element collapses into a single paragraph.

pub mod document;
pub mod embed;
pub mod fragment;
pub mod math;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::document::{Document, Paragraph, Run, StyleFlags};
use crate::embed::ImageEmbedder;
use crate::fragment::ContentFragment;

pub use document::{DocumentWriter, JsonDocumentWriter};

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Converts markup fragments into [`Document`]s. Stateless across calls;
/// owns only the HTTP client used for image embedding.
pub struct Converter {
    embedder: ImageEmbedder,
}

impl Converter {
    pub fn new(client: Client) -> Self {
        Self {
            embedder: ImageEmbedder::new(client),
        }
    }

    /// Use a pre-configured embedder (tests point its temp dir at a scratch
    /// directory to observe cleanup).
    pub fn with_embedder(embedder: ImageEmbedder) -> Self {
        Self { embedder }
    }

    /// Convert a markup fragment into a document titled `title`.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn convert(&self, html: &str, title: &str) -> Document {
        let top = fragment::clean(fragment::parse_fragment(html));

        let mut staged: Vec<Vec<PendingRun>> = Vec::new();
        for child in &top {
            match child {
                ContentFragment::Element { children, .. } => {
                    let mut runs = Vec::new();
                    produce_runs(children, &mut runs);
                    staged.push(runs);
                }
                ContentFragment::Text(t) => {
                    // Whitespace-only top-level text is inter-element
                    // formatting, not content.
                    if !t.trim().is_empty() {
                        staged.push(vec![PendingRun::Ready(Run::text(t.clone()))]);
                    }
                }
                ContentFragment::Comment(_) => {}
            }
        }

        let mut paragraphs = Vec::with_capacity(staged.len());
        for runs in staged {
            paragraphs.push(Paragraph {
                runs: self.resolve(runs).await,
            });
        }

        debug!(paragraphs = paragraphs.len(), "fragment converted");
        Document {
            title: title.to_string(),
            paragraphs,
        }
    }

    /// Second phase: resolve pending image fetches into concrete runs.
    async fn resolve(&self, staged: Vec<PendingRun>) -> Vec<Run> {
        let mut runs = Vec::with_capacity(staged.len());
        for pending in staged {
            match pending {
                PendingRun::Ready(run) => runs.push(run),
                PendingRun::Image { src, width, height } => {
                    runs.push(
                        self.embedder
                            .embed(&src, width.as_deref(), height.as_deref())
                            .await,
                    );
                }
            }
        }
        runs
    }
}

// ---------------------------------------------------------------------------
// Run production
// ---------------------------------------------------------------------------

/// A run whose image payload has not been fetched yet. Run production is
/// synchronous over the fragment tree; fetches happen in a second phase so
/// the tree walk stays pure.
enum PendingRun {
    Ready(Run),
    Image {
        src: String,
        width: Option<String>,
        height: Option<String>,
    },
}

/// Produce runs for a paragraph's element subtree, in document order.
fn produce_runs(children: &[ContentFragment], out: &mut Vec<PendingRun>) {
    for (idx, child) in children.iter().enumerate() {
        match child {
            ContentFragment::Text(t) => out.push(PendingRun::Ready(Run::text(t.clone()))),
            ContentFragment::Comment(_) => {}
            ContentFragment::Element { tag, children: inner, .. } => match tag.as_str() {
                // Inline formatting flattens the whole subtree into one
                // styled run; nested formatting is not composed further.
                "sup" => push_styled(out, child, StyleFlags::superscript()),
                "sub" => push_styled(out, child, StyleFlags::subscript()),
                "strong" | "b" => push_styled(out, child, StyleFlags::bold()),
                "em" | "i" => push_styled(out, child, StyleFlags::italic()),
                "br" => out.push(PendingRun::Ready(Run::text("\n"))),
                "math" => {
                    let notation = math::transcribe(&math::from_fragment(child));
                    out.push(PendingRun::Ready(Run::Math { notation }));
                    // A single space separates two directly adjacent math
                    // elements.
                    if children
                        .get(idx + 1)
                        .and_then(ContentFragment::tag)
                        .is_some_and(|t| t == "math")
                    {
                        out.push(PendingRun::Ready(Run::text(" ")));
                    }
                }
                "img" => {
                    if let Some(src) = child.attr("src") {
                        out.push(PendingRun::Image {
                            src: src.to_string(),
                            width: child.attr("width").map(str::to_string),
                            height: child.attr("height").map(str::to_string),
                        });
                    }
                }
                // Structurally transparent: concatenate child runs.
                _ => produce_runs(inner, out),
            },
        }
    }
}

fn push_styled(out: &mut Vec<PendingRun>, el: &ContentFragment, style: StyleFlags) {
    out.push(PendingRun::Ready(Run::styled(el.text_content(), style)));
}
