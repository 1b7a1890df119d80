//! Core data types that flow through the summarization pipeline.
//!
//! A [`SummaryRequest`] names a [`Source`]; the extractor turns it into an
//! [`Extraction`] of [`TextSegment`]s tagged with an [`Origin`]; the chunker
//! cuts the combined text into [`Chunk`]s; the pipeline returns a
//! [`SummaryOutcome`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use reqwest::Url;
use serde::Serialize;

use crate::error::SummarizeError;

/// Document formats the extractor can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Xlsx,
    Pptx,
    Pdf,
}

impl DocumentFormat {
    pub fn is_office(&self) -> bool {
        !matches!(self, DocumentFormat::Pdf)
    }

    /// Infers the format from a file extension (`report.docx` → `Docx`).
    pub fn from_path(path: &Path) -> Result<Self, SummarizeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                SummarizeError::UnsupportedFormat(format!(
                    "{} has no file extension",
                    path.display()
                ))
            })?;
        ext.parse()
    }
}

/// Accepts extensions and the route names used by the HTTP API
/// (`word`, `excel`, `powerp`).
impl FromStr for DocumentFormat {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" | "word" => Ok(DocumentFormat::Docx),
            "xlsx" | "excel" => Ok(DocumentFormat::Xlsx),
            "pptx" | "powerp" | "powerpoint" => Ok(DocumentFormat::Pptx),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(SummarizeError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// An input to summarize. Immutable once built.
#[derive(Debug, Clone)]
pub enum Source {
    RawText(String),
    Document {
        bytes: Vec<u8>,
        format: DocumentFormat,
    },
    WebUrl(Url),
    VideoUrl(Url),
}

impl Source {
    /// Classifies a user-supplied URL as a video (YouTube) or a web page.
    pub fn from_url(raw: &str) -> Result<Self, SummarizeError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| SummarizeError::InvalidRequest(format!("invalid url '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SummarizeError::InvalidRequest(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }

        if is_youtube_host(url.host_str().unwrap_or_default()) {
            Ok(Source::VideoUrl(url))
        } else {
            Ok(Source::WebUrl(url))
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::RawText(_) => "text",
            Source::Document { .. } => "document",
            Source::WebUrl(_) => "web",
            Source::VideoUrl(_) => "video",
        }
    }
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
}

/// Which extraction tier actually produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Text,
    Document,
    Web,
    Transcript,
    Metadata,
    /// Every video tier failed; the text is a diagnostic placeholder.
    None,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Text => "text",
            Origin::Document => "document",
            Origin::Web => "web",
            Origin::Transcript => "transcript",
            Origin::Metadata => "metadata",
            Origin::None => "none",
        }
    }

    /// `true` when the summary is built from a placeholder rather than real content.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Origin::None)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub origin: Origin,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// Extractor output: ordered segments plus the tier that produced them.
///
/// An empty `segments` list means the source had nothing to extract; the
/// pipeline turns that into [`SummarizeError::NoContent`].
#[derive(Debug, Clone)]
pub struct Extraction {
    pub segments: Vec<TextSegment>,
    pub origin: Origin,
}

impl Extraction {
    pub fn single(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            segments: vec![TextSegment::new(text, origin)],
            origin,
        }
    }

    pub fn empty(origin: Origin) -> Self {
        Self {
            segments: Vec::new(),
            origin,
        }
    }

    /// Segments in order, separated by a blank line so each one reads as a
    /// paragraph to the chunker.
    pub fn combined_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn has_content(&self) -> bool {
        self.segments.iter().any(|s| !s.text.trim().is_empty())
    }
}

/// A bounded slice of the source text.
///
/// `start` is a character (not byte) offset into the chunked text. Chunk
/// `i + 1` starts `overlap` characters before chunk `i` ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A single summarization request. Not persisted.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    /// Approximate target length of the summary. Must be positive.
    pub word_count: i64,
    pub source: Source,
}

impl SummaryRequest {
    pub fn new(word_count: i64, source: Source) -> Self {
        Self { word_count, source }
    }
}

/// How the pipeline reached the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPath {
    /// One LLM call over the whole text.
    Direct,
    /// One call per chunk plus one reduce call.
    MapReduce { chunks: usize },
}

/// JSON body returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub summary: String,
    pub origin: Origin,
}

/// Full pipeline outcome, including diagnostics not sent over the wire.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    pub origin: Origin,
    pub path: SummaryPath,
    pub llm_calls: usize,
}

impl From<SummaryOutcome> for SummaryResult {
    fn from(outcome: SummaryOutcome) -> Self {
        SummaryResult {
            summary: outcome.summary,
            origin: outcome.origin,
        }
    }
}
