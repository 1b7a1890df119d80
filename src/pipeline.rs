//! Summarization pipeline: extract → chunk → (direct | map-reduce).
//!
//! ```text
//! SummaryRequest
//!   │ word_count <= 0 ──────────────────────────────► InvalidRequest
//!   ▼
//! Extractor::extract ── no content ─────────────────► NoContent
//!   │ (url sources truncated to pipeline.url_max_chars)
//!   ▼
//! choose_path
//!   ├─ Direct:    build_single ──► 1 LLM call
//!   └─ MapReduce: split ──► build_map per chunk (≤ max_concurrency in flight)
//!                        ──► build_reduce over ordered partials ──► 1 LLM call
//! ```
//!
//! Every LLM call goes through [`complete_with_retry`]. Nothing is spawned;
//! dropping the future returned by [`Pipeline::summarize`] abandons any
//! in-flight calls.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};

use crate::chunk;
use crate::config::{ChunkProfile, ChunkingConfig, Config, PipelineConfig};
use crate::error::SummarizeError;
use crate::extract::Extractor;
use crate::llm::{complete_with_retry, LlmClient, RetryPolicy};
use crate::models::{Source, SummaryOutcome, SummaryPath, SummaryRequest};
use crate::prompt;

/// Decides between a single call and map-reduce.
///
/// Documents always go through map-reduce; everything else is direct when
/// the text is shorter than `direct_threshold_chars`.
pub fn choose_path(is_document: bool, text_chars: usize, direct_threshold_chars: usize) -> PathKind {
    if !is_document && text_chars < direct_threshold_chars {
        PathKind::Direct
    } else {
        PathKind::MapReduce
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Direct,
    MapReduce,
}

/// Chunk sizing for a source: PDFs and Office files have their own profiles.
pub fn chunk_profile(source: &Source, chunking: &ChunkingConfig) -> ChunkProfile {
    match source {
        Source::Document { format, .. } if format.is_office() => chunking.office,
        Source::Document { .. } => chunking.pdf,
        _ => chunking.text,
    }
}

/// Shared, stateless summarizer. Cheap to put behind an `Arc` and call from
/// many requests at once.
pub struct Pipeline {
    client: Arc<dyn LlmClient>,
    extractor: Extractor,
    retry: RetryPolicy,
    max_concurrency: usize,
    settings: PipelineConfig,
    chunking: ChunkingConfig,
}

impl Pipeline {
    pub fn new(config: &Config, client: Arc<dyn LlmClient>) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            extractor: Extractor::new(&config.extract)?,
            retry: config.llm.retry_policy(),
            max_concurrency: config.llm.max_concurrency.max(1),
            settings: config.pipeline.clone(),
            chunking: config.chunking.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Runs one request to completion.
    ///
    /// # Errors
    ///
    /// - [`SummarizeError::InvalidRequest`] for `word_count <= 0`, before any
    ///   extraction or LLM work.
    /// - [`SummarizeError::NoContent`] when extraction yields no text.
    /// - Extraction, fetch and LLM errors as they surface.
    #[tracing::instrument(skip_all, fields(source = request.source.kind(), word_count = request.word_count))]
    pub async fn summarize(&self, request: SummaryRequest) -> Result<SummaryOutcome, SummarizeError> {
        if request.word_count <= 0 {
            return Err(SummarizeError::InvalidRequest(format!(
                "word_count must be positive, got {}",
                request.word_count
            )));
        }
        let word_count = request.word_count;
        let source = request.source;

        let kind = source.kind();
        let profile = chunk_profile(&source, &self.chunking);
        let is_document = matches!(source, Source::Document { .. });
        let is_url = matches!(source, Source::WebUrl(_) | Source::VideoUrl(_));

        let extraction = self.extractor.extract(source).await?;
        if !extraction.has_content() {
            return Err(SummarizeError::NoContent(format!(
                "no text could be extracted from the {} source",
                kind
            )));
        }
        let origin = extraction.origin;
        if origin.is_degraded() {
            tracing::warn!("summarizing a placeholder; no real content was available");
        }

        let mut text = extraction.combined_text();
        if is_url {
            text = truncate_chars(text, self.settings.url_max_chars);
        }
        let text_chars = text.chars().count();

        let (summary, path, llm_calls) =
            match choose_path(is_document, text_chars, self.settings.direct_threshold_chars) {
                PathKind::Direct => {
                    tracing::info!(chars = text_chars, "direct summarization");
                    let summary = complete_with_retry(
                        self.client.as_ref(),
                        &prompt::build_single(&text, word_count),
                        &self.retry,
                    )
                    .await?;
                    (summary, SummaryPath::Direct, 1)
                }
                PathKind::MapReduce => {
                    let (summary, chunks) = self.map_reduce(&text, profile, word_count).await?;
                    (summary, SummaryPath::MapReduce { chunks }, chunks + 1)
                }
            };

        let summary = summary.trim().to_string();
        report_length(&summary, word_count);

        Ok(SummaryOutcome {
            summary,
            origin,
            path,
            llm_calls,
        })
    }

    /// Map every chunk concurrently, then reduce the partials in chunk order.
    /// Returns the final summary and the number of chunks.
    async fn map_reduce(
        &self,
        text: &str,
        profile: ChunkProfile,
        word_count: i64,
    ) -> Result<(String, usize), SummarizeError> {
        let chunks = chunk::split(text, profile.max_chars, profile.overlap_chars)?;
        tracing::info!(
            chunks = chunks.len(),
            max_chars = profile.max_chars,
            overlap = profile.overlap_chars,
            "map-reduce summarization"
        );

        let prompts: Vec<String> = chunks.iter().map(|c| prompt::build_map(&c.text)).collect();

        // `buffered` keeps output in input order regardless of completion order.
        let partials: Vec<String> = futures::stream::iter(prompts)
            .map(|prompt| {
                let client = self.client.clone();
                let retry = self.retry.clone();
                async move { complete_with_retry(client.as_ref(), &prompt, &retry).await }
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        tracing::debug!(partials = partials.len(), "map step finished");

        let summary = complete_with_retry(
            self.client.as_ref(),
            &prompt::build_reduce(&partials, word_count),
            &self.retry,
        )
        .await?;

        Ok((summary, chunks.len()))
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            tracing::debug!(max_chars, "truncating url text");
            text[..byte_idx].to_string()
        }
        None => text,
    }
}

/// The target is advisory; log how far off the model landed.
fn report_length(summary: &str, target: i64) {
    let actual = summary.split_whitespace().count() as i64;
    if actual > target.saturating_mul(2) || actual.saturating_mul(2) < target {
        tracing::warn!(target, actual, "summary length far from target");
    } else {
        tracing::debug!(target, actual, "summary length");
    }
}
