//! # skimmer
//!
//! Summarization backend for a browser extension.
//!
//! skimmer takes raw text, an uploaded document (PDF, Word, Excel,
//! PowerPoint), a web page URL or a YouTube URL, extracts its text and asks
//! an LLM for a summary of roughly the requested length. Long inputs go
//! through map-reduce: the text is chunked, each chunk is summarized
//! concurrently, and the partial summaries are reduced into one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐
//! │  HTTP / CLI  │──▶│ Extractor │──▶│ Chunker  │──▶│ LLM client │
//! │ axum, clap   │   │ doc/web/yt│   │ overlap  │   │ retry+back │
//! └──────────────┘   └───────────┘   └──────────┘   └────────────┘
//!         ▲                                               │
//!         └──────────── { summary, origin } ◀─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//! skimmer serve                                   # HTTP API on 127.0.0.1:8000
//! skimmer summarize --words 120 --url https://example.com/article
//! skimmer summarize --words 200 --file report.docx
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Sources, segments, chunks, requests and outcomes |
//! | [`error`] | Error taxonomy with stable kinds and HTTP statuses |
//! | [`extract`] | Source dispatch and PDF/OOXML text extraction |
//! | [`web`] | Web page fetch and markup stripping |
//! | [`youtube`] | Caption → metadata → placeholder fallback for videos |
//! | [`chunk`] | Boundary-aware overlapping text splitter |
//! | [`prompt`] | Single, map and reduce prompt templates |
//! | [`llm`] | LLM client trait, providers and retry with backoff |
//! | [`pipeline`] | Direct vs. map-reduce orchestration |
//! | [`server`] | HTTP API (axum) |
//! | [`telemetry`] | `tracing` subscriber setup |

pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod telemetry;
pub mod web;
pub mod youtube;
