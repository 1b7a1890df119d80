//! Content extraction: turns a [`Source`] into ordered [`TextSegment`]s.
//!
//! [`Extractor`] picks the loader for each source kind:
//!
//! | Source | Loader | Origin |
//! |--------|--------|--------|
//! | `RawText` | passthrough | `text` |
//! | `Document` | [`extract_document`] by declared format | `document` |
//! | `WebUrl` | [`crate::web`] fetch + markup stripping | `web` |
//! | `VideoUrl` | [`crate::youtube`] caption/metadata tiers | `transcript` / `metadata` / `none` |
//!
//! Document parsing works on in-memory bytes; PDF goes through `pdf-extract`,
//! OOXML (docx/pptx/xlsx) is unzipped and its XML parts walked with
//! `quick-xml`. Parsing is CPU-bound and runs on the blocking pool.

use std::io::Read;
use std::time::Duration;

use crate::config::ExtractConfig;
use crate::error::SummarizeError;
use crate::models::{DocumentFormat, Extraction, Origin, Source, TextSegment};
use crate::{web, youtube};

/// Maximum sheets to read from an xlsx workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to read per sheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Source-kind dispatcher. Holds the shared HTTP client used for web and
/// video fetches.
#[derive(Clone)]
pub struct Extractor {
    http: reqwest::Client,
    config: ExtractConfig,
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Extract text from `source`.
    ///
    /// An empty [`Extraction`] (no segments) means there was nothing to read;
    /// callers decide whether that is an error.
    #[tracing::instrument(skip_all, fields(source = source.kind()))]
    pub async fn extract(&self, source: Source) -> Result<Extraction, SummarizeError> {
        let extraction = match source {
            Source::RawText(text) => {
                if text.trim().is_empty() {
                    Extraction::empty(Origin::Text)
                } else {
                    Extraction::single(text, Origin::Text)
                }
            }
            Source::Document { bytes, format } => {
                let text = tokio::task::spawn_blocking(move || extract_document(&bytes, format))
                    .await
                    .map_err(|e| {
                        SummarizeError::Extraction(format!("{} parser aborted: {}", format, e))
                    })??;
                document_segments(&text, format)
            }
            Source::WebUrl(url) => web::fetch_page_text(&self.http, &url).await?,
            Source::VideoUrl(url) => youtube::extract_video(&self.http, &url, &self.config).await,
        };

        tracing::debug!(
            origin = %extraction.origin,
            segments = extraction.segments.len(),
            "extraction finished"
        );
        Ok(extraction)
    }
}

/// Splits extracted document text into paragraph segments.
///
/// PDF text wraps lines inside a paragraph, so only blank lines end one there.
/// The Office walkers emit one line per paragraph, row or text frame.
fn document_segments(text: &str, format: DocumentFormat) -> Extraction {
    let segments = match format {
        DocumentFormat::Pdf => pdf_paragraphs(text),
        _ => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    };
    Extraction {
        segments: segments
            .into_iter()
            .map(|p| TextSegment::new(p, Origin::Document))
            .collect(),
        origin: Origin::Document,
    }
}

fn pdf_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

/// Extracts plain text from document bytes of the declared format.
///
/// # Errors
///
/// [`SummarizeError::Extraction`] when the bytes cannot be parsed as `format`.
pub fn extract_document(bytes: &[u8], format: DocumentFormat) -> Result<String, SummarizeError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Pptx => extract_pptx(bytes),
        DocumentFormat::Xlsx => extract_xlsx(bytes),
    }
}

fn ooxml_err(e: impl std::fmt::Display) -> SummarizeError {
    SummarizeError::Extraction(format!("OOXML: {}", e))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, SummarizeError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| SummarizeError::Extraction(format!("PDF: {}", e)))
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, SummarizeError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)
}

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, SummarizeError> {
    let entry = archive.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Numbered parts like `ppt/slides/slide7.xml`, sorted by number.
fn numbered_parts(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_docx(bytes: &[u8]) -> Result<String, SummarizeError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
    collect_runs(&xml)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, SummarizeError> {
    let mut archive = open_archive(bytes)?;
    let slides = numbered_parts(&archive, "ppt/slides/slide");
    if slides.is_empty() {
        return Err(ooxml_err("no slides found"));
    }

    let mut out = String::new();
    for name in slides {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let text = collect_runs(&xml)?;
        if text.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(text.trim_end());
    }
    Ok(out)
}

/// Collects text runs (`w:t` in Word, `a:t` in DrawingML) and ends a line
/// at every paragraph (`w:p` / `a:p`). Tabs and breaks become whitespace.
fn collect_runs(xml: &[u8]) -> Result<String, SummarizeError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(ooxml_err)?;
                out.push_str(&text);
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, SummarizeError> {
    let mut archive = open_archive(bytes)?;
    // sharedStrings.xml is absent from workbooks with only numbers
    let shared_strings = if archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        read_shared_strings(&mut archive)?
    } else {
        Vec::new()
    };

    let sheets = numbered_parts(&archive, "xl/worksheets/sheet");
    if sheets.is_empty() {
        return Err(ooxml_err("no worksheets found"));
    }

    let mut out = String::new();
    for name in sheets.into_iter().take(XLSX_MAX_SHEETS) {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let rows = extract_sheet_rows(&xml, &shared_strings)?;
        if rows.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&rows);
    }
    Ok(out)
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, SummarizeError> {
    use quick_xml::events::Event;

    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    // one <si> may hold several rich-text runs
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = current.is_some(),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(ooxml_err)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// One output line per `<row>`, cells separated by a single space.
fn extract_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<String, SummarizeError> {
    use quick_xml::events::Event;

    let mut lines: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cell_type: Option<Vec<u8>> = None;
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_type = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"t")
                        .map(|a| a.value.into_owned());
                }
                // <v> holds values, <t> holds inline strings
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let raw = te.unescape().map_err(ooxml_err)?;
                let value = raw.trim();
                if !value.is_empty() {
                    let resolved = match cell_type.as_deref() {
                        Some(b"s") => value
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i).cloned()),
                        _ => Some(value.to_string()),
                    };
                    if let Some(text) = resolved {
                        row.push(text);
                        cell_count += 1;
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => cell_type = None,
                b"row" => {
                    if !row.is_empty() {
                        lines.push(row.join(" "));
                        row.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    if !row.is_empty() {
        lines.push(row.join(" "));
    }
    Ok(lines.join("\n"))
}
