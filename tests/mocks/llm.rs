//! Scriptable `LlmClient` that records every prompt it sees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use skimmer::llm::{LlmClient, LlmError};

type Responder = dyn Fn(usize, &str) -> Result<String, LlmError> + Send + Sync;

pub struct StubLlm {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubLlm {
    /// `responder` gets the zero-based call number and the prompt.
    pub fn new(
        responder: impl Fn(usize, &str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Map prompts get `partial <fingerprint>`, everything else a fixed summary.
    pub fn summarizer() -> Arc<Self> {
        Self::new(|_, prompt| {
            if is_map_prompt(prompt) {
                Ok(partial_for(passage(prompt)))
            } else {
                Ok("Final summary text.".to_string())
            }
        })
    }

    pub fn failing(err: LlmError) -> Arc<Self> {
        Self::new(move |_, _| Err(err.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn reduce_prompt(&self) -> Option<String> {
        self.prompts().into_iter().find(|p| is_reduce_prompt(p))
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(n, prompt)
    }
}

pub fn is_map_prompt(prompt: &str) -> bool {
    prompt.starts_with("Summarize the passage below.")
}

pub fn is_reduce_prompt(prompt: &str) -> bool {
    prompt.starts_with("Below are partial summaries")
}

/// The chunk text embedded in a map prompt.
pub fn passage(prompt: &str) -> &str {
    let start = prompt.find("Passage:\n").map(|i| i + "Passage:\n".len()).unwrap_or(0);
    let end = prompt.rfind("\n\nSummary:").unwrap_or(prompt.len());
    &prompt[start..end.max(start)]
}

/// Deterministic stand-in summary for one chunk.
pub fn partial_for(chunk: &str) -> String {
    let head: String = chunk.chars().take(24).collect();
    format!("partial({} chars) {:?}", chunk.chars().count(), head)
}

/// Answers after a fixed delay and records how many calls overlapped.
pub struct PacedLlm {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl PacedLlm {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for PacedLlm {
    fn model_name(&self) -> &str {
        "paced"
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if is_map_prompt(prompt) {
            Ok(partial_for(passage(prompt)))
        } else {
            Ok("Final summary text.".to_string())
        }
    }
}
