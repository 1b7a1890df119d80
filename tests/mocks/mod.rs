//! Test doubles shared by the integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod llm;
pub mod upstream;

use skimmer::config::Config;

/// Defaults tuned for tests: no backoff sleeps, small chunks, short fetch
/// timeouts, and a YouTube watch URL that points nowhere.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.llm.provider = "ollama".to_string();
    config.llm.model = "stub".to_string();
    config.llm.backoff_base_ms = 0;
    config.llm.backoff_max_ms = 0;
    config.pipeline.direct_threshold_chars = 500;
    config.chunking.text = skimmer::config::ChunkProfile::new(200, 20);
    config.chunking.office = skimmer::config::ChunkProfile::new(200, 20);
    config.chunking.pdf = skimmer::config::ChunkProfile::new(200, 20);
    config.extract.fetch_timeout_secs = 5;
    config.extract.youtube_watch_url = "http://127.0.0.1:9/watch".to_string();
    config
}

/// `count` numbered paragraphs, each a few sentences long.
pub fn long_text(count: usize) -> String {
    (1..=count)
        .map(|i| {
            format!(
                "Para{:02} opens here. It carries a second sentence with filler words. \
                 A third sentence closes paragraph {}.",
                i, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
