//! Prompt templates for the single, map and reduce LLM calls.
//!
//! Templates live in `src/prompts/*.txt` and use `{text}` / `{word_count}`
//! placeholders. `{word_count}` is substituted before `{text}` so user text
//! containing a literal `{word_count}` is left alone.

const SINGLE_TEMPLATE: &str = include_str!("./prompts/single.txt");
const MAP_TEMPLATE: &str = include_str!("./prompts/map.txt");
const REDUCE_TEMPLATE: &str = include_str!("./prompts/reduce.txt");

fn render(template: &str, text: &str, word_count: Option<i64>) -> String {
    let rendered = match word_count {
        Some(n) => template.replace("{word_count}", &n.to_string()),
        None => template.to_string(),
    };
    rendered.replace("{text}", text)
}

/// One-shot prompt: summarize `text` in about `word_count` words.
pub fn build_single(text: &str, word_count: i64) -> String {
    render(SINGLE_TEMPLATE, text, Some(word_count))
}

/// Map prompt: neutral intermediate summary of one chunk, no length target.
pub fn build_map(chunk: &str) -> String {
    render(MAP_TEMPLATE, chunk, None)
}

/// Reduce prompt over partial summaries, kept in chunk order.
///
/// The structure directive (title, introduction, numbered points) is fixed.
pub fn build_reduce(partials: &[String], word_count: i64) -> String {
    let joined = partials
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    render(REDUCE_TEMPLATE, &joined, Some(word_count))
}
