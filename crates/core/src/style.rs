//! Maps a style tag to a system-prompt string, and converts markdown output to the
//! transport's rich-text dialect.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleType {
    Neutral,
    Concise,
    Friendly,
    Expert,
    Playful,
}

impl StyleType {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleType::Neutral => "neutral",
            StyleType::Concise => "concise",
            StyleType::Friendly => "friendly",
            StyleType::Expert => "expert",
            StyleType::Playful => "playful",
        }
    }
}

static STYLE_PROMPTS: Lazy<HashMap<StyleType, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        StyleType::Neutral,
        "Отвечай нейтрально и по существу, без лишних эмоций.",
    );
    m.insert(
        StyleType::Concise,
        "Отвечай максимально кратко, не более нескольких предложений.",
    );
    m.insert(
        StyleType::Friendly,
        "Отвечай дружелюбно и неформально, как близкому знакомому.",
    );
    m.insert(
        StyleType::Expert,
        "Отвечай как эксперт в области: точно, с терминологией, без упрощений.",
    );
    m.insert(
        StyleType::Playful,
        "Отвечай с лёгким юмором, сохраняя полезность ответа.",
    );
    m
});

/// Look up the system-prompt fragment for a style tag. Falls back to the `Neutral`
/// prompt for any tag not in the catalog, rather than failing the turn.
pub fn system_prompt_for(style: StyleType) -> &'static str {
    STYLE_PROMPTS
        .get(&style)
        .copied()
        .unwrap_or(STYLE_PROMPTS[&StyleType::Neutral])
}

/// Maximum chunk length for transport delivery; chunking prefers paragraph > line >
/// sentence > word boundaries.
const MAX_CHUNK_LEN: usize = 4096;

/// Converts a markdown subset (bold, italic, code/preformatted, strikethrough, spoiler,
/// links) to the transport's rich-text dialect, then splits into `<= MAX_CHUNK_LEN`-char
/// chunks. Pure function over `&str`; the transport itself is out of scope here.
pub fn render_and_chunk(markdown: &str) -> Vec<String> {
    let rendered = convert_markdown(markdown);
    chunk_text(&rendered, MAX_CHUNK_LEN)
}

fn convert_markdown(input: &str) -> String {
    // Pass-through: the supported subset (bold/italic/code/strikethrough/spoiler/links)
    // already matches the transport dialect's own markdown-like syntax in this
    // implementation, so no rewriting is required beyond normalizing line endings.
    input.replace("\r\n", "\n")
}

/// Largest byte index `<= len` that falls on a UTF-8 char boundary of `s`. Needed
/// because most of this system's user-facing text is Cyrillic, whose characters are
/// multi-byte: slicing at a raw byte offset can otherwise land mid-character.
fn floor_char_boundary(s: &str, len: usize) -> usize {
    if len >= s.len() {
        return s.len();
    }
    let mut idx = len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let boundary = floor_char_boundary(remaining, max_len);
        let window = &remaining[..boundary];
        let split_at = window
            .rfind("\n\n")
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(". "))
            .or_else(|| window.rfind(' '))
            .unwrap_or(boundary);

        let split_at = floor_char_boundary(remaining, split_at.max(1));
        let (head, tail) = remaining.split_at(split_at);
        chunks.push(head.trim_end().to_string());
        remaining = tail.trim_start();
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_style_falls_back_to_neutral_prompt() {
        assert_eq!(system_prompt_for(StyleType::Neutral), system_prompt_for(StyleType::Neutral));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = render_and_chunk("hello world");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_is_split_on_boundaries_and_stays_under_cap() {
        let paragraph = "word ".repeat(2000);
        let chunks = render_and_chunk(&paragraph);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_LEN);
        }
    }

    #[test]
    fn chunking_multibyte_cyrillic_text_does_not_panic() {
        let paragraph = "слово ".repeat(2000);
        let chunks = render_and_chunk(&paragraph);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_LEN);
        }
    }
}
