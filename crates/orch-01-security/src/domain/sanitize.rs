//! Input sanitization.
//!
//! Applied in order: script blocks, inline event handlers, markup tags and
//! dangerous URI schemes are removed; the result is trimmed, capped, and
//! `& < > " '` are entity-encoded. The cap bounds the final encoded output
//! and never splits an entity. Total over arbitrary UTF-8 input.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern");
    static ref UNTERMINATED_SCRIPT: Regex =
        Regex::new(r"(?is)<script\b.*$").expect("unterminated script pattern");
    static ref EVENT_HANDLER: Regex =
        Regex::new(r#"(?i)\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("event handler pattern");
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]*>").expect("markup tag pattern");
    static ref DANGEROUS_SCHEME: Regex =
        Regex::new(r"(?i)\b(?:javascript|vbscript|data)\s*:").expect("uri scheme pattern");
}

/// Deterministic text sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSanitizer {
    max_length: usize,
}

impl Default for InputSanitizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LENGTH)
    }
}

impl InputSanitizer {
    pub const DEFAULT_MAX_LENGTH: usize = 10_000;

    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Sanitize free-form text. Output never exceeds `max_length` chars.
    pub fn sanitize(&self, input: &str) -> String {
        let text = SCRIPT_BLOCK.replace_all(input, "");
        let text = UNTERMINATED_SCRIPT.replace_all(&text, "");
        let text = EVENT_HANDLER.replace_all(&text, "");
        let text = MARKUP_TAG.replace_all(&text, "");
        let text = DANGEROUS_SCHEME.replace_all(&text, "");

        encode_entities_capped(text.trim(), self.max_length)
    }
}

/// HTML-encode, stopping before any piece that would overrun `cap`.
fn encode_entities_capped(text: &str, cap: usize) -> String {
    let mut out = String::with_capacity(text.len().min(cap));
    let mut len = 0usize;
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        let piece: &str = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            other => other.encode_utf8(&mut buf),
        };
        let piece_len = piece.chars().count();
        if len + piece_len > cap {
            break;
        }
        out.push_str(piece);
        len += piece_len;
    }

    out
}
