//! Template token parser for `{{variable}}` syntax.
//!
//! Scans strings and extracts variable tokens with their byte spans so
//! substitution can be done in a single left-to-right pass.

use std::ops::Range;

/// A parsed `{{name}}` token in a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateToken {
    /// The token name, whitespace trimmed.
    pub name: String,

    /// Byte range of the whole `{{…}}` token in the original string.
    pub span: Range<usize>,
}

impl TemplateToken {
    /// Creates a new token.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Parses a template and extracts all `{{ name }}` tokens.
///
/// Whitespace around the name is ignored; empty tokens are skipped; an
/// unclosed `{{` ends the scan.
#[must_use]
pub fn parse_tokens(input: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if ch != '{' {
            continue;
        }
        let Some((_, '{')) = chars.peek() else {
            continue;
        };
        chars.next(); // consume second {

        let start = i;
        let mut name = String::new();
        let mut found_end = false;

        while let Some((_, ch)) = chars.next() {
            if ch == '}' {
                if let Some((end_idx, '}')) = chars.peek() {
                    let end = *end_idx + 1;
                    chars.next(); // consume second }

                    let trimmed = name.trim();
                    if !trimmed.is_empty() {
                        tokens.push(TemplateToken::new(trimmed, start..end));
                    }
                    found_end = true;
                    break;
                }
            }
            name.push(ch);
        }

        if !found_end {
            break;
        }
    }

    tokens
}

/// Returns true if the input contains any candidate token syntax.
#[must_use]
pub fn has_tokens(input: &str) -> bool {
    input.contains("{{") && input.contains("}}")
}
