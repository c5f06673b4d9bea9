//! Template title parsing.
//!
//! Titles lead with `"<phase>.<index>"` followed by any run of whitespace and
//! dashes, then the human title: `"2.3 - My Step"`. Titles without that
//! prefix get a key derived from their position in the manifest.

use crate::model::TemplateKey;

/// Result of parsing a manifest title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    pub key: TemplateKey,
    pub cleaned: String,
    /// `false` when the key came from the positional fallback.
    pub matched: bool,
}

impl ParsedTitle {
    /// Display title, `"<phase>.<index> - <cleaned>"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} - {}", self.key, self.cleaned)
    }
}

/// Parse a frame title found at `position` in the manifest array.
#[must_use]
pub fn parse_title(raw: &str, position: usize) -> ParsedTitle {
    if let Some((key, rest)) = split_prefix(raw) {
        return ParsedTitle { key, cleaned: clean(rest), matched: true };
    }

    let position = u32::try_from(position).unwrap_or(u32::MAX);
    ParsedTitle {
        key: TemplateKey::new(position / 10 + 1, position % 10),
        cleaned: raw.trim().to_string(),
        matched: false,
    }
}

/// Split `"<digits>.<digits><[\s-]*><rest>"`. The rest must be a single line.
fn split_prefix(raw: &str) -> Option<(TemplateKey, &str)> {
    let (phase, after_phase) = take_digits(raw)?;
    let after_dot = after_phase.strip_prefix('.')?;
    let (index, after_index) = take_digits(after_dot)?;
    let rest = after_index.trim_start_matches(|c: char| c.is_whitespace() || c == '-');
    if rest.contains(is_line_break) {
        return None;
    }
    Some((TemplateKey::new(phase, index), rest))
}

fn take_digits(s: &str) -> Option<(u32, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Trim, strip leading/trailing dashes, collapse whitespace runs to one space.
fn clean(rest: &str) -> String {
    let stripped = rest.trim().trim_matches('-');
    let mut out = String::with_capacity(stripped.len());
    let mut in_space = false;
    for c in stripped.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
