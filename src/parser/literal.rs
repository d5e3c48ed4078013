//! Literal decoding and canonical rendering.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use regex::Regex;

use crate::error::{QueryError, Result};

fn datetime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)^datetime\s*\(\s*"?([^")]*?)"?\s*\)$"#).expect("valid datetime pattern")
    })
}

/// Decodes a double-quoted string literal, including its quotes.
///
/// Recognized escapes: `\"`, `\f`, `\n`, `\r`, `\t`, `\\`.
///
/// # Errors
///
/// Returns `MalformedLiteral` for a missing quote, an unknown escape or a
/// trailing backslash.
pub fn unescape_string(literal: &str) -> Result<String> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| QueryError::MalformedLiteral(format!("unquoted string {literal}")))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next() {
            Some('"') => '"',
            Some('f') => '\u{000C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('\\') => '\\',
            Some(other) => {
                return Err(QueryError::MalformedLiteral(format!(
                    "invalid escape \\{other} in {literal}"
                )))
            }
            None => {
                return Err(QueryError::MalformedLiteral(format!(
                    "trailing backslash in {literal}"
                )))
            }
        };
        out.push(decoded);
    }
    Ok(out)
}

/// Renders a string as a double-quoted literal that [`unescape_string`] decodes back.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Extracts and parses the RFC 3339 timestamp of a `datetime(...)` literal.
///
/// Lowercase `t` and `z` markers are accepted.
///
/// # Errors
///
/// Returns `MalformedLiteral` if the wrapper or the timestamp is invalid.
pub fn parse_datetime(literal: &str) -> Result<DateTime<FixedOffset>> {
    let captures = datetime_pattern()
        .captures(literal.trim())
        .ok_or_else(|| QueryError::MalformedLiteral(format!("invalid datetime literal {literal}")))?;
    let raw = captures.get(1).map_or("", |m| m.as_str());
    let normalized = raw.replace('t', "T").replace('z', "Z");
    DateTime::parse_from_rfc3339(&normalized)
        .map_err(|e| QueryError::MalformedLiteral(format!("invalid datetime {raw}: {e}")))
}

/// Renders a datetime literal.
#[must_use]
pub fn format_datetime(d: &DateTime<FixedOffset>) -> String {
    format!("datetime({})", d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Renders a float as the shortest round-trip decimal, always with a
/// fractional part so it reads back as a float.
#[must_use]
pub fn format_float64(v: f64) -> String {
    let s = v.to_string();
    if v.is_finite() && !s.contains(&['.', 'e', 'E'][..]) {
        format!("{s}.0")
    } else {
        s
    }
}

/// Parses an integer literal.
///
/// # Errors
///
/// Returns `MalformedLiteral` on overflow or invalid digits.
pub fn parse_int64(text: &str) -> Result<i64> {
    text.parse()
        .map_err(|e| QueryError::MalformedLiteral(format!("invalid integer {text}: {e}")))
}

/// Parses a float literal.
///
/// # Errors
///
/// Returns `MalformedLiteral` on invalid syntax.
pub fn parse_float64(text: &str) -> Result<f64> {
    text.parse()
        .map_err(|e| QueryError::MalformedLiteral(format!("invalid number {text}: {e}")))
}
