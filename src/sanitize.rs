//! Filesystem-safe display name sanitization.
//!
//! Course, chapter, and lesson titles come straight out of page markup
//! and may carry HTML entities and characters that are illegal in file
//! names. Everything that ends up in a path goes through [`sanitize`].

use regex::Regex;
use std::sync::LazyLock;

/// Separator-like punctuation becomes " - " so titles stay readable.
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/\\:|>] ?").unwrap());

/// Characters that are illegal on common filesystems are dropped.
static ILLEGAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[/\\?%"*<]"#).unwrap());

/// Sanitizes a raw display title into a filesystem-safe name.
///
/// Decodes HTML character entities, trims surrounding whitespace,
/// replaces path-separator-like punctuation with `" - "`, then strips
/// remaining illegal characters. Stripping can itself re-create an
/// entity (`&am%p;` becomes `&amp;`), so the whole pass runs to a
/// fixpoint. Idempotent: sanitizing an already sanitized string is a
/// no-op. Distinct inputs may still collide.
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let cleaned = sanitize_once(&current);
        if cleaned == current {
            return current;
        }
        current = cleaned;
    }
}

fn sanitize_once(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let replaced = SEPARATORS.replace_all(decoded.trim(), " - ");
    ILLEGAL.replace_all(&replaced, "").trim().to_string()
}

/// Decodes the HTML character entities that show up in course markup.
///
/// Runs the replacement table to a fixpoint so stacked encodings like
/// `&amp;gt;` fully resolve in a single call.
pub fn decode_entities(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let decoded = decode_entities_once(&current);
        if decoded == current {
            return current;
        }
        current = decoded;
    }
}

fn decode_entities_once(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "\u{2013}")
        .replace("&mdash;", "\u{2014}")
        .replace("&nbsp;", " ")
        .replace("&#8211;", "\u{2013}")
        .replace("&#8212;", "\u{2014}")
        .replace("&#160;", " ")
}
