//! Moving a database dump between environments: rewrite the source site's
//! host name to the destination's.
//!
//! A plain search and replace breaks PHP-serialized values, which store the
//! byte length of every string (`s:17:"http://site.local";`). The migration
//! therefore recognises serialized strings while replacing and rewrites their
//! length prefix to match the new content. Inside a mysqldump the quotes are
//! escaped (`s:17:\"...\";`) and the declared length counts the unescaped
//! bytes, so escape sequences count as one byte each. A serialized string
//! whose content is itself serialized data is migrated recursively, so inner
//! prefixes are fixed before the outer one is recomputed.
//!
//! Dumps are handled as bytes: binary columns and latin1 text pass through
//! unchanged.

use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Rewrites `from` to `to` in the dump file at `path`, in place.
pub fn migrate_file(path: &Path, from: &str, to: &str) -> Result<usize> {
    let dump = std::fs::read(path)?;
    let (migrated, replaced) = migrate_dump(&dump, from, to);
    std::fs::write(path, migrated)?;
    debug!("migrated {replaced} occurrence(s) of {from} to {to} in {}", path.display());
    Ok(replaced)
}

/// Replaces every occurrence of `from` with `to`, fixing the length prefix
/// of serialized strings whose content changed. Returns the migrated dump
/// and the number of replacements.
pub fn migrate_dump(dump: &[u8], from: &str, to: &str) -> (Vec<u8>, usize) {
    if from.is_empty() || from == to {
        return (dump.to_vec(), 0);
    }
    migrate(dump, from.as_bytes(), to.as_bytes())
}

fn migrate(text: &[u8], from: &[u8], to: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(text.len());
    let mut replaced = 0;
    // Start of the text not yet copied to `out`
    let mut pending = 0;
    let mut i = 0;

    while let Some(start) = find(text, b"s:", i) {
        match parse_serialized(text, start) {
            Some(token) => {
                replaced += replace_into(&mut out, &text[pending..start], from, to);

                let content = &text[token.content_start..token.content_end];
                let (migrated, hits) = migrate(content, from, to);
                // Escapes are untouched, so raw growth equals decoded growth
                let length = (token.length + migrated.len()).saturating_sub(content.len());
                out.extend_from_slice(format!("s:{length}:").as_bytes());
                out.extend_from_slice(token.quote);
                out.extend_from_slice(&migrated);
                out.extend_from_slice(token.quote);
                out.push(b';');
                replaced += hits;

                pending = token.end;
                i = token.end;
            }
            None => i = start + 2,
        }
    }

    replaced += replace_into(&mut out, &text[pending..], from, to);
    (out, replaced)
}

/// Position of the first `needle` in `haystack` at or after `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn replace_into(out: &mut Vec<u8>, text: &[u8], from: &[u8], to: &[u8]) -> usize {
    let mut hits = 0;
    let mut rest = text;
    while let Some(pos) = find(rest, from, 0) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(to);
        rest = &rest[pos + from.len()..];
        hits += 1;
    }
    out.extend_from_slice(rest);
    hits
}

/// A serialized string found in the dump.
struct SerializedString {
    length: usize,
    /// `"` or `\"`.
    quote: &'static [u8],
    content_start: usize,
    content_end: usize,
    /// Index just past the terminating `;`.
    end: usize,
}

/// Parses `s:<len>:"<content>";` (or the escaped-quote form) at `start`.
///
/// Returns `None` unless the content is exactly `len` bytes long and is
/// followed by the closing quote and `;`.
fn parse_serialized(bytes: &[u8], start: usize) -> Option<SerializedString> {
    let mut pos = start + 2;

    let digits_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == digits_start || bytes.get(pos) != Some(&b':') {
        return None;
    }
    let length: usize = std::str::from_utf8(&bytes[digits_start..pos]).ok()?.parse().ok()?;
    pos += 1;

    let rest = bytes.get(pos..)?;
    let (quote, escaped): (&'static [u8], bool) = if rest.starts_with(b"\\\"") {
        (b"\\\"", true)
    } else if rest.starts_with(b"\"") {
        (b"\"", false)
    } else {
        return None;
    };
    pos += quote.len();

    let content_start = pos;
    let mut decoded = 0;
    while decoded < length {
        match bytes.get(pos)? {
            b'\\' if escaped => {
                bytes.get(pos + 1)?;
                pos += 2;
            }
            _ => pos += 1,
        }
        decoded += 1;
    }
    let content_end = pos;

    if !bytes.get(content_end..)?.starts_with(quote) {
        return None;
    }
    pos += quote.len();
    if bytes.get(pos) != Some(&b';') {
        return None;
    }

    Some(SerializedString {
        length,
        quote,
        content_start,
        content_end,
        end: pos + 1,
    })
}
