//! Pulls the title and author out of a package (OPF) document.
//!
//! This is deliberately not an XML parser. Package documents in the wild are
//! often malformed in ways that don't matter to us (bad namespaces, stray
//! entities, truncated manifests), so we look for the literal
//! `<dc:title ...>...</dc:title>` and `<dc:creator ...>...</dc:creator>` tags
//! and take the first of each. A field we can't find is left empty;
//! that's "unknown", not an error.

use log::*;
use memchr::memmem;

/// The title and author of a book, either of which may be empty
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    pub creator: String,
}

/// Scans a package document for its first `dc:title` and `dc:creator`.
///
/// Never fails. Invalid UTF-8 is replaced, and anything we can't make sense of
/// leaves the corresponding field empty.
pub fn extract(package: &[u8]) -> PackageMetadata {
    let document = String::from_utf8_lossy(package);
    let metadata = PackageMetadata {
        title: element_text(&document, "dc:title"),
        creator: element_text(&document, "dc:creator"),
    };
    debug!("Extracted {:?}", metadata);
    metadata
}

/// Returns the trimmed text of the first `<tag>` element in `document`,
/// or an empty string.
///
/// Text containing markup (a literal `<` or `>`) counts as not found.
/// XML entities are unescaped if they're well-formed and kept as-is otherwise.
fn element_text(document: &str, tag: &str) -> String {
    let closing_tag = format!("</{tag}>");

    let Some(start) = find_opening_tag(document, tag) else {
        trace!("No <{}> found", tag);
        return String::new();
    };
    let rest = &document[start..];
    let Some(close_at) = memmem::find(rest.as_bytes(), closing_tag.as_bytes()) else {
        debug!("<{}> is never closed", tag);
        return String::new();
    };
    // The element from its opening `<` through the `<` of its closing tag
    let element = &rest[..=close_at];

    let (Some(gt), Some(lt)) = (element.find('>'), element.rfind('<')) else {
        return String::new();
    };
    if lt <= gt {
        return String::new();
    }
    let raw = element[gt + 1..lt].trim();
    if raw.contains(['<', '>']) {
        debug!("<{}> contains markup; ignoring it", tag);
        return String::new();
    }

    match quick_xml::escape::unescape(raw) {
        // Entities may have unescaped to whitespace.
        Ok(text) => text.trim().to_owned(),
        Err(e) => {
            debug!("Keeping <{}> text verbatim: {}", tag, e);
            raw.to_owned()
        }
    }
}

/// Finds the first `<tag` that really opens a `tag` element,
/// i.e., isn't just the start of a longer name like `<dc:titles`.
fn find_opening_tag(document: &str, tag: &str) -> Option<usize> {
    let opening = format!("<{tag}");
    let bytes = document.as_bytes();
    memmem::find_iter(bytes, opening.as_bytes()).find(|&at| {
        matches!(
            bytes.get(at + opening.len()),
            Some(b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
        )
    })
}
