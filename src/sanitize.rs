//! Turns arbitrary metadata text into something safe to put in a filename.

/// What [`sanitize()`] returns when there's nothing left to work with
///
/// [`sanitize()`]: fn.sanitize.html
pub const PLACEHOLDER: &str = "Unknown";

/// Longest fragment [`sanitize()`] produces, in bytes of UTF-8
///
/// Two fragments plus the separator and extension stay well under
/// the usual 255-byte limit on a file name.
///
/// [`sanitize()`]: fn.sanitize.html
pub const MAX_BYTES: usize = 100;

/// Characters that are invalid in a path on at least one common filesystem
pub const FORBIDDEN: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maps `text` to a filename fragment.
///
/// 1. Each [`FORBIDDEN`] character becomes `_`.
/// 2. Control characters (below U+0020) are dropped.
/// 3. Runs of whitespace become a single space; the ends are trimmed.
/// 4. The result is cut to at most [`MAX_BYTES`] bytes (no word boundaries),
///    backing up to the start of any character the cut would split,
///    and any trailing space the cut exposes is trimmed.
///
/// Empty input, or input with nothing left after the steps above,
/// gives [`PLACEHOLDER`].
/// Sanitizing a sanitized string gives the same string back.
///
/// [`FORBIDDEN`]: constant.FORBIDDEN.html
/// [`MAX_BYTES`]: constant.MAX_BYTES.html
/// [`PLACEHOLDER`]: constant.PLACEHOLDER.html
pub fn sanitize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .filter(|c| *c >= ' ')
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut end = collapsed.len().min(MAX_BYTES);
    while !collapsed.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = collapsed[..end].trim_end();

    if truncated.is_empty() {
        PLACEHOLDER.to_owned()
    } else {
        truncated.to_owned()
    }
}
