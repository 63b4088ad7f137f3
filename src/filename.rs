//! Builds `Title - Author.epub` from (possibly missing) metadata.

use std::fmt;

use crate::sanitize::{sanitize, PLACEHOLDER};

/// Extension given to every renamed book
pub const EXTENSION: &str = "epub";

/// Stands in for a title we couldn't find
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Stands in for an author we couldn't find
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A sanitized title and author, ready to become a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameCandidate {
    title: String,
    author: String,
}

impl FilenameCandidate {
    /// Sanitizes both fragments, falling back to
    /// [`UNKNOWN_TITLE`] and [`UNKNOWN_AUTHOR`] for missing ones.
    ///
    /// [`UNKNOWN_TITLE`]: constant.UNKNOWN_TITLE.html
    /// [`UNKNOWN_AUTHOR`]: constant.UNKNOWN_AUTHOR.html
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: or_default(sanitize(title), UNKNOWN_TITLE),
            author: or_default(sanitize(author), UNKNOWN_AUTHOR),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }
}

impl fmt::Display for FilenameCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}.{}", self.title, self.author, EXTENSION)
    }
}

fn or_default(fragment: String, default: &str) -> String {
    if fragment.is_empty() || fragment == PLACEHOLDER {
        default.to_owned()
    } else {
        fragment
    }
}

/// Returns the new filename for a book with the given title and author.
pub fn generate(title: &str, author: &str) -> String {
    FilenameCandidate::new(title, author).to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_everything() {
        assert_eq!(generate("", ""), "Unknown Title - Unknown Author.epub");
        assert_eq!(generate(" \n ", "\t"), "Unknown Title - Unknown Author.epub");
    }

    #[test]
    fn sanitizes_both_halves() {
        assert_eq!(
            generate("My Book: Part 1", "Jane Doe"),
            "My Book_ Part 1 - Jane Doe.epub"
        );
        assert_eq!(
            generate("AC/DC?", "  Some   Body "),
            "AC_DC_ - Some Body.epub"
        );
    }

    #[test]
    fn one_side_missing() {
        assert_eq!(generate("Dune", ""), "Dune - Unknown Author.epub");
        assert_eq!(generate("", "Frank Herbert"), "Unknown Title - Frank Herbert.epub");
    }

    #[test]
    fn literal_unknown_is_treated_as_missing() {
        // Indistinguishable from a placeholder once sanitized.
        assert_eq!(generate("Unknown", "Unknown"), "Unknown Title - Unknown Author.epub");
    }

    #[test]
    fn candidate_exposes_fragments() {
        let candidate = FilenameCandidate::new("Dune", "Frank Herbert");
        assert_eq!(candidate.title(), "Dune");
        assert_eq!(candidate.author(), "Frank Herbert");
        assert_eq!(candidate.to_string(), "Dune - Frank Herbert.epub");
    }
}
