//! Title normalization.
//!
//! A book title such as `Other Book Notebook` is turned into the key
//! `other-book-notebook`, which names both the dedup entry and the output
//! file.
//!
//! [`denormalize`] is for display only. It is lossy: dashes that were in the
//! original title come back as spaces, casing is lost, and a title that
//! really ends in the word "notebook" loses that word.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Word stripped from the end of a key by [`denormalize`].
const NOTEBOOK_SUFFIX: &str = "notebook";

/// Canonical lowercase, dash-separated form of a title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the key names a single file inside one directory: not
    /// blank, no path separator or NUL, and not `.`, `..` or a root.
    #[must_use]
    pub fn is_file_stem(&self) -> bool {
        let key = self.0.as_str();
        if key.trim().is_empty() || key.contains(['/', '\\', '\0']) {
            return false;
        }
        let mut components = Path::new(key).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }

    /// Consumes the key, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NormalizedKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lowercases the title and replaces each space with a dash.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedKey {
    NormalizedKey(raw.to_lowercase().replace(' ', "-"))
}

/// Replaces dashes with spaces and drops a trailing `notebook` word.
///
/// Only a whole word is dropped, together with the one space before it:
/// `my-ebooknotebook` is left as `my ebooknotebook`, and `a--notebook`
/// becomes `a ` rather than `a`.
#[must_use]
pub fn denormalize(key: &str) -> String {
    let spaced = key.replace('-', " ");
    match spaced.strip_suffix(NOTEBOOK_SUFFIX) {
        Some("") => String::new(),
        Some(rest) => rest
            .strip_suffix(' ')
            .map_or_else(|| spaced.clone(), str::to_string),
        None => spaced,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Other Book Notebook").as_str(), "other-book-notebook");
        assert_eq!(normalize("Some Book").as_str(), "some-book");
        assert_eq!(normalize("already-normal").as_str(), "already-normal");
    }

    #[test]
    fn test_normalize_keeps_other_whitespace() {
        assert_eq!(normalize("Tab\tSeparated").as_str(), "tab\tseparated");
        assert_eq!(normalize("Two  Spaces").as_str(), "two--spaces");
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize("some-book"), "some book");
        assert_eq!(denormalize("other-book-notebook"), "other book");
    }

    #[test]
    fn test_denormalize_only_whole_word() {
        assert_eq!(denormalize("my-ebooknotebook"), "my ebooknotebook");
        assert_eq!(denormalize("notebook"), "");
    }

    #[test]
    fn test_denormalize_strips_one_space() {
        assert_eq!(denormalize("a--notebook"), "a ");
        assert_eq!(denormalize("-notebook"), "");
    }

    #[test]
    fn test_file_stem() {
        assert!(normalize("Other Book Notebook").is_file_stem());
        assert!(normalize("..Dots In Front").is_file_stem());

        assert!(!normalize("Either/Or").is_file_stem());
        assert!(!normalize("../escaped").is_file_stem());
        assert!(!normalize("/etc/passwd").is_file_stem());
        assert!(!normalize("back\\slash").is_file_stem());
        assert!(!normalize("..").is_file_stem());
        assert!(!normalize(".").is_file_stem());
        assert!(!normalize("").is_file_stem());
        assert!(!normalize("\t").is_file_stem());
    }

    #[test]
    fn test_denormalize_loses_real_notebook_title() {
        // A book actually called "The Lab Notebook" cannot be recovered.
        let key = normalize("The Lab Notebook");
        assert_eq!(denormalize(key.as_str()), "the lab");
    }

    #[test]
    fn test_denormalize_loses_dashes() {
        let key = normalize("Catch-22");
        assert_eq!(denormalize(key.as_str()), "catch 22");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(title in "[A-Za-z0-9 '.,:-]{1,48}") {
            let once = normalize(&title);
            let twice = normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn denormalize_round_trips_without_notebook(words in proptest::collection::vec("[A-Za-z]{1,10}", 1..6)) {
            prop_assume!(!words.last().unwrap().eq_ignore_ascii_case("notebook"));
            let title = words.join(" ");
            prop_assert_eq!(denormalize(normalize(&title).as_str()), title.to_lowercase());
        }
    }
}
