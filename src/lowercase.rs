//! Type-safety wrapper for names that have been case-folded for comparison.

use std::borrow::{Borrow, Cow};

/// Wraps a string (either owned or `&str`) and guarantees that it's lowercase.
///
/// Name lookups compare case-insensitively, so both the wanted name and the table cells are
/// passed through this type. Interfaces that expect folded names declare it in their argument
/// type, and the caller chooses whether that costs an allocation.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lowercase<'a>(Cow<'a, str>);

impl<'a> Lowercase<'a> {
    /// Take a string and return the lowercased version.
    pub fn new(s: &'a str) -> Self {
        // Avoid allocating if it's not necessary. Scripts without case (such as hangul) are
        // already in folded form.
        if s.chars().any(char::is_uppercase) {
            Lowercase(Cow::Owned(s.to_lowercase()))
        } else {
            Lowercase(Cow::Borrowed(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_owned(self) -> Lowercase<'static> {
        Lowercase(Cow::Owned(self.0.into_owned()))
    }
}

impl Borrow<str> for Lowercase<'_> {
    fn borrow(&self) -> &str {
        &self.0
    }
}
