//! Byte strings with explicit ownership.
//!
//! A string node either owns its bytes or borrows them from a caller-supplied
//! buffer that outlives the tree. Making the distinction a sum type (rather
//! than a "don't free" flag) lets the borrow checker rule out use-after-free.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A byte string held by a [`crate::Variant`].
///
/// Codec decoding always produces `Owned` strings; `Borrowed` is for trees
/// built by hand over data the caller keeps alive.
#[derive(Clone)]
pub enum VariantStr<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
}

impl<'a> VariantStr<'a> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VariantStr::Owned(v) => v,
            VariantStr::Borrowed(s) => s,
        }
    }

    /// The bytes as UTF-8 text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Copies a borrowed string into an owned one, detaching it from the
    /// source buffer's lifetime.
    pub fn into_owned(self) -> VariantStr<'static> {
        match self {
            VariantStr::Owned(v) => VariantStr::Owned(v),
            VariantStr::Borrowed(s) => VariantStr::Owned(s.to_vec()),
        }
    }
}

impl<'a, 'b> PartialEq<VariantStr<'b>> for VariantStr<'a> {
    fn eq(&self, other: &VariantStr<'b>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for VariantStr<'_> {}

impl PartialOrd for VariantStr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte-lexicographic order; this is the order canonical binary encoding
/// sorts dict keys into.
impl Ord for VariantStr<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for VariantStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) => write!(f, "{s:?}"),
            Err(_) => write!(f, "{:?}", self.as_bytes()),
        }
    }
}

impl From<String> for VariantStr<'static> {
    fn from(s: String) -> Self {
        VariantStr::Owned(s.into_bytes())
    }
}

impl From<Vec<u8>> for VariantStr<'static> {
    fn from(v: Vec<u8>) -> Self {
        VariantStr::Owned(v)
    }
}

impl<'a> From<&'a str> for VariantStr<'a> {
    fn from(s: &'a str) -> Self {
        VariantStr::Borrowed(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for VariantStr<'a> {
    fn from(s: &'a [u8]) -> Self {
        VariantStr::Borrowed(s)
    }
}

impl<'a> From<Cow<'a, str>> for VariantStr<'a> {
    fn from(s: Cow<'a, str>) -> Self {
        match s {
            Cow::Borrowed(s) => VariantStr::Borrowed(s.as_bytes()),
            Cow::Owned(s) => VariantStr::Owned(s.into_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_ownership() {
        let owned = VariantStr::Owned(b"boat".to_vec());
        let borrowed = VariantStr::Borrowed(b"boat");
        assert_eq!(owned, borrowed);
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let a = VariantStr::Borrowed(b"bar");
        let b = VariantStr::Borrowed(b"foo");
        assert!(a < b);

        // Shorter prefix sorts first.
        let c = VariantStr::Borrowed(b"fo");
        assert!(c < b);
    }

    #[test]
    fn test_into_owned_detaches() {
        let buf = b"hello".to_vec();
        let s = VariantStr::Borrowed(&buf).into_owned();
        assert_eq!(s.as_bytes(), b"hello");
        assert!(matches!(s, VariantStr::Owned(_)));
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        let s = VariantStr::Owned(vec![0xFF, 0xFE]);
        assert!(s.as_str().is_none());
        assert_eq!(s.len(), 2);
    }
}
