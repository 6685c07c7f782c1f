//! Revisioned cache values.

/// A cached value tagged with the policy revision it was derived from.
///
/// An entry without a value is a negative hit: the policy does not exist or
/// was deleted. Such entries carry [`Entry::NONEXISTENT_REVISION`] so that
/// any real revision replaces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    revision: i64,
    value: Option<T>,
}

impl<T> Entry<T> {
    /// Revision of values that never change; no other entry replaces them.
    pub const PERMANENT_REVISION: i64 = i64::MAX;

    /// Revision of negative entries.
    pub const NONEXISTENT_REVISION: i64 = i64::MIN;

    pub fn new(revision: i64, value: T) -> Self {
        Self {
            revision,
            value: Some(value),
        }
    }

    pub fn permanent(value: T) -> Self {
        Self::new(Self::PERMANENT_REVISION, value)
    }

    pub fn nonexistent() -> Self {
        Self {
            revision: Self::NONEXISTENT_REVISION,
            value: None,
        }
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_permanent(&self) -> bool {
        self.revision == Self::PERMANENT_REVISION
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// True if `self` may overwrite a slot currently holding `current`.
    pub fn supersedes(&self, current: &Entry<T>) -> bool {
        self.revision >= current.revision
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Entry<U> {
        Entry {
            revision: self.revision,
            value: self.value.map(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonexistent_is_superseded_by_any_revision() {
        let missing: Entry<&str> = Entry::nonexistent();
        assert!(!missing.exists());
        assert!(Entry::new(0, "v0").supersedes(&missing));
        assert!(Entry::new(-5, "v").supersedes(&missing));
        assert!(Entry::<&str>::nonexistent().supersedes(&missing));
    }

    #[test]
    fn test_permanent_is_never_superseded() {
        let permanent = Entry::permanent("static");
        assert!(permanent.is_permanent());
        assert!(!Entry::new(i64::MAX - 1, "newer?").supersedes(&permanent));
        assert!(!Entry::nonexistent().supersedes(&permanent));
    }

    #[test]
    fn test_equal_revision_supersedes() {
        assert!(Entry::new(3, "a").supersedes(&Entry::new(3, "b")));
        assert!(!Entry::new(2, "a").supersedes(&Entry::new(3, "b")));
    }

    #[test]
    fn test_map_keeps_revision() {
        let entry = Entry::new(7, 21).map(|v| v * 2);
        assert_eq!(entry.revision(), 7);
        assert_eq!(entry.value(), Some(&42));
        assert_eq!(Entry::<i32>::nonexistent().map(|v| v + 1).into_value(), None);
    }
}
