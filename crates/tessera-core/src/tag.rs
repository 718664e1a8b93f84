//! Tags and the process-wide tag selection capability

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque named label used to include or exclude test units
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Decides whether a unit carrying a given tag set should run under the
/// current tag selection.
///
/// Implementations must be side-effect free: [`TestUnit::activate`] calls this
/// once per check and never caches the answer.
///
/// [`TestUnit::activate`]: crate::TestUnit::activate
pub trait TagFilter: Send + Sync {
    fn is_active(&self, tags: &BTreeSet<Tag>) -> bool;
}

impl<F> TagFilter for F
where
    F: Fn(&BTreeSet<Tag>) -> bool + Send + Sync,
{
    fn is_active(&self, tags: &BTreeSet<Tag>) -> bool {
        self(tags)
    }
}

/// Include/exclude tag selection
///
/// A tag set is active when it shares no tag with `exclude`, and either
/// `include` is empty or the set shares at least one tag with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    include: BTreeSet<Tag>,
    exclude: BTreeSet<Tag>,
}

impl TagSelection {
    /// Selection that admits every tag set
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(
        include: impl IntoIterator<Item = Tag>,
        exclude: impl IntoIterator<Item = Tag>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn with_include(mut self, tag: impl Into<Tag>) -> Self {
        self.include.insert(tag.into());
        self
    }

    pub fn with_exclude(mut self, tag: impl Into<Tag>) -> Self {
        self.exclude.insert(tag.into());
        self
    }

    pub fn include(&self) -> &BTreeSet<Tag> {
        &self.include
    }

    pub fn exclude(&self) -> &BTreeSet<Tag> {
        &self.exclude
    }

    /// Parse a comma-separated tag list such as `"fast, db"`.
    /// Whitespace is trimmed and empty entries are dropped.
    pub fn parse_list(list: &str) -> BTreeSet<Tag> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Tag::from)
            .collect()
    }
}

impl TagFilter for TagSelection {
    fn is_active(&self, tags: &BTreeSet<Tag>) -> bool {
        if !self.exclude.is_disjoint(tags) {
            return false;
        }
        self.include.is_empty() || !self.include.is_disjoint(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tags(names: &[&str]) -> BTreeSet<Tag> {
        names.iter().map(|n| Tag::from(*n)).collect()
    }

    #[rstest]
    #[case(&[], &[], &[], true)]
    #[case(&[], &[], &["slow"], true)]
    #[case(&[], &["slow"], &["slow"], false)]
    #[case(&[], &["slow"], &["fast", "slow"], false)]
    #[case(&["fast"], &[], &["fast"], true)]
    #[case(&["fast"], &[], &["db"], false)]
    #[case(&["fast"], &[], &[], false)]
    #[case(&["fast"], &["db"], &["fast", "db"], false)]
    fn test_selection_activity(
        #[case] include: &[&str],
        #[case] exclude: &[&str],
        #[case] unit_tags: &[&str],
        #[case] expected: bool,
    ) {
        let selection = TagSelection::new(tags(include), tags(exclude));
        assert_eq!(selection.is_active(&tags(unit_tags)), expected);
    }

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(TagSelection::parse_list(" fast, ,db ,"), tags(&["db", "fast"]));
        assert!(TagSelection::parse_list("").is_empty());
    }

    #[test]
    fn test_closure_filter() {
        let only_untagged = |t: &BTreeSet<Tag>| t.is_empty();
        assert!(only_untagged.is_active(&BTreeSet::new()));
        assert!(!only_untagged.is_active(&tags(&["slow"])));
    }

    #[test]
    fn test_tags_deduplicate() {
        let set = tags(&["slow", "slow", "db"]);
        assert_eq!(set.len(), 2);
    }
}
