//! Highlight regions supplied by the host application
//!
//! A vertices group is one named polygon in normalized page space, tagged to
//! a single zero-based page or to every page. Groups are immutable once
//! handed to the viewer; a new set replaces the old one wholesale.

use crate::geometry::NormalizedPoint;
use crate::polygon;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The page (or pages) a group belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageTarget", into = "RawPageTarget")]
pub enum PageTarget {
    /// Zero-based page index
    Page(u32),
    /// Shown on every page
    All,
}

impl PageTarget {
    /// Whether this target covers the one-based `page_number`.
    pub fn matches(self, page_number: u32) -> bool {
        match self {
            PageTarget::All => true,
            PageTarget::Page(index) => page_number >= 1 && index == page_number - 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPageTarget {
    Index(u32),
    Word(String),
}

impl TryFrom<RawPageTarget> for PageTarget {
    type Error = String;

    fn try_from(raw: RawPageTarget) -> Result<Self, Self::Error> {
        match raw {
            RawPageTarget::Index(index) => Ok(PageTarget::Page(index)),
            RawPageTarget::Word(word) if word.eq_ignore_ascii_case("all") => Ok(PageTarget::All),
            RawPageTarget::Word(word) => {
                Err(format!("page must be an index or \"all\", got {word:?}"))
            }
        }
    }
}

impl From<PageTarget> for RawPageTarget {
    fn from(target: PageTarget) -> Self {
        match target {
            PageTarget::Page(index) => RawPageTarget::Index(index),
            PageTarget::All => RawPageTarget::Word("all".to_owned()),
        }
    }
}

/// One highlightable region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticesGroup {
    pub page: PageTarget,
    /// Label for the region; may be empty
    #[serde(default)]
    pub key: String,
    pub vertices: Vec<NormalizedPoint>,
}

impl VerticesGroup {
    pub fn new(page: PageTarget, key: impl Into<String>, vertices: Vec<NormalizedPoint>) -> Self {
        Self { page, key: key.into(), vertices }
    }

    /// Whether the group is drawn on the one-based `page_number`.
    pub fn is_on_page(&self, page_number: u32) -> bool {
        self.page.matches(page_number)
    }

    /// Point-in-polygon test against this group's outline.
    pub fn contains(&self, point: NormalizedPoint) -> bool {
        polygon::contains(point, &self.vertices)
    }
}

/// One-based page the viewer should show for a freshly supplied set.
///
/// The first group's page wins. An empty set goes to page 1; a set whose
/// first group spans every page keeps `current_page`.
pub fn target_page(groups: &[VerticesGroup], current_page: u32) -> u32 {
    match groups.first().map(|group| group.page) {
        Some(PageTarget::Page(index)) => index.saturating_add(1),
        Some(PageTarget::All) => current_page,
        None => 1,
    }
}

/// Groups that contain `point` among those on `page_number`.
pub fn hits<'a>(
    groups: &'a [VerticesGroup],
    page_number: u32,
    point: NormalizedPoint,
) -> Vec<&'a VerticesGroup> {
    groups.iter().filter(|group| group.is_on_page(page_number) && group.contains(point)).collect()
}

/// Parse a JSON array of groups.
pub fn from_json(json: &str) -> serde_json::Result<Vec<VerticesGroup>> {
    serde_json::from_str(json)
}

/// Read a JSON array of groups from a file.
pub fn from_json_file(path: &Path) -> std::io::Result<Vec<VerticesGroup>> {
    let contents = std::fs::read_to_string(path)?;
    from_json(&contents).map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(page: PageTarget, key: &str) -> VerticesGroup {
        VerticesGroup::new(
            page,
            key,
            vec![
                NormalizedPoint::new(0.1, 0.1),
                NormalizedPoint::new(0.3, 0.1),
                NormalizedPoint::new(0.3, 0.3),
                NormalizedPoint::new(0.1, 0.3),
            ],
        )
    }

    #[test]
    fn test_page_target_parses_index_and_all() {
        let groups = from_json(
            r#"[
                {"page": 2, "key": "a", "vertices": [{"x": 0.1, "y": 0.2}]},
                {"page": "all", "key": "b", "vertices": []},
                {"page": 0, "vertices": []}
            ]"#,
        )
        .unwrap();

        assert_eq!(groups[0].page, PageTarget::Page(2));
        assert_eq!(groups[0].vertices, vec![NormalizedPoint::new(0.1, 0.2)]);
        assert_eq!(groups[1].page, PageTarget::All);
        assert_eq!(groups[2].key, "");
    }

    #[test]
    fn test_page_target_rejects_other_words() {
        assert!(from_json(r#"[{"page": "first", "vertices": []}]"#).is_err());
    }

    #[test]
    fn test_page_target_serializes_back() {
        let json = serde_json::to_string(&PageTarget::All).unwrap();
        assert_eq!(json, "\"all\"");
        let json = serde_json::to_string(&PageTarget::Page(4)).unwrap();
        assert_eq!(json, "4");
    }

    #[test]
    fn test_page_matching_is_one_based() {
        let group = square(PageTarget::Page(0), "a");
        assert!(group.is_on_page(1));
        assert!(!group.is_on_page(2));
        assert!(!group.is_on_page(0));

        let everywhere = square(PageTarget::All, "b");
        assert!(everywhere.is_on_page(1));
        assert!(everywhere.is_on_page(7));
    }

    #[test]
    fn test_target_page() {
        assert_eq!(target_page(&[], 3), 1);
        assert_eq!(target_page(&[square(PageTarget::Page(0), "a")], 2), 1);
        assert_eq!(target_page(&[square(PageTarget::Page(4), "a")], 2), 5);
        assert_eq!(target_page(&[square(PageTarget::All, "a")], 2), 2);
    }

    #[test]
    fn test_hits_filters_by_page_and_containment() {
        let groups = vec![
            square(PageTarget::Page(0), "first"),
            square(PageTarget::Page(1), "second"),
            square(PageTarget::All, "everywhere"),
        ];

        let found = hits(&groups, 1, NormalizedPoint::new(0.2, 0.2));
        let keys: Vec<&str> = found.iter().map(|group| group.key.as_str()).collect();
        assert_eq!(keys, vec!["first", "everywhere"]);

        assert!(hits(&groups, 1, NormalizedPoint::new(0.5, 0.5)).is_empty());
    }
}
