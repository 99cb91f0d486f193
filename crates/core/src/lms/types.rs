//! Course catalog and module data as the cascade sees it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque LMS course identifier.
pub type CourseId = u64;

/// Opaque LMS module identifier.
pub type ModuleId = u64;

/// One course in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub id: CourseId,
}

/// Mapping of course name to course id for one account.
///
/// Names are unique. Iteration order is the order in which names were first
/// inserted, which is the order the LMS listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a course. A repeated name overwrites the id but keeps its
    /// original position.
    pub fn insert(&mut self, name: impl Into<String>, id: CourseId) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.id = id,
            None => self.entries.push(CatalogEntry { name, id }),
        }
    }

    /// Look up a course id by exact name.
    pub fn get(&self, name: &str) -> Option<CourseId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Course names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, CourseId)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (S, CourseId)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (name, id) in iter {
            catalog.insert(name, id);
        }
        catalog
    }
}

/// A module within one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
}

impl Module {
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Item type tag from the LMS vocabulary ("Page", "Assignment", "File", ...).
///
/// The vocabulary is defined by the LMS and open-ended, so this is a string
/// newtype rather than an enum. Only "File" carries special behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemType(String);

impl ItemType {
    pub const FILE: &'static str = "File";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True only for the exact tag "File".
    pub fn is_file(&self) -> bool {
        self.0 == Self::FILE
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// An item inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleItem {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    /// Direct link to the item in the LMS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Content reference, used to resolve a download URL for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<u64>,
}

impl ModuleItem {
    /// True when this item is a file that can be resolved to a download URL.
    pub fn resolvable_file(&self) -> Option<u64> {
        match (&self.item_type, self.content_ref) {
            (Some(t), Some(content_ref)) if t.is_file() => Some(content_ref),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_preserves_insertion_order() {
        let catalog: Catalog = [("Calculus I", 10), ("Linear Algebra", 11), ("Biology", 3)]
            .into_iter()
            .collect();

        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["Calculus I", "Linear Algebra", "Biology"]);
    }

    #[test]
    fn test_catalog_duplicate_name_overwrites_id_in_place() {
        let mut catalog = Catalog::new();
        catalog.insert("A", 1);
        catalog.insert("B", 2);
        catalog.insert("A", 7);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("A"), Some(7));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_catalog_lookup_is_exact() {
        let catalog: Catalog = [("Linear Algebra", 11)].into_iter().collect();
        assert_eq!(catalog.get("Linear Algebra"), Some(11));
        assert_eq!(catalog.get("linear algebra"), None);
        assert_eq!(catalog.get("Linear"), None);
    }

    #[test]
    fn test_item_type_file_is_case_sensitive() {
        assert!(ItemType::new("File").is_file());
        assert!(!ItemType::new("file").is_file());
        assert!(!ItemType::new("Page").is_file());
    }

    #[test]
    fn test_resolvable_file_requires_type_and_reference() {
        let mut item = ModuleItem {
            id: 1,
            title: Some("Slides".to_string()),
            item_type: Some(ItemType::new("File")),
            url: None,
            content_ref: Some(42),
        };
        assert_eq!(item.resolvable_file(), Some(42));

        item.content_ref = None;
        assert_eq!(item.resolvable_file(), None);

        item.content_ref = Some(42);
        item.item_type = Some(ItemType::new("Page"));
        assert_eq!(item.resolvable_file(), None);
    }
}
