//! Testing utilities and mock implementations.
//!
//! Mock implementations of every collaborator trait, so the cascade can be
//! exercised end to end without an LMS or a language model.
//!
//! # Example
//!
//! ```rust,ignore
//! use hivemind_core::testing::{fixtures, MockClassifier, MockLms, RecordingObserver};
//!
//! let lms = Arc::new(MockLms::new());
//! lms.set_catalog(fixtures::sample_catalog()).await;
//!
//! let classifier = Arc::new(MockClassifier::new());
//! let observer = Arc::new(RecordingObserver::new());
//!
//! let finder = ResourceFinder::new(lms, classifier, BrainConfig::default())
//!     .with_observer(observer.clone());
//! ```

mod mock_classifier;
mod mock_lms;
mod recording_observer;

pub use mock_classifier::{MockClassifier, MockDescriber, RecordedClassification, RecordedScoring};
pub use mock_lms::MockLms;
pub use recording_observer::RecordingObserver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::lms::{Catalog, ItemType, Module, ModuleItem};

    /// `{"Calculus I": 10, "Linear Algebra": 11}`
    pub fn sample_catalog() -> Catalog {
        [("Calculus I", 10), ("Linear Algebra", 11)].into_iter().collect()
    }

    /// Modules "Week 1" through "Week n", ids 1 through n.
    pub fn weeks(n: u64) -> Vec<Module> {
        (1..=n).map(|i| Module::new(i, format!("Week {}", i))).collect()
    }

    /// An item with a type tag and an LMS link.
    pub fn item(id: u64, title: &str, item_type: &str) -> ModuleItem {
        ModuleItem {
            id,
            title: Some(title.to_string()),
            item_type: Some(ItemType::from(item_type)),
            url: Some(format!("https://canvas.example/items/{}", id)),
            content_ref: None,
        }
    }

    pub fn page_item(id: u64, title: &str) -> ModuleItem {
        item(id, title, "Page")
    }

    /// A "File" item whose download URL resolves through `content_ref`.
    pub fn file_item(id: u64, title: &str, content_ref: u64) -> ModuleItem {
        ModuleItem {
            content_ref: Some(content_ref),
            ..item(id, title, ItemType::FILE)
        }
    }
}
