//! Cascade - routes a question to LMS resources.
//!
//! Three narrowing stages, each asking the classifier first and falling back
//! to deterministic rules when the reply is missing, malformed, or names
//! something that does not exist:
//!
//! ```text
//! query (+ image text)
//!   └─► CourseResolver   exact → word overlap → substring → keyword → first
//!         └─► ModuleResolver   proposals ∪ query words → first N
//!               └─► ResourceRanker (per module)   scored indices → first N
//!                     └─► stable sort by score, descending
//! ```
//!
//! [`ResourceFinder`] runs the whole thing. Terminal "no data" conditions
//! come back as [`SearchOutcome`] variants, never as errors.

mod course;
mod events;
mod module;
pub mod name_matcher;
mod observer;
mod pipeline;
mod resource;

pub use course::{pick_course, CourseResolution, CourseResolver};
pub use events::{CourseTier, DecisionEnvelope, DecisionEvent, OutcomeKind, Stage};
pub use module::{repair_proposals, select_modules, ModuleResolver, ModuleSelection, MAX_MODULE_PROPOSALS};
pub use observer::{ChannelObserver, DecisionObserver, TracingObserver};
pub use pipeline::{ErrorEntry, ResourceFinder, ResultEntry, SearchOutcome, NO_COURSES_DETAILS};
pub use resource::{
    default_ranking, select_items, RankedModule, RankingScope, Resource, ResourceRanker,
    MAX_RESOURCE_INDICES, MISSING_SCORE,
};

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why a collaborator call produced nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),
}

/// Run a collaborator call under a deadline.
pub(crate) async fn bounded<T, E, F>(deadline: Duration, call: F) -> Result<T, CallError>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallError::Failed(e.to_string())),
        Err(_) => Err(CallError::Timeout(deadline)),
    }
}
