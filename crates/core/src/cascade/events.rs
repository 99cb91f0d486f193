use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stage of a search, used to label failures and fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Image,
    Catalog,
    Course,
    ModuleList,
    Modules,
    Items,
    Resources,
    FileUrl,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Image => "image",
            Stage::Catalog => "catalog",
            Stage::Course => "course",
            Stage::ModuleList => "module_list",
            Stage::Modules => "modules",
            Stage::Items => "items",
            Stage::Resources => "resources",
            Stage::FileUrl => "file_url",
        }
    }

    /// Which collaborator a failure in this stage came from.
    pub fn collaborator(&self) -> &'static str {
        match self {
            Stage::Image => "describer",
            Stage::Course | Stage::Modules | Stage::Resources => "classifier",
            Stage::Catalog | Stage::ModuleList | Stage::Items | Stage::FileUrl => "lms",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule that picked the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTier {
    /// Classifier proposal is a catalog key.
    Exact,
    /// Query shares enough long words with the course name.
    WordOverlap,
    /// Proposal and course name contain one another.
    Substring,
    /// A long query word appears in the course name.
    Keyword,
    /// First course in the catalog.
    Default,
}

impl CourseTier {
    /// True for every tier except an exact classifier hit.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, CourseTier::Exact)
    }
}

/// Final outcome label of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Found,
    NoCourses,
    NoModules,
    NoResources,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Found => "found",
            OutcomeKind::NoCourses => "no_courses",
            OutcomeKind::NoModules => "no_modules",
            OutcomeKind::NoResources => "no_resources",
        }
    }
}

/// Per-stage decisions taken during one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionEvent {
    ImageFused {
        description: String,
        query: String,
    },
    CourseResolved {
        course: String,
        tier: CourseTier,
    },
    ModulesResolved {
        modules: Vec<String>,
        fallback_used: bool,
    },
    ResourcesRanked {
        module: String,
        count: usize,
        fallback_used: bool,
    },
    CollaboratorFailed {
        stage: Stage,
        error: String,
    },
    SearchFinished {
        outcome: OutcomeKind,
        count: usize,
    },
}

/// A decision event stamped with its search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEnvelope {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub event: DecisionEvent,
}

impl DecisionEnvelope {
    pub fn new(request_id: Uuid, event: DecisionEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            event,
        }
    }
}
