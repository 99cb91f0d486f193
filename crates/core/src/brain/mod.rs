//! Brain - the language-model collaborators used by the cascade.
//!
//! The cascade never trusts what comes out of here. Every reply is checked
//! against the real catalog, module list or item list, and any error is
//! turned into a heuristic fallback by the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Brain                             │
//! │                                                          │
//! │  ┌──────────────────────────┐  ┌──────────────────────┐  │
//! │  │     Classifier Trait     │  │ ImageDescriber Trait │  │
//! │  │  ┌────────────────────┐  │  │                      │  │
//! │  │  │   LlmClassifier    │──┼──┼──────────────────────┤  │
//! │  │  ├────────────────────┤  │  └──────────────────────┘  │
//! │  │  │UnconfiguredClassif.│  │                            │
//! │  │  └────────────────────┘  │                            │
//! │  └────────────┬─────────────┘                            │
//! │               │                                          │
//! │  ┌────────────▼─────────────────────────────────────┐    │
//! │  │                LlmClient Trait                   │    │
//! │  │  GeminiClient    AnthropicClient    OllamaClient │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hivemind_core::brain::{create_llm_client, LlmClassifier};
//!
//! let client = create_llm_client(&llm_config)?;
//! let classifier = Arc::new(LlmClassifier::new(client));
//! let reply = classifier.classify_course("gram schmidt", &["Linear Algebra"]).await?;
//! ```

mod config;
mod llm;
mod llm_classifier;
mod traits;
mod types;

// LLM client types
pub use llm::{
    create_llm_client, extract_json_object, parse_json_reply, AnthropicClient, CompletionRequest,
    CompletionResponse, GeminiClient, LlmClient, LlmError, LlmUsage, OllamaClient,
};

// Configuration types
pub use config::{BrainConfig, LlmConfig, LlmProvider};

// Core traits
pub use traits::{BrainError, Classifier, ImageDescriber, UnconfiguredClassifier};

// LLM implementation
pub use llm_classifier::{LlmClassifier, LlmClassifierConfig, RECOVERED_COURSE_CONFIDENCE};

// Reply types
pub use types::{CourseClassification, ModuleClassification, RelevanceResult};
