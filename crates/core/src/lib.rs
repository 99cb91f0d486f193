pub mod brain;
pub mod cascade;
pub mod config;
pub mod image;
pub mod lms;
pub mod metrics;
pub mod testing;

pub use brain::{
    BrainConfig, BrainError, Classifier, ImageDescriber, LlmClassifier, LlmConfig, LlmProvider,
};
pub use cascade::{
    CourseTier, DecisionEvent, DecisionObserver, Resource, ResourceFinder, ResultEntry,
    SearchOutcome,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use image::ImageInput;
pub use lms::{CanvasClient, Catalog, LmsClient, LmsError, Module, ModuleItem};
