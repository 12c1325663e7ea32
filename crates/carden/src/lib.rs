//! Carden: validated flashcard generation with quota-aware persistence.
//!
//! A request flows through four stages:
//!
//! 1. **Validation** ([`validation`]): topic moderation by model, with a
//!    rule-based fallback.
//! 2. **Generation** ([`generation`]): one model call, then per-entry
//!    sanitizing of the returned cards.
//! 3. **Limits** ([`limits`]): deck capacity check before any model call.
//! 4. **Persistence** ([`persistence`]): deduplicated batch insert in one
//!    transaction.
//!
//! [`pipeline::PipelineController`] composes them and always answers with a
//! [`pipeline::PipelineResponse`].

pub mod config;
pub mod generation;
pub mod limits;
pub mod llm;
pub mod persistence;
pub mod pipeline;
pub mod prompt;
pub mod validation;

pub use config::{load_config, CardenConfig};
pub use generation::{GeneratedBatch, GenerationError, GenerationOrchestrator};
pub use limits::{DeckLimitGuard, LimitCheck};
pub use llm::{GeminiProvider, LlmError, MockModelProvider, ModelConfig, ModelProvider};
pub use persistence::{PersistenceCoordinator, PersistenceFault, SaveReport};
pub use pipeline::{
    PipelineController, PipelineOutcome, PipelineResponse, PipelineStats, StatsSnapshot, SubmissionReceipt,
};
pub use prompt::PromptBuilder;
pub use validation::{ModelAssessor, RuleBasedAssessor, TopicAssessment, TopicValidator};
