//! Shared types for the Carden card generation pipeline.
//!
//! These types are the single source of truth for requests, generated cards
//! and validation outcomes. The storage layer and the pipeline both use them;
//! nothing in this crate performs I/O.

mod card;
mod dedup;
mod language;
mod request;
mod validation;

pub use card::{CandidateCard, Difficulty, ItemSkip, MAX_PRONUNCIATION_CHARS, MAX_SIDE_CHARS};
pub use dedup::{normalize_side, DedupKey, DEDUP_SEPARATOR};
pub use language::{language_name, SUPPORTED_LANGUAGES};
pub use request::{CefrLevel, GenerationRequest};
pub use validation::{QualityLevel, SafetyLevel, ValidationOutcome, ValidationSource};

/// Identifier of a deck row.
pub type DeckId = i64;

/// Opaque identifier of a deck owner.
pub type OwnerId = i64;
