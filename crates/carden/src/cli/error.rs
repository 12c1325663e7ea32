//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use carden_types::DeckId;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Deck id does not resolve to a live deck
    pub fn deck_not_found(deck_id: DeckId) -> Self {
        Self::new(format!("Deck not found: {}", deck_id))
            .with_context("The deck does not exist or has been deleted")
            .with_suggestions([
                "TRY: Create a deck first: carden deck create --owner 1 --title \"My Deck\"".to_string(),
                format!("TRY: Check the id: carden deck info {}", deck_id),
            ])
    }

    /// Model credentials are missing
    pub fn missing_api_key(env_var: &str) -> Self {
        Self::new("Model provider is not configured")
            .with_context(format!("{} is not set or empty", env_var))
            .with_suggestions([
                format!("TRY: export {}=<your key>", env_var),
                "TRY: Validate with rules only: carden validate-topic --rules-only \"...\"".to_string(),
            ])
    }

    /// Database file could not be opened
    pub fn database_unavailable(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot open database: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Initialize Carden: carden init".to_string(),
                format!("TRY: Check permissions: ls -la {}", path.display()),
            ])
    }

    /// Unknown CEFR level on the command line
    pub fn invalid_level(level: &str) -> Self {
        Self::new(format!("Invalid CEFR level: '{}'", level))
            .with_suggestion("TRY: Use one of A1, A2, B1, B2, C1, C2")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
