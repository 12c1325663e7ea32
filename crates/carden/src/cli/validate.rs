//! `carden validate-topic`: run topic moderation without generating.

use anyhow::Result;
use carden::config::CardenConfig;
use carden::validation::{ModelAssessor, TopicValidator};
use carden_types::ValidationOutcome;

use super::output::{print_json, print_table};

#[derive(Debug)]
pub struct ValidateArgs {
    pub topic: String,
    pub rules_only: bool,
    pub json: bool,
}

pub fn run(args: ValidateArgs, config: &CardenConfig) -> Result<()> {
    let validator = if args.rules_only {
        TopicValidator::rules_only()
    } else {
        let provider = super::build_provider(config)?;
        TopicValidator::new(Box::new(ModelAssessor::new(
            provider,
            config.model.validation_config(),
            config.model.timeout(),
        )))
    };

    super::block_on(run_async(validator, args))
}

async fn run_async(validator: TopicValidator, args: ValidateArgs) -> Result<()> {
    let outcome = validator.validate(&args.topic).await;
    if args.json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &ValidationOutcome) {
    let verdict = if outcome.approved { "APPROVED" } else { "REJECTED" };
    let mut rows = vec![
        vec!["Verdict".to_string(), verdict.to_string()],
        vec!["Topic".to_string(), outcome.sanitized_topic.clone()],
        vec!["Safety".to_string(), outcome.safety.to_string()],
        vec!["Quality".to_string(), outcome.quality.to_string()],
        vec!["Confidence".to_string(), format!("{:.2}", outcome.confidence)],
        vec!["Source".to_string(), format!("{:?}", outcome.source)],
        vec!["Message".to_string(), outcome.message.clone()],
    ];
    if !outcome.warnings.is_empty() {
        rows.push(vec!["Warnings".to_string(), outcome.warnings.join("; ")]);
    }
    if !outcome.suggestions.is_empty() {
        rows.push(vec!["Suggestions".to_string(), outcome.suggestions.join(", ")]);
    }
    print_table(&["Field", "Value"], rows);
}
