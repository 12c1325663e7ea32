//! `carden generate`: run the full pipeline for one deck.

use anyhow::Result;
use carden::config::CardenConfig;
use carden::{ModelProvider, PipelineController, PipelineResponse};
use carden_types::{CefrLevel, DeckId, GenerationRequest, OwnerId};
use std::sync::Arc;

use super::error::HelpfulError;
use super::output::{join_list, print_json, print_table, truncate};

#[derive(Debug)]
pub struct GenerateArgs {
    pub deck: DeckId,
    pub topic: String,
    pub count: Option<u32>,
    pub owner: Option<OwnerId>,
    pub source: String,
    pub target: String,
    pub level: Option<String>,
    pub keywords: Vec<String>,
    pub no_examples: bool,
    pub no_pronunciation: bool,
    pub background: bool,
    pub json: bool,
}

impl GenerateArgs {
    fn to_request(&self, config: &CardenConfig) -> Result<GenerationRequest> {
        let count = self.count.unwrap_or(config.generation.default_card_count);
        let mut request = GenerationRequest::new(self.deck, self.topic.clone(), count);
        request.source_language = self.source.clone();
        request.target_language = self.target.clone();
        request.cefr_level = match &self.level {
            Some(level) => Some(
                level
                    .parse::<CefrLevel>()
                    .map_err(|_| HelpfulError::invalid_level(level))?,
            ),
            None => None,
        };
        if !self.keywords.is_empty() {
            request.keywords = Some(self.keywords.clone());
        }
        request.include_examples = !self.no_examples;
        request.include_pronunciation = !self.no_pronunciation;
        Ok(request)
    }
}

pub fn run(args: GenerateArgs, config: &CardenConfig) -> Result<()> {
    let request = args.to_request(config)?;
    let provider = super::build_provider(config)?;

    super::block_on(run_async(args, request, provider, config))
}

async fn run_async(
    args: GenerateArgs,
    request: GenerationRequest,
    provider: Arc<dyn ModelProvider>,
    config: &CardenConfig,
) -> Result<()> {
    let db = super::open_database(config).await?;
    let controller = Arc::new(PipelineController::from_config(config, provider, Arc::new(db.clone())));

    let response = if args.background {
        let (receipt, handle) = controller.submit_background(request, args.owner);
        if !args.json {
            println!(
                "Submitted {} cards for deck {} ({})",
                receipt.requested_count, receipt.deck_id, receipt.status
            );
        }
        handle.await?
    } else {
        controller.run(&request, args.owner).await
    };

    if args.json {
        print_json(&response)?;
    } else {
        print_response(&response);
    }
    db.close().await;

    if response.success {
        Ok(())
    } else {
        Err(HelpfulError::new(response.message.clone())
            .with_context(format!("Outcome: {:?}", response.outcome))
            .with_suggestions(response.suggestions.iter().map(|s| format!("TRY: {}", s)))
            .into())
    }
}

fn print_response(response: &PipelineResponse) {
    if !response.generated_cards.is_empty() {
        let rows = response
            .generated_cards
            .iter()
            .map(|card| {
                vec![
                    card.display_order.to_string(),
                    truncate(&card.front, 30),
                    truncate(&card.back, 30),
                    card.ipa_pronunciation.clone().unwrap_or_else(|| "-".to_string()),
                    card.difficulty.to_string(),
                    join_list(card.tags.as_deref()),
                ]
            })
            .collect();
        print_table(&["#", "Front", "Back", "IPA", "Difficulty", "Tags"], rows);
    }

    if response.success {
        println!("{}", response.message);
        println!(
            "Generated: {}  Saved: {}  Skipped: {}",
            response.total_generated, response.total_saved, response.duplicates_skipped
        );
        for error in &response.errors {
            println!("  - {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenerateArgs {
        GenerateArgs {
            deck: 3,
            topic: "Weather".to_string(),
            count: None,
            owner: Some(1),
            source: "en".to_string(),
            target: "ja".to_string(),
            level: Some("b2".to_string()),
            keywords: vec!["rain".to_string()],
            no_examples: true,
            no_pronunciation: false,
            background: false,
            json: false,
        }
    }

    #[test]
    fn test_request_uses_default_count_and_flags() {
        let request = args().to_request(&CardenConfig::default()).unwrap();
        assert_eq!(request.count, 10);
        assert_eq!(request.target_language, "ja");
        assert_eq!(request.cefr_level, Some(CefrLevel::B2));
        assert_eq!(request.keywords, Some(vec!["rain".to_string()]));
        assert!(!request.include_examples);
        assert!(request.include_pronunciation);
    }

    #[test]
    fn test_bad_level_is_rejected() {
        let mut args = args();
        args.level = Some("Z9".to_string());
        assert!(args.to_request(&CardenConfig::default()).is_err());
    }
}
