//! Deck management commands

use anyhow::Result;
use carden::config::CardenConfig;
use carden_db::NewDeck;
use carden_types::{CefrLevel, DeckId, OwnerId};
use clap::Subcommand;

use super::error::HelpfulError;
use super::output::{format_millis, join_list, print_json, print_table, truncate};

/// Subcommands for deck management
#[derive(Subcommand, Debug, Clone)]
pub enum DeckAction {
    /// Create a new deck
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        owner: OwnerId,
        /// Capacity (defaults to generation.max_cards_per_deck)
        #[arg(long)]
        max_cards: Option<i64>,
        #[arg(long, default_value = "en")]
        source: String,
        #[arg(long, default_value = "vi")]
        target: String,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show deck details and counter consistency
    Info {
        id: DeckId,
        #[arg(long)]
        json: bool,
    },
    /// List the live cards of a deck
    Cards {
        id: DeckId,
        #[arg(long)]
        json: bool,
    },
    /// Soft-delete a deck
    Delete { id: DeckId },
    /// Soft-delete one card
    RemoveCard { card_id: i64 },
}

/// Execute a deck command
pub fn run(action: DeckAction, config: &CardenConfig) -> Result<()> {
    super::block_on(run_async(action, config))
}

async fn run_async(action: DeckAction, config: &CardenConfig) -> Result<()> {
    let db = super::open_database(config).await?;

    match action {
        DeckAction::Create {
            title,
            owner,
            max_cards,
            source,
            target,
            level,
            description,
        } => {
            let cefr_level = match level {
                Some(level) => Some(
                    level
                        .parse::<CefrLevel>()
                        .map_err(|_| HelpfulError::invalid_level(&level))?
                        .to_string(),
                ),
                None => None,
            };
            let mut deck = NewDeck::new(owner, title)
                .with_max_cards(max_cards.unwrap_or(config.generation.max_cards_per_deck))
                .with_languages(source, target);
            deck.cefr_level = cefr_level;
            deck.description = description;

            let id = db.create_deck(&deck).await?;
            println!("Created deck {} ({} cards max)", id, deck.max_cards);
        }

        DeckAction::Info { id, json } => {
            let deck = db.get_deck(id).await?.ok_or_else(|| HelpfulError::deck_not_found(id))?;
            let counts = db.deck_counts(id).await?;
            if json {
                print_json(&serde_json::json!({
                    "deck": deck,
                    "live_cards": counts.live,
                    "consistent": counts.is_consistent(),
                }))?;
            } else {
                print_table(
                    &["Field", "Value"],
                    vec![
                        vec!["Id".into(), deck.id.to_string()],
                        vec!["Title".into(), deck.title.clone()],
                        vec!["Owner".into(), deck.owner_id.to_string()],
                        vec![
                            "Languages".into(),
                            format!(
                                "{} -> {}",
                                deck.source_language.as_deref().unwrap_or("-"),
                                deck.target_language.as_deref().unwrap_or("-")
                            ),
                        ],
                        vec!["Level".into(), deck.cefr_level.clone().unwrap_or_else(|| "-".into())],
                        vec!["Cards".into(), format!("{} / {}", deck.card_count, deck.max_cards)],
                        vec!["Live rows".into(), counts.live.to_string()],
                        vec!["Created".into(), format_millis(deck.created_at)],
                    ],
                );
                if !counts.is_consistent() {
                    eprintln!(
                        "WARNING: card counter ({}) differs from live rows ({})",
                        counts.aggregate, counts.live
                    );
                }
            }
        }

        DeckAction::Cards { id, json } => {
            db.get_deck(id).await?.ok_or_else(|| HelpfulError::deck_not_found(id))?;
            let cards = db.list_cards(id).await?;
            if json {
                print_json(&cards)?;
            } else if cards.is_empty() {
                println!("Deck {} has no cards", id);
            } else {
                let rows = cards
                    .iter()
                    .map(|card| {
                        vec![
                            card.display_order.to_string(),
                            card.id.to_string(),
                            truncate(&card.front, 30),
                            truncate(&card.back, 30),
                            card.difficulty.to_string(),
                            join_list(card.tags.as_deref()),
                        ]
                    })
                    .collect();
                print_table(&["#", "Id", "Front", "Back", "Difficulty", "Tags"], rows);
            }
        }

        DeckAction::Delete { id } => {
            if db.soft_delete_deck(id).await? {
                println!("Deleted deck {}", id);
            } else {
                return Err(HelpfulError::deck_not_found(id).into());
            }
        }

        DeckAction::RemoveCard { card_id } => {
            if db.soft_delete_card(card_id).await? {
                println!("Removed card {}", card_id);
            } else {
                println!("Card {} was already removed", card_id);
            }
        }
    }

    db.close().await;
    Ok(())
}
