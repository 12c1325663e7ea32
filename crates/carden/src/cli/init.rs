//! `carden init`: write a starter config and create the database.

use anyhow::{Context, Result};
use carden::config::CardenConfig;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# Carden configuration

[generation]
max_cards_per_batch = 15
default_card_count = 10
max_cards_per_deck = 30

[model]
provider = "gemini"
model = "gemini-2.0-flash-exp"
api_key_env = "GEMINI_API_KEY"
timeout_seconds = 60
generation_temperature = 0.7
generation_max_tokens = 8192
validation_temperature = 0.1
validation_max_tokens = 1024
"#;

pub fn run(config_path: &Path, config: &CardenConfig) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(config_path, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote config: {}", config_path.display());
    }

    super::block_on(create_database(config))
}

async fn create_database(config: &CardenConfig) -> Result<()> {
    let db = super::open_database(config).await?;
    db.close().await;
    println!("Database ready: {}", config.database.path.display());
    Ok(())
}
