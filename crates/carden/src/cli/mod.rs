//! Command-line interface for Carden
//!
//! Every command runs on its own current-thread runtime; nothing here
//! outlives a single invocation.

pub mod deck;
pub mod error;
pub mod generate;
pub mod init;
pub mod output;
pub mod validate;

use anyhow::Result;
use carden::config::CardenConfig;
use carden_db::CardenDb;
use std::future::Future;

use self::error::HelpfulError;

/// Run an async command body to completion.
pub(crate) fn block_on<F: Future<Output = Result<()>>>(body: F) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(body)
}

/// Open the configured database, with a helpful error on failure.
pub(crate) async fn open_database(config: &CardenConfig) -> Result<CardenDb> {
    let path = &config.database.path;
    CardenDb::open(path)
        .await
        .map_err(|err| anyhow::Error::from(HelpfulError::database_unavailable(path, &err.to_string())))
}

/// Build the configured model provider.
pub(crate) fn build_provider(config: &CardenConfig) -> Result<std::sync::Arc<dyn carden::ModelProvider>> {
    let settings = &config.model;
    if !settings.provider.eq_ignore_ascii_case("gemini") {
        return Err(HelpfulError::new(format!("Unknown model provider: '{}'", settings.provider))
            .with_suggestion("TRY: Set [model] provider = \"gemini\" in config.toml")
            .into());
    }
    let provider = carden::GeminiProvider::from_settings(settings)
        .map_err(|_| HelpfulError::missing_api_key(&settings.api_key_env))?;
    Ok(std::sync::Arc::new(provider))
}
