use clap::Parser;

use super::CmdError;
use crate::{config::AppConfig, models::Entity};

/// Arguments of the `current` command.
#[derive(Parser, Debug)]
pub struct CurrentArgs {
    /// Name of the poller whose source is queried.
    pub poller: String,
}

/// Fetches and prints a poller's live snapshot without touching its state.
pub async fn execute(config: AppConfig, args: CurrentArgs) -> Result<Vec<Entity>, CmdError> {
    let (repo, supervisor) = super::build(config).await?;
    let result = supervisor.poller(&args.poller)?.current().await;
    repo.close().await;

    let entities = result?;
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(entities)
}
