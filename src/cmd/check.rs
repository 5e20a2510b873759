use clap::Parser;

use super::CmdError;
use crate::{config::AppConfig, runner::PassReport};

/// Arguments of the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Name of the poller to run.
    pub poller: String,
}

/// Runs one on-demand pass of a poller and prints its report.
pub async fn execute(config: AppConfig, args: CheckArgs) -> Result<PassReport, CmdError> {
    let (repo, supervisor) = super::build(config).await?;
    let poller = supervisor.poller(&args.poller)?;

    let result = poller.run_once().await;
    repo.close().await;

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
