//! Command handlers and dispatch.

pub mod config_cmd;
pub mod sites;
pub mod util;

use sconnect_api::{CancellationToken, SecureConnectClient};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;

/// Route an API-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let ctx = resolve(global)?;
    let client = SecureConnectClient::new(&ctx.client)
        .map_err(|e| CliError::from_api(e, &ctx.profile_name))?;

    match cmd {
        Command::Sites(args) => sites::handle(&client, &ctx, args, global, cancel).await,
        // Config and completions are handled before any client exists.
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = config::load_config_or_default();
    config::resolve(global, &cfg)
}
