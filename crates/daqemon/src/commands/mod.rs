//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod daemon;
pub mod node;
pub mod remote;
pub mod sync;
pub mod util;

use daqemon_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server- or daemon-bound command to its handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sync(args) => sync::handle(args, cfg, global).await,
        Command::Remote(args) => remote::handle(args, cfg, global).await,
        Command::Node(args) => node::handle(args, cfg, global).await,
        Command::Daemon(args) => daemon::handle(args, cfg, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
