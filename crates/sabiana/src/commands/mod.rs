//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod diagnostics;
pub mod set;
pub mod units;
pub mod util;
pub mod watch;

use sabiana_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Units(args) => units::handle(coordinator, session, args, global).await,
        Command::Watch(args) => watch::handle(coordinator, session, args, global).await,
        Command::Set(args) => set::handle(coordinator, session, args, global).await,
        Command::Diagnostics => diagnostics::handle(coordinator, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command reached cloud dispatch".into(),
        )),
    }
}
