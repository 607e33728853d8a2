//! Shell completions command handler

use crate::cli::{Cli, CompletionsArgs};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::generate;
use std::io::{self, Write};
use tracing::debug;

/// Write the completion script for the requested shell to stdout
pub fn handle_completions(args: CompletionsArgs) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    debug!(shell = ?args.shell, %bin_name, "generating completions");

    let mut stdout = io::stdout().lock();
    generate(args.shell.to_clap_shell(), &mut command, bin_name, &mut stdout);
    stdout.flush()?;
    Ok(())
}
