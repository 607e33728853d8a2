//! Transmap CLI - Command-line interface for API interface mappings
//!
//! This is the main entry point for the Transmap CLI application, providing
//! commands for exploring schemas, authoring and validating mappings,
//! teaching the attribute graph and composing stored mappings.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", error::format_error(&e, cli.use_color()));
            process::exit(e.exit_code());
        }
    };

    control::set_override(cli.use_color() && config.output.color);

    let log_guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let code = match run(cli, config).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            e.exit_code()
        }
    };

    // flush buffered file logs before exiting
    drop(log_guard);
    process::exit(code);
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(
        cli.output,
        control::SHOULD_COLORIZE.should_colorize(),
        cli.quiet,
    );

    tracing::info!(
        verbosity = cli.verbosity_level(),
        session_id = logging::current_session_id().unwrap_or("unknown"),
        "Executing command"
    );

    match cli.command {
        Commands::Tree(args) => handlers::handle_tree(args, &mut output).await,
        Commands::Expr(args) => handlers::handle_expr(args, &mut output).await,
        Commands::Graph(args) => handlers::handle_graph(args, &config, &mut output).await,
        Commands::Suggest(args) => handlers::handle_suggest(args, &config, &mut output).await,
        Commands::Compile(args) => handlers::handle_compile(args, &mut output).await,
        Commands::Decompile(args) => handlers::handle_decompile(args, &mut output).await,
        Commands::Mappings(args) => handlers::handle_mappings(args, &config, &mut output).await,
        Commands::Chain(args) => handlers::handle_chain(args, &config, &mut output).await,
        Commands::Validate(args) => handlers::handle_validate(args, &mut output).await,
        Commands::Execute(args) => handlers::handle_execute(args, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let verbosity = cli.verbosity_level();
    let mut logging_config = LoggingConfig::from_verbosity(verbosity);
    logging_config.merge_with_file(&config.logging, verbosity);
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(logging_config)
}
