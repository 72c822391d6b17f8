use clap::Parser;
use splitticket::cli::commands;
use splitticket::cli::{Cli, Commands};
use splitticket::config;
use splitticket::logging::init_logging;
use splitticket::{SplitError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = build_cli_overrides(&cli);

    let result = match cli.command {
        Commands::Init { force } => commands::init::execute(force, cli.json, None),
        Commands::Create(ref args) => commands::create::execute(args, cli.json, &overrides),
        Commands::Show { ref ids } => commands::show::execute(ids, cli.json, &overrides),
        Commands::List(ref args) => commands::list::execute(args, cli.json, &overrides),
        Commands::Split(ref args) => commands::split::execute(args, cli.json, &overrides),
        Commands::History { ref id } => commands::history::execute(id, cli.json, &overrides),
        Commands::Options { ref id } => commands::options::execute(id, cli.json, &overrides),
        Commands::Milestone { ref command } => {
            commands::milestone::execute(command, cli.json, &overrides)
        }
        Commands::Component { ref command } => {
            commands::component::execute(command, cli.json, &overrides)
        }
        Commands::Version => commands::version::execute(cli.json),
    };

    if let Err(e) = result {
        let no_color = cli.no_color || std::env::var_os("NO_COLOR").is_some();
        handle_error(&e, cli.json, no_color);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &SplitError, json_mode: bool, no_color: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = !no_color && io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        db: cli.db.clone(),
        actor: cli.actor.clone(),
        json: Some(cli.json),
        lock_timeout: cli.lock_timeout,
    }
}
