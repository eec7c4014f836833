mod broker;
mod cli;
mod commands;
mod config;
mod engine;
mod props;
mod provider;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // Initialize logging based on verbosity
    let log_level = match ctx.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if ctx.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Stack(args) => {
            if !ctx.quiet {
                ui::info("Starting stack push");
            }
            commands::stack::run(&ctx, &args)
        }
        Command::Function(args) => {
            if !ctx.quiet {
                ui::info("Starting function push");
            }
            commands::function::run(&ctx, &args)
        }
        Command::Repo(_) => {
            ui::error("Repository creation is not yet implemented");
            std::process::exit(1);
        }
        Command::Bucket(_) => {
            ui::error("Bucket creation is not yet implemented");
            std::process::exit(1);
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "drover", &mut io::stdout());
            Ok(())
        }
    }
}
