mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("PAGELESS_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "pageless",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Simulate(args) => {
            let mut ctx = load_context(cli.config.as_deref());
            handlers::simulate::handle(&mut ctx, args).await
        }
        Commands::Plan(args) => {
            let mut ctx = load_context(cli.config.as_deref());
            handlers::plan::handle(&mut ctx, args)
        }
    };

    if let Err(e) = result {
        output::output_error(&format!("{:#}", e));
    }
    Ok(())
}

fn load_context(config: Option<&Path>) -> CliContext {
    match CliContext::load(config) {
        Ok(ctx) => ctx,
        Err(e) => output::output_error(&e.to_string()),
    }
}
