//! Ontoforge CLI
//!
//! データセットから OWL オントロジーを生成するコマンドラインツール

use clap::Parser;
use ontoforge_cli::{exit_code_for, Cli, CommandExecutor};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let executor = CommandExecutor::new();
    let token = executor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping at the next stage boundary");
            token.cancel();
        }
    });

    let code = match executor.execute(cli.command).await {
        Ok(result) => {
            if result.success {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
            }
            result.exit_code()
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
