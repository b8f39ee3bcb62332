//! weft command-line driver.

mod cli;
mod config;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::cli::Cli;
use crate::config::Settings;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let mut settings = Settings::load(&root);
    if cli.non_standard {
        settings.options.allow_non_standard = true;
    }
    debug!(config = ?settings.config_path, "settings loaded");

    let outcome = run::run(&cli.command, &settings)?;
    print!("{}", outcome.output);
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
