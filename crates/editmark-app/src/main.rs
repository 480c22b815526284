//! EditMark - publish instances and interchange exports from host snapshots
//!
//! Entry point: logging setup, settings resolution and command dispatch.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("EDITMARK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(?cli, "parsed command line");

    if let Command::InitSettings { force } = cli.command {
        let path = cli.settings.unwrap_or_else(config::default_settings_path);
        config::init_settings(&path, force)?;
        println!("{}", path.display());
        return Ok(());
    }

    let settings = config::load_settings(cli.settings.as_deref())?;
    let sequence = cli.sequence.as_deref();
    match &cli.command {
        Command::Create(args) => commands::create(&settings, args, sequence),
        Command::CreateWorkfile(args) => commands::create_workfile(args),
        Command::CreatePackage(args) => commands::create_package(args, sequence),
        Command::Collect(args) => commands::collect(&settings, args, sequence),
        Command::Update(args) => commands::update(&settings, args, sequence),
        Command::Remove(args) => commands::remove(&settings, args, sequence),
        Command::ExportOtio(args) => commands::export_otio(args, sequence),
        Command::Render(args) => commands::render(args, sequence),
        Command::InitSettings { .. } => Ok(()),
    }
}
