use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use pantry::cli::args::{Cli, Commands};
use pantry::cli::commands;
use pantry::config::{Config, Paths};
use pantry::logging;
use pantry::OfflineLayer;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let paths = Paths::new()?;
    let config = Config::load_from_path(&paths.config_file)?;
    let format = cli.output.unwrap_or(config.general.default_output);

    let layer = OfflineLayer::open(config, &paths).with_context(|| {
        format!("could not start offline layer in {}", paths.root.display())
    })?;

    let output = match cli.command {
        Commands::Fetch(args) => commands::fetch(&layer, args, format)?,
        Commands::Sync(args) => commands::sync(&layer, args.command, format)?,
        Commands::Cache(args) => commands::cache(&layer, args.command, format)?,
        Commands::Watch(args) => commands::watch(&layer, &args, format)?,
        Commands::Config(args) => commands::config(layer.config(), &paths, args.command, format)?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
