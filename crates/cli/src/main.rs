use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use epub_thumbnailer_core::config::{
    config_path, load_config, thumbnail_options_from_config, AppConfig,
};
use epub_thumbnailer_core::thumbnail::generate_thumbnail;

#[derive(Parser)]
#[command(name = "epub-thumbnailer")]
#[command(about = "Render a PNG thumbnail from the cover of an EPUB file")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// EPUB file to read
    #[arg(required = true)]
    input: Option<PathBuf>,

    /// PNG file to write
    #[arg(required = true)]
    output: Option<PathBuf>,

    /// Longest edge of the thumbnail in pixels (defaults to the configured size)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    size: Option<u32>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match (&cli.command, &cli.input, &cli.output) {
        (Some(Commands::Config { action }), _, _) => run_config(action, cli.json),
        (None, Some(input), Some(output)) => run_thumbnail(input, output, cli.size, cli.json),
        _ => Err("An input and an output file are required".into()),
    };

    if let Err(e) = result {
        match &cli.input {
            Some(input) if cli.command.is_none() => eprintln!("Error: {}: {}", input.display(), e),
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn run_thumbnail(
    input: &Path,
    output: &Path,
    size: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_config();
    let mut opts = thumbnail_options_from_config(&cfg);
    if let Some(size) = size {
        opts.size = size;
    }
    tracing::debug!("Thumbnailing {} at {}px ({:?})", input.display(), opts.size, opts.filter);

    let report = generate_thumbnail(input, output, &opts)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn run_config(
    action: &ConfigAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or("Could not determine config directory")?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&path, toml)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = load_config();
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
    }
    Ok(())
}
