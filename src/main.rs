//! lazy-viewport - Entry Point

use clap::Parser;
use lazy_viewport::config::Strategy;
use lazy_viewport::scene::{self, Scene};
use std::path::PathBuf;
use tracing::info;

/// lazy-viewport - replay a scripted page and print lazy activation transitions
#[derive(Parser, Debug)]
#[command(name = "lazy-viewport")]
#[command(version)]
#[command(about = "Replay a scripted page against the lazy viewport engine")]
pub struct Args {
    /// Path to a scene TOML file
    #[arg(required_unless_present = "demo", conflicts_with = "demo")]
    pub scene: Option<PathBuf>,

    /// Replay the bundled demo page
    #[arg(long)]
    pub demo: bool,

    /// Intersection strategy
    #[arg(long, value_parser = ["auto", "polling", "observer"])]
    pub strategy: Option<String>,

    /// Print transitions as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = {
        let config_file = lazy_viewport::config::load_config_with_precedence(args.config.clone())?;
        let merged = lazy_viewport::config::merge_config(config_file);
        let with_env = lazy_viewport::config::apply_env_overrides(merged)?;

        let strategy_override = args
            .strategy
            .as_deref()
            .map(str::parse::<Strategy>)
            .transpose()?;
        lazy_viewport::config::apply_cli_overrides(with_env, strategy_override, args.log_file.clone())
    };

    lazy_viewport::logging::init(&config.log_file_path)?;

    info!(config = ?config, "Configuration loaded and resolved");

    let scene = match &args.scene {
        Some(path) => Scene::load(path)?,
        None => Scene::demo()?,
    };

    let report = scene::run(&scene, &config.lazy)?;

    if args.json {
        for transition in &report.transitions {
            println!("{}", serde_json::to_string(transition)?);
        }
    } else {
        println!("engine: {}", report.engine);
        for transition in &report.transitions {
            println!("{transition}");
        }
        println!(
            "{}/{} loaded after {}ms",
            report.loaded_count(),
            report.final_status.len(),
            report.elapsed_ms
        );
    }

    Ok(())
}
