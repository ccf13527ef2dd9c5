use std::path::PathBuf;

use anyhow::{Context, Result};
use bindle::{
    Compiler, Config,
    config::CONFIG_FILE_NAME,
    loader::TransformRegistry,
    plugin::{Plugin, builtin_plugin},
};
use clap::Parser;
use log::{LevelFilter, debug};

/// Bundle a JavaScript module graph into a single file
#[derive(Parser, Debug)]
#[command(name = "bindle", version, about, long_about = None)]
struct Cli {
    /// Configuration file [default: bindle.toml in the working directory]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG, when set, takes precedence over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    debug!("Configuration: {config:?}");

    let plugins = config
        .plugins
        .iter()
        .map(String::as_str)
        .map(builtin_plugin)
        .collect::<Result<Vec<Box<dyn Plugin>>, _>>()
        .context("Failed to set up plugins")?;

    let compiler = Compiler::with_plugins(config, TransformRegistry::with_builtins(), &plugins)
        .context("Failed to set up compiler")?;
    let output = compiler.run().context("Build failed")?;

    println!("{} ({})", output.output_file.display(), output.build_id);
    Ok(())
}
