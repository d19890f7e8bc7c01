mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accurev-bridge",
    about = "Browse AccuRev streams and query AccuWork issues through the accurev client",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest accurev-bridge.yaml above the current directory)
    #[arg(long, global = true, env = "ACCUREV_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log every accurev invocation
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that accurev is installed and the configured login works
    Check,

    /// Show the stream hierarchy
    Streams,

    /// List one directory level (streams, directories and files)
    Ls {
        /// Logical path such as Depot/:stream/src; omit to list the root stream
        path: Option<String>,
    },

    /// Show everything below a stream or directory
    Tree {
        /// Logical path such as Depot/:stream/src
        path: String,
    },

    /// Copy the latest version of a stream path into a local directory
    Get {
        /// Logical path such as Depot/:stream/src
        source: String,
        /// Destination directory (created if missing)
        target: PathBuf,
    },

    /// List AccuWork issues
    Issues {
        /// Only issues targeting this release
        #[arg(long)]
        release: Option<String>,

        /// Only issues with this category value
        #[arg(long)]
        category: Option<String>,
    },

    /// List values of the configured category field
    Categories,

    /// Create, show and validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config_path(cli.config.as_deref());

    let result = match cli.command {
        Commands::Check => cmd::check::run(&config_path, cli.json),
        Commands::Streams => cmd::streams::run(&config_path, cli.json),
        Commands::Ls { path } => cmd::ls::run(&config_path, path.as_deref(), cli.json),
        Commands::Tree { path } => cmd::tree::run(&config_path, &path, cli.json),
        Commands::Get { source, target } => cmd::get::run(&config_path, &source, &target, cli.json),
        Commands::Issues { release, category } => cmd::issues::run(
            &config_path,
            release.as_deref(),
            category.as_deref(),
            cli.json,
        ),
        Commands::Categories => cmd::categories::run(&config_path, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
