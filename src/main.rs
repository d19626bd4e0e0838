//! # Storefront CLI (`storefront`)
//!
//! Build-time and diagnostic commands for the Contentful storefront.
//!
//! ## Usage
//!
//! ```bash
//! storefront --config ./storefront.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `storefront export` | Download assets and write the `data.json` snapshot |
//! | `storefront home` | Print the home page with products (snapshot, else live) |
//! | `storefront entries <type>` | Print all entries of a content type |
//! | `storefront routes` | Write the prerender route manifest |
//!
//! Credentials are read from the config file or from `CONTENTFUL_*`
//! environment variables (a `.env` file in the working directory is
//! loaded first). Logs go to stderr; set `STOREFRONT_LOG` to override the
//! filter (e.g. `STOREFRONT_LOG=storefront_snapshot=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use storefront_snapshot::progress::ProgressMode;
use storefront_snapshot::{config, content, contentful, export, routes};

/// Storefront snapshot tool: export Contentful content for static serving.
#[derive(Parser)]
#[command(
    name = "storefront",
    about = "Export a Contentful storefront to a local snapshot and inspect its content",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults and
    /// environment variables are used when it does not exist.
    #[arg(long, global = true, default_value = "./storefront.toml")]
    config: PathBuf,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the home page, products and images to a local snapshot.
    ///
    /// Fetches the home page with its references, downloads every
    /// referenced image once, and writes `data.json` with image URLs
    /// pointing at the local copies. Images that fail to download keep
    /// their remote URL.
    Export {
        /// Fetch and extract only; do not download or write anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the home page with its products.
    ///
    /// Reads the local snapshot when present; otherwise fetches live.
    Home,

    /// Print all entries of a content type (e.g. `pageProduct`).
    Entries {
        content_type: String,

        /// Reference expansion depth (0-10).
        #[arg(long)]
        include: Option<u8>,
    },

    /// Write the prerender route manifest.
    Routes {
        /// Output path. Defaults to `export.routes_path`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("storefront error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::load_dotenv()?;
    init_tracing(cli.quiet, cli.verbose)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Export { dry_run, progress } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            export::run_export(&cfg, dry_run, progress).await?;
        }
        Commands::Home => {
            content::run_home(&cfg).await?;
        }
        Commands::Entries {
            content_type,
            include,
        } => {
            if include.is_some_and(|n| n > config::MAX_INCLUDE_DEPTH) {
                anyhow::bail!("--include must be <= {}", config::MAX_INCLUDE_DEPTH);
            }
            contentful::run_entries(&cfg, &content_type, include).await?;
        }
        Commands::Routes { output } => {
            routes::run_routes(&cfg, output.as_deref()).await?;
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("STOREFRONT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
