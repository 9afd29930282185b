mod commands;

use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "site-kit")]
#[command(version, about = "Build tools for static sites: image derivatives and deployment transforms", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Process image derivatives for a rendered site and apply deployment settings
    Build {
        /// Path to project directory (containing site-kit.toml)
        path: PathBuf,

        /// Base path to prefix site-absolute URLs with (overrides config and environment)
        #[arg(long)]
        base_path: Option<String>,

        /// Skip image processing, only apply deployment settings
        #[arg(long)]
        no_images: bool,
    },

    /// List the image derivatives requested by the rendered pages
    Scan {
        /// Path to project directory
        path: PathBuf,

        /// Print requests as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the image cache and generated derivatives
    Clean {
        /// Path to project directory
        path: PathBuf,
    },

    /// Serve the rendered site locally with live reload
    Preview {
        /// Path to project directory
        path: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build {
            path,
            base_path,
            no_images,
        } => commands::build::run(path, base_path, no_images).await,
        Command::Scan { path, json } => commands::scan::run(path, json).await,
        Command::Clean { path } => commands::clean::run(path).await,
        Command::Preview { path, port } => commands::preview::run(path, port).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "site-kit", &mut io::stdout());
            Ok(())
        }
    }
}
