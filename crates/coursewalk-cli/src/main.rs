//! coursewalk entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;

use coursewalk::{CrawlSettings, ListDetail};
use coursewalk_cli::commands::{dump, scrape};
use coursewalk_cli::config::{load_filter, resolve_credentials_path};

#[derive(Parser)]
#[command(
    name = "coursewalk",
    about = "List, download and sync the contents of Moodle-based learning platforms",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the courses admitted by a filter and act on their activities.
    Scrape {
        /// JSON file with the user's credentials.
        /// Also reads from COURSEWALK_CREDENTIALS env var.
        #[arg(short, long)]
        credentials: Option<String>,

        /// JSON filter selecting courses, subcourses and subjects ("-" for stdin).
        #[arg(short, long)]
        filter: String,

        /// Platform root URL.
        #[arg(long)]
        root_url: Option<String>,

        /// Write an activity listing to PATH (stdout if PATH is omitted).
        #[arg(short, long, num_args = 0..=1, default_missing_value = "-", value_name = "PATH")]
        list: Option<String>,

        /// List as a flat array of records instead of a tree.
        #[arg(long, requires = "list")]
        flat: bool,

        /// List activity names only.
        #[arg(long, requires = "list", conflicts_with = "flat")]
        names_only: bool,

        /// Download activities below DIR.
        #[arg(short, long, value_name = "DIR")]
        download: Option<PathBuf>,

        /// Converge completion toggles to a completion overlay.
        #[arg(short, long, value_name = "FILE")]
        sync: Option<String>,

        /// Only act on activities with this completion state (true, false).
        #[arg(long)]
        completion: Option<bool>,

        /// Show the browser window.
        #[arg(long)]
        headful: bool,

        /// Seconds to wait for a browser-saved download.
        #[arg(long)]
        download_timeout: Option<u64>,

        /// Attempts per browser-saved download.
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// Print the names of the user's courses as JSON.
    Courses {
        /// JSON file with the user's credentials.
        #[arg(short, long)]
        credentials: Option<String>,

        /// Platform root URL.
        #[arg(long)]
        root_url: Option<String>,

        /// Show the browser window.
        #[arg(long)]
        headful: bool,
    },

    /// Transform course dumps offline.
    Dump {
        #[command(subcommand)]
        action: DumpCommand,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   coursewalk completions bash > ~/.local/share/bash-completion/completions/coursewalk
    ///   coursewalk completions zsh > ~/.zfunc/_coursewalk
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum DumpCommand {
    /// Hierarchical dump to flat list.
    Flatten {
        /// Input file (stdin if omitted).
        input: Option<String>,
    },
    /// Flat list to hierarchical dump.
    Deflatten {
        /// Input file (stdin if omitted).
        input: Option<String>,
    },
    /// Activities of flat dump B that are missing from flat dump A.
    Diff { b: String, a: String },
    /// Flat list to completion overlay.
    Overlay {
        /// Input file (stdin if omitted).
        input: Option<String>,
    },
    /// Apply a completion overlay to a flat or hierarchical dump.
    Patch {
        overlay: String,
        /// Dump to patch (stdin if omitted).
        base: Option<String>,
    },
}

fn settings(root_url: Option<String>) -> CrawlSettings {
    let mut settings = CrawlSettings::from_env();
    if let Some(url) = root_url {
        settings.root_url = url;
    }
    settings
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            credentials,
            filter,
            root_url,
            list,
            flat,
            names_only,
            download,
            sync,
            completion,
            headful,
            download_timeout,
            attempts,
        } => {
            let mut settings = settings(root_url);
            if let Some(secs) = download_timeout {
                settings.download_timeout = Duration::from_secs(secs);
            }
            if let Some(attempts) = attempts {
                settings.download_attempts = attempts;
            }

            let format = match (flat, names_only) {
                (true, _) => scrape::ListFormat::Flat,
                (false, true) => scrape::ListFormat::Hierarchical(ListDetail::Names),
                (false, false) => scrape::ListFormat::Hierarchical(ListDetail::Records),
            };
            let opts = scrape::ScrapeOptions {
                credentials: resolve_credentials_path(credentials.as_deref()),
                filter: load_filter(&filter)?,
                settings,
                headless: !headful,
                list: list.map(|path| scrape::ListTarget { path, format }),
                download,
                sync,
                completion,
            };

            let cancel = CancellationToken::new();
            scrape::cancel_on_ctrl_c(cancel.clone());
            scrape::run(opts, cancel).await?;
        }

        Commands::Courses {
            credentials,
            root_url,
            headful,
        } => {
            let cancel = CancellationToken::new();
            scrape::cancel_on_ctrl_c(cancel.clone());
            scrape::courses(
                resolve_credentials_path(credentials.as_deref()),
                settings(root_url),
                !headful,
                cancel,
            )
            .await?;
        }

        Commands::Dump { action } => match action {
            DumpCommand::Flatten { input } => dump::flatten(input.as_deref())?,
            DumpCommand::Deflatten { input } => dump::deflatten(input.as_deref())?,
            DumpCommand::Diff { b, a } => dump::diff(&b, &a)?,
            DumpCommand::Overlay { input } => dump::overlay(input.as_deref())?,
            DumpCommand::Patch { overlay, base } => dump::patch(&overlay, base.as_deref())?,
        },

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "coursewalk", &mut std::io::stdout());
        }
    }

    Ok(())
}
