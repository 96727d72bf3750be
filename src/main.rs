mod api;
mod commands;
mod config;
mod dispatch;
mod domain;
mod download;
mod logs;
mod manifest;
mod probe;
mod properties;
mod server;
mod shell;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use commands::Format;

#[derive(Parser)]
#[command(
    name = "asrctl",
    version,
    about = "Inspect a rooted Android build, capture its logs and fetch add-ons"
)]
struct Cli {
    /// Path to config file (default: ~/.config/asrctl/config.yaml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Show debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Device summary: ROM, root access, BusyBox, repack details
    Info {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: Format,

        /// Also list every build property
        #[arg(long)]
        all: bool,
    },

    /// Print one build property
    Prop {
        /// Property key, e.g. ro.build.id
        key: String,
    },

    /// Check root access (exit 0 iff granted)
    Root {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: Format,
    },

    /// Dump the system (logcat) or kernel (dmesg) log through the root shell
    Logs {
        /// Log source: system or kernel
        source: logs::LogSource,

        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: Format,

        /// Save to this file (or a timestamped file in this directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Give up after this many seconds (overrides config, 0 disables)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List add-on releases from the update manifest
    Updates {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: Format,

        /// Fetch the manifest even when root is unavailable
        #[arg(long)]
        skip_root_check: bool,
    },

    /// Download an add-on package into the download directory
    Download {
        /// Package URL
        url: Option<String>,

        /// Display name, also used for the file name
        title: Option<String>,

        /// Download the first release listed in the manifest
        #[arg(long, conflicts_with_all = ["url", "title"])]
        latest: bool,
    },

    /// Run the REST daemon for UI clients
    Serve {
        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// Log level (overrides config)
        #[arg(long)]
        log_level: Option<String>,
    },
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub(crate) fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_from(Path::new(path))?,
        None => config::load()?,
    };

    if !matches!(cli.command, Commands::Serve { .. }) {
        init_tracing(if cli.verbose { "debug" } else { "warn" }, false);
    }

    match cli.command {
        Commands::Info { format, all } => commands::info::run(&cfg, format, all),
        Commands::Prop { key } => commands::info::prop(&cfg, &key),
        Commands::Root { format } => commands::root::run(&cfg, format),
        Commands::Logs {
            source,
            format,
            output,
            timeout,
        } => commands::logs::run(&cfg, source, format, output, timeout),
        Commands::Updates {
            format,
            skip_root_check,
        } => commands::updates::run(&cfg, format, skip_root_check),
        Commands::Download { url, title, latest } => {
            commands::download::run(&cfg, url, title, latest)
        }
        Commands::Serve {
            http_addr,
            log_level,
        } => {
            let log_level = log_level.or_else(|| cli.verbose.then(|| "debug".to_string()));
            commands::serve::run(&cfg, http_addr, log_level)
        }
    }
}
