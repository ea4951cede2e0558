use crate::domain::constants::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "modelgate",
    version,
    about = "Scan, validate and hand off 3D model files"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the TOML configuration file"
    )]
    pub config: PathBuf,
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scanning host: inbox processing and one-off checks
    Intake {
        #[command(subcommand)]
        command: IntakeCommands,
    },
    /// Tracking server: serve the listing protocol over HTTP
    Serve {
        #[arg(long, help = "Listen address, overrides [listing].bind")]
        bind: Option<String>,
    },
    /// Tracking server: operate on the sync directory directly
    Listing {
        #[command(subcommand)]
        command: ListingCommands,
    },
    /// Download client
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum IntakeCommands {
    /// Scan and validate every file in the inbox
    Run,
    /// Run the format validators only
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run the malware scanner on one file
    Scan { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ListingCommands {
    List,
    Ack {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Show what the server offers
    List,
    /// Download listed files (all of them when no name is given)
    Pull {
        names: Vec<String>,
        #[arg(long, default_value_t = false, help = "Acknowledge downloaded files afterwards")]
        ack: bool,
        #[arg(
            long,
            default_value_t = false,
            help = "Ask before trusting an unknown host key (needs a terminal)"
        )]
        interactive: bool,
    },
    /// Acknowledge files that are already local
    Ack {
        #[arg(required = true)]
        names: Vec<String>,
    },
}
