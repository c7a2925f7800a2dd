use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::date::SimpleDate;

/// Command-line arguments for the archivist binary.
#[derive(Debug, Parser)]
#[command(
    name = "archivist",
    version,
    about = "Blog content indexes and date archive navigation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ARCHIVIST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Rebuild every index of the collection from its store.
    Reindex(ReindexArgs),
    /// Print the archive navigation around a day.
    Archive(ArchiveArgs),
    /// Print index counts for the collection.
    Stats(StatsArgs),
}

impl Command {
    pub fn overrides(&self) -> &CollectionOverrides {
        match self {
            Command::Reindex(args) => &args.overrides,
            Command::Archive(args) => &args.overrides,
            Command::Stats(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReindexArgs {
    #[command(flatten)]
    pub overrides: CollectionOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ArchiveArgs {
    #[command(flatten)]
    pub overrides: CollectionOverrides,

    /// Day to navigate from; defaults to today in the collection timezone.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<SimpleDate>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub overrides: CollectionOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CollectionOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the collection identifier.
    #[arg(long = "collection", value_name = "ID")]
    pub collection: Option<String>,

    /// Override the directory holding `<collection>.toml` store files.
    #[arg(long = "store-path", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub store_path: Option<PathBuf>,

    /// Override the collection timezone (IANA name).
    #[arg(long = "timezone", value_name = "TZ")]
    pub timezone: Option<String>,

    /// Override how many entries recent-entry queries return.
    #[arg(long = "recent-entries", value_name = "COUNT")]
    pub recent_entries: Option<usize>,

    /// Override the request log file.
    #[arg(long = "request-log", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub request_log: Option<PathBuf>,
}
