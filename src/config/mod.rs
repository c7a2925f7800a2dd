//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{
    ArchiveArgs, CliArgs, CollectionOverrides, Command, ReindexArgs, StatsArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "archivist";
const ENV_PREFIX: &str = "ARCHIVIST";
const DEFAULT_COLLECTION_ID: &str = "blog";
const DEFAULT_STORE_PATH: &str = "data";
const DEFAULT_RECENT_ENTRIES: usize = 10;
const MAX_RECENT_ENTRIES: usize = 1000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub collection: CollectionSettings,
    pub listeners: ListenerSettings,
    pub request_log: RequestLogSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub id: String,
    pub store_path: PathBuf,
    pub timezone: Tz,
    pub recent_entries: usize,
}

/// Plugin tags resolved through the listener registry, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct ListenerSettings {
    pub entry: Vec<String>,
    pub response: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestLogSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("listeners.entry")
            .with_list_parse_key("listeners.response"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    if let Some(command) = cli.command.as_ref() {
        raw.apply_overrides(command.overrides());
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    collection: RawCollectionSettings,
    listeners: RawListenerSettings,
    request_log: RawRequestLogSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CollectionOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(id) = overrides.collection.as_ref() {
            self.collection.id = Some(id.clone());
        }
        if let Some(path) = overrides.store_path.as_ref() {
            self.collection.store_path = Some(path.clone());
        }
        if let Some(timezone) = overrides.timezone.as_ref() {
            self.collection.timezone = Some(timezone.clone());
        }
        if let Some(limit) = overrides.recent_entries {
            self.collection.recent_entries = Some(limit);
        }
        if let Some(path) = overrides.request_log.as_ref() {
            self.request_log.path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            collection,
            listeners,
            request_log,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            collection: build_collection_settings(collection)?,
            listeners: build_listener_settings(listeners)?,
            request_log: build_request_log_settings(request_log),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_collection_settings(
    collection: RawCollectionSettings,
) -> Result<CollectionSettings, LoadError> {
    let id = collection
        .id
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_COLLECTION_ID.to_string());
    if id.is_empty() {
        return Err(LoadError::invalid("collection.id", "must not be empty"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LoadError::invalid(
            "collection.id",
            format!("`{id}` may only contain ASCII letters, digits, `-` and `_`"),
        ));
    }

    let store_path = collection
        .store_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

    let timezone = match collection.timezone {
        Some(name) => Tz::from_str(name.trim()).map_err(|err| {
            LoadError::invalid("collection.timezone", format!("`{name}`: {err}"))
        })?,
        None => Tz::UTC,
    };

    let recent_entries = collection.recent_entries.unwrap_or(DEFAULT_RECENT_ENTRIES);
    if recent_entries == 0 || recent_entries > MAX_RECENT_ENTRIES {
        return Err(LoadError::invalid(
            "collection.recent_entries",
            format!("must be between 1 and {MAX_RECENT_ENTRIES}"),
        ));
    }

    Ok(CollectionSettings {
        id,
        store_path,
        timezone,
        recent_entries,
    })
}

fn build_listener_settings(
    listeners: RawListenerSettings,
) -> Result<ListenerSettings, LoadError> {
    Ok(ListenerSettings {
        entry: listener_names(listeners.entry, "listeners.entry")?,
        response: listener_names(listeners.response, "listeners.response")?,
    })
}

fn listener_names(names: Vec<String>, key: &'static str) -> Result<Vec<String>, LoadError> {
    names
        .into_iter()
        .map(|name| {
            let name = name.trim().to_string();
            if name.is_empty() {
                Err(LoadError::invalid(key, "listener names must not be blank"))
            } else {
                Ok(name)
            }
        })
        .collect()
}

fn build_request_log_settings(request_log: RawRequestLogSettings) -> RequestLogSettings {
    RequestLogSettings {
        path: request_log
            .path
            .filter(|path| !path.as_os_str().is_empty()),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCollectionSettings {
    id: Option<String>,
    store_path: Option<PathBuf>,
    timezone: Option<String>,
    recent_entries: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListenerSettings {
    entry: Vec<String>,
    response: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRequestLogSettings {
    path: Option<PathBuf>,
}

#[cfg(test)]
mod tests;
