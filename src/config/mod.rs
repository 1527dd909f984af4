//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroU32,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "ladle";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_ENTRY_LIMIT: usize = 2048;
const DEFAULT_CACHE_LIST_TTL_SECS: u64 = 5 * 60;
const DEFAULT_CACHE_DETAIL_TTL_SECS: u64 = 10 * 60;
const DEFAULT_CACHE_INGREDIENT_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_WORKER_CONCURRENCY: u32 = 2;
const DEFAULT_HEALTH_WAIT_SECS: u64 = 5;
const DEFAULT_RESULT_TTL_SECS: u64 = 3600;
const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 300;
const DEFAULT_MEALDB_BASE_URL: &str = "https://www.themealdb.com";
const DEFAULT_MEALDB_API_KEY: &str = "1";
const DEFAULT_FOODFACTS_BASE_URL: &str = "https://world.openfoodfacts.org/api/v2";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RESULTS_DIR: &str = "api_results";

/// Command-line arguments for the ladle binary.
#[derive(Debug, Parser, Default)]
#[command(name = "ladle", version, about = "Ladle recipe API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LADLE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Override the listener address (host:port).
    #[arg(long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,

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

    /// Toggle response caching.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the background worker concurrency.
    #[arg(long = "worker-concurrency", value_name = "COUNT")]
    pub worker_concurrency: Option<u32>,

    /// Override the directory where external API responses are saved.
    #[arg(long = "results-dir", value_name = "PATH")]
    pub results_dir: Option<PathBuf>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub tasks: TasksSettings,
    pub external: ExternalSettings,
    pub results: ResultsSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen_addr: SocketAddr,
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
pub struct CacheSettings {
    pub enabled: bool,
    pub entry_limit: usize,
    pub list_ttl: Duration,
    pub detail_ttl: Duration,
    pub ingredient_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct TasksSettings {
    pub worker_concurrency: NonZeroU32,
    /// How long the health endpoint waits for its probe task to complete.
    pub health_wait: Duration,
    /// Retention for terminal task records.
    pub result_ttl: Duration,
    pub prune_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ExternalSettings {
    pub themealdb_base_url: String,
    pub themealdb_api_key: String,
    pub openfoodfacts_base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ResultsSettings {
    pub directory: PathBuf,
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

    builder = builder.add_source(Environment::with_prefix("LADLE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

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
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    tasks: RawTasksSettings,
    external: RawExternalSettings,
    results: RawResultsSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(listen) = cli.listen.as_ref() {
            self.server.listen = Some(listen.clone());
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = cli.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(concurrency) = cli.worker_concurrency {
            self.tasks.worker_concurrency = Some(concurrency);
        }
        if let Some(dir) = cli.results_dir.as_ref() {
            self.results.directory = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            tasks,
            external,
            results,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            tasks: build_tasks_settings(tasks)?,
            external: build_external_settings(external)?,
            results: build_results_settings(results)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let listen = server
        .listen
        .unwrap_or_else(|| format!("{DEFAULT_HOST}:{DEFAULT_PORT}"));
    let listen_addr = listen
        .parse()
        .map_err(|err| LoadError::invalid("server.listen", format!("invalid address: {err}")))?;
    Ok(ServerSettings { listen_addr })
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

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let entry_limit = cache.entry_limit.unwrap_or(DEFAULT_CACHE_ENTRY_LIMIT);
    if entry_limit == 0 {
        return Err(LoadError::invalid(
            "cache.entry_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        entry_limit,
        list_ttl: non_zero_secs(
            cache.list_ttl_seconds.unwrap_or(DEFAULT_CACHE_LIST_TTL_SECS),
            "cache.list_ttl_seconds",
        )?,
        detail_ttl: non_zero_secs(
            cache
                .detail_ttl_seconds
                .unwrap_or(DEFAULT_CACHE_DETAIL_TTL_SECS),
            "cache.detail_ttl_seconds",
        )?,
        ingredient_ttl: non_zero_secs(
            cache
                .ingredient_ttl_seconds
                .unwrap_or(DEFAULT_CACHE_INGREDIENT_TTL_SECS),
            "cache.ingredient_ttl_seconds",
        )?,
    })
}

fn build_tasks_settings(tasks: RawTasksSettings) -> Result<TasksSettings, LoadError> {
    let concurrency = tasks
        .worker_concurrency
        .unwrap_or(DEFAULT_WORKER_CONCURRENCY);
    let worker_concurrency = NonZeroU32::new(concurrency)
        .ok_or_else(|| LoadError::invalid("tasks.worker_concurrency", "must be greater than zero"))?;

    Ok(TasksSettings {
        worker_concurrency,
        health_wait: non_zero_secs(
            tasks.health_wait_seconds.unwrap_or(DEFAULT_HEALTH_WAIT_SECS),
            "tasks.health_wait_seconds",
        )?,
        result_ttl: non_zero_secs(
            tasks.result_ttl_seconds.unwrap_or(DEFAULT_RESULT_TTL_SECS),
            "tasks.result_ttl_seconds",
        )?,
        prune_interval: non_zero_secs(
            tasks
                .prune_interval_seconds
                .unwrap_or(DEFAULT_PRUNE_INTERVAL_SECS),
            "tasks.prune_interval_seconds",
        )?,
    })
}

fn build_external_settings(external: RawExternalSettings) -> Result<ExternalSettings, LoadError> {
    let themealdb_base_url = non_empty(
        external
            .themealdb_base_url
            .unwrap_or_else(|| DEFAULT_MEALDB_BASE_URL.to_string()),
        "external.themealdb_base_url",
    )?;
    let themealdb_api_key = non_empty(
        external
            .themealdb_api_key
            .unwrap_or_else(|| DEFAULT_MEALDB_API_KEY.to_string()),
        "external.themealdb_api_key",
    )?;
    let openfoodfacts_base_url = non_empty(
        external
            .openfoodfacts_base_url
            .unwrap_or_else(|| DEFAULT_FOODFACTS_BASE_URL.to_string()),
        "external.openfoodfacts_base_url",
    )?;

    Ok(ExternalSettings {
        themealdb_base_url,
        themealdb_api_key,
        openfoodfacts_base_url,
        request_timeout: non_zero_secs(
            external
                .request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            "external.request_timeout_seconds",
        )?,
    })
}

fn build_results_settings(results: RawResultsSettings) -> Result<ResultsSettings, LoadError> {
    let directory = results
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "results.directory",
            "path must not be empty",
        ));
    }
    Ok(ResultsSettings { directory })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    listen: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    entry_limit: Option<usize>,
    list_ttl_seconds: Option<u64>,
    detail_ttl_seconds: Option<u64>,
    ingredient_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTasksSettings {
    worker_concurrency: Option<u32>,
    health_wait_seconds: Option<u64>,
    result_ttl_seconds: Option<u64>,
    prune_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExternalSettings {
    themealdb_base_url: Option<String>,
    themealdb_api_key: Option<String>,
    openfoodfacts_base_url: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawResultsSettings {
    directory: Option<PathBuf>,
}

fn non_zero_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_empty(value: String, key: &'static str) -> Result<String, LoadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be empty"));
    }
    Ok(trimmed.to_string())
}
