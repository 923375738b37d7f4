//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "yatube";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATABASE_URL: &str = "sqlite://yatube.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_MEDIA_REQUEST_LIMIT_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_INDEX_TTL_SECS: u64 = 20;
const DEFAULT_SESSION_TTL_HOURS: u64 = 14 * 24;

/// Command-line arguments for the Yatube binary.
#[derive(Debug, Parser)]
#[command(name = "yatube", version, about = "Yatube community blog")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "YATUBE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Manage post groups.
    Groups(GroupsArgs),
    /// Manage user accounts.
    Users(UsersArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the directory that stores uploaded images.
    #[arg(long = "media-directory", value_name = "PATH")]
    pub media_directory: Option<PathBuf>,

    /// Override how long the home page stays cached.
    #[arg(long = "cache-index-ttl-seconds", value_name = "SECONDS")]
    pub cache_index_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum GroupsCommand {
    /// Create a group.
    Create(CreateGroupArgs),
    /// List all groups.
    List(ListGroupsArgs),
    /// Delete a group; its posts stay without a group.
    Delete(DeleteGroupArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CreateGroupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "TITLE")]
    pub title: String,

    /// Defaults to a slug derived from the title.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,
}

#[derive(Debug, Args, Clone)]
pub struct ListGroupsArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteGroupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "SLUG")]
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum UsersCommand {
    /// Delete a user together with their posts, comments and follows.
    Delete(DeleteUserArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DeleteUserArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "USERNAME")]
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub directory: PathBuf,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub index_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    /// Key for password-reset tokens. Generated per process when unset.
    pub secret_key: Option<String>,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("YATUBE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Groups(args)) => match &args.command {
            GroupsCommand::Create(create) => raw.apply_database_override(&create.database),
            GroupsCommand::List(list) => raw.apply_database_override(&list.database),
            GroupsCommand::Delete(delete) => raw.apply_database_override(&delete.database),
        },
        Some(Command::Users(args)) => match &args.command {
            UsersCommand::Delete(delete) => raw.apply_database_override(&delete.database),
        },
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    media: RawMediaSettings,
    cache: RawCacheSettings,
    auth: RawAuthSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(directory) = overrides.media_directory.as_ref() {
            self.media.directory = Some(directory.clone());
        }
        if let Some(ttl) = overrides.cache_index_ttl_seconds {
            self.cache.index_ttl_seconds = Some(ttl);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            media,
            cache,
            auth,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            media: build_media_settings(media)?,
            cache: build_cache_settings(cache)?,
            auth: build_auth_settings(auth)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    if !url.starts_with("sqlite:") {
        return Err(LoadError::invalid(
            "database.url",
            format!("expected a sqlite: URL, got `{url}`"),
        ));
    }

    let max_connections = non_zero_u32(
        u64::from(
            database
                .max_connections
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        ),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_media_settings(media: RawMediaSettings) -> Result<MediaSettings, LoadError> {
    let directory = media
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid("media.directory", "must not be empty"));
    }

    let limit = media
        .max_request_bytes
        .unwrap_or(DEFAULT_MEDIA_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(limit)
        .ok_or_else(|| LoadError::invalid("media.max_request_bytes", "must be greater than zero"))?;
    if usize::try_from(max_request_bytes.get()).is_err() {
        return Err(LoadError::invalid(
            "media.max_request_bytes",
            "value exceeds supported range for usize",
        ));
    }

    Ok(MediaSettings {
        directory,
        max_request_bytes,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let seconds = cache.index_ttl_seconds.unwrap_or(DEFAULT_INDEX_TTL_SECS);
    if seconds == 0 {
        return Err(LoadError::invalid(
            "cache.index_ttl_seconds",
            "must be greater than zero",
        ));
    }
    Ok(CacheSettings {
        index_ttl: Duration::from_secs(seconds),
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let hours = auth.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS);
    if hours == 0 {
        return Err(LoadError::invalid(
            "auth.session_ttl_hours",
            "must be greater than zero",
        ));
    }
    let seconds = hours
        .checked_mul(3600)
        .ok_or_else(|| LoadError::invalid("auth.session_ttl_hours", "value is too large"))?;

    let secret_key = auth
        .secret_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if secret_key.as_ref().is_some_and(|key| key.len() < 16) {
        return Err(LoadError::invalid(
            "auth.secret_key",
            "must be at least 16 characters long",
        ));
    }

    Ok(AuthSettings {
        session_ttl: Duration::from_secs(seconds),
        secret_key,
        cookie_secure: auth.cookie_secure.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMediaSettings {
    directory: Option<PathBuf>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    index_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    session_ttl_hours: Option<u64>,
    secret_key: Option<String>,
    cookie_secure: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
