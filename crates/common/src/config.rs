//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// The guild this deployment serves.
    pub guild: GuildConfig,
    /// Discord API configuration.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Membership cache configuration.
    #[serde(default)]
    pub membership: MembershipConfig,
    /// Storage query configuration.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance, used for absolute page links.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Guild scoping.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildConfig {
    /// Discord snowflake of the configured guild.
    pub id: u64,
}

/// Discord API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Base URL of the Discord REST API.
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
    /// Timeout for a single member lookup, in milliseconds.
    #[serde(default = "default_discord_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Membership cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipConfig {
    /// How long a fetched role list is trusted.
    #[serde(default = "default_membership_ttl_secs")]
    pub ttl_secs: u64,
    /// How often expired entries are swept.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Storage query configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Upper bound for each storage call made on behalf of a request.
    #[serde(default = "default_query_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: default_discord_api_base(),
            request_timeout_ms: default_discord_timeout_ms(),
        }
    }
}

impl DiscordConfig {
    /// Member lookup timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_membership_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl MembershipConfig {
    /// Entry TTL as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval as a [`Duration`].
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl QueryConfig {
    /// Storage timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

const fn default_discord_timeout_ms() -> u64 {
    5_000
}

const fn default_membership_ttl_secs() -> u64 {
    120
}

const fn default_sweep_interval_secs() -> u64 {
    10
}

const fn default_query_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `GUILDPOLLS_ENV`)
    /// 4. Environment variables with `GUILDPOLLS__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("GUILDPOLLS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("GUILDPOLLS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("GUILDPOLLS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
