//! Configuration management for fleet-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_kv::KvConfig;
use fleet_types::CommandKind;
use serde::{Deserialize, Serialize};

use crate::aggregate::Deadline;
use crate::paginate::PageLimits;
use crate::pending::DEFAULT_REAP_INTERVAL;

/// Source of environment variables, swappable in tests.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub pagination: PageLimits,
    #[serde(default)]
    pub deadlines: DeadlineConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Overrides for the built-in command table, matched by `kind`
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
    /// Keyed by command kind name, e.g. `[confirmations.refresh_bans]`
    #[serde(default)]
    pub confirmations: BTreeMap<String, ConfirmationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Prefix that marks a message as a command
    #[serde(default = "default_command_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub colours: Colours,
    /// Linked from every page title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

/// Embed colours per page tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colours {
    #[serde(default = "default_ok_colour")]
    pub ok: u32,
    #[serde(default = "default_warn_colour")]
    pub warn: u32,
    #[serde(default = "default_error_colour")]
    pub error: u32,
}

impl Default for Colours {
    fn default() -> Self {
        Self {
            ok: default_ok_colour(),
            warn: default_warn_colour(),
            error: default_error_colour(),
        }
    }
}

/// Remote HTTP services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_game_api_url")]
    pub game_api_url: String,
    #[serde(default)]
    pub game_api_token: String,
    #[serde(default = "default_guild_config_url")]
    pub guild_config_url: String,
    #[serde(default)]
    pub guild_config_token: String,
    /// Service name a guild must be subscribed to
    #[serde(default = "default_guild_service")]
    pub guild_service: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            game_api_url: default_game_api_url(),
            game_api_token: String::new(),
            guild_config_url: default_guild_config_url(),
            guild_config_token: String::new(),
            guild_service: default_guild_service(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How long fan-outs wait for outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineConfig {
    /// Read fan-outs, counted from the start of aggregation
    #[serde(default = "default_read_secs")]
    pub read_secs: u64,
    /// Confirmed actions, counted from the first outcome
    #[serde(default = "default_write_secs")]
    pub write_secs: u64,
    /// Confirmed actions, counted from dispatch
    #[serde(default = "default_fallback_secs")]
    pub fallback_secs: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            read_secs: default_read_secs(),
            write_secs: default_write_secs(),
            fallback_secs: default_fallback_secs(),
        }
    }
}

impl DeadlineConfig {
    pub fn read(&self) -> Deadline {
        Deadline::Fixed(Duration::from_secs(self.read_secs))
    }

    pub fn write(&self) -> Deadline {
        Deadline::Lazy {
            after_first: Duration::from_secs(self.write_secs),
            fallback: Duration::from_secs(self.fallback_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaperConfig {
    #[serde(default = "default_reap_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reap_interval_secs(),
        }
    }
}

impl ReaperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// One command's surface and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub kind: CommandKind,
    /// Name users type after the prefix
    pub long: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_args: usize,
    /// `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_args: Option<usize>,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Concurrent remote calls for this command's fan-outs
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub category: String,
}

/// Where and for how long a command's pending action is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Cache key prefix
    pub base: String,
    #[serde(default = "default_confirmation_ttl_secs")]
    pub ttl_secs: u64,
    /// Unicode emoji or custom `<:name:id>`
    #[serde(default = "default_reaction")]
    pub reaction: String,
}

impl ConfirmationConfig {
    pub fn for_kind(kind: CommandKind) -> Self {
        Self {
            base: kind.as_str().to_string(),
            ttl_secs: default_confirmation_ttl_secs(),
            reaction: default_reaction(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path))?;
        Ok(config)
    }

    /// Reject settings the durable store cannot honour.
    ///
    /// The KV bucket drops every entry after `kv.max_age_secs`, so no
    /// confirmation may stay pending longer than that.
    pub fn validate(&self) -> Result<()> {
        for kind in CommandKind::ALL.into_iter().filter(CommandKind::needs_confirmation) {
            let ttl_secs = self.confirmation(kind).ttl_secs;
            if ttl_secs == 0 {
                anyhow::bail!("confirmations.{}: ttl_secs must be positive", kind);
            }
            if ttl_secs > self.kv.max_age_secs {
                anyhow::bail!(
                    "confirmations.{}: ttl_secs ({}) exceeds kv.max_age_secs ({})",
                    kind,
                    ttl_secs,
                    self.kv.max_age_secs
                );
            }
        }
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub fn from_env_impl(env: &impl ReadEnv) -> Result<Self> {
        let bot_token = env
            .var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN not set")?;

        let nats_url = env
            .var("NATS_URL")
            .unwrap_or_else(|| "localhost:4222".to_string());
        let mut kv = KvConfig::from_url(nats_url);
        if let Some(bucket) = env.var("KV_BUCKET") {
            kv.bucket = bucket;
        }

        let defaults = ServicesConfig::default();
        let services = ServicesConfig {
            game_api_url: env.var("GAME_API_URL").unwrap_or(defaults.game_api_url),
            game_api_token: env.var("GAME_API_TOKEN").unwrap_or_default(),
            guild_config_url: env.var("GUILD_CONFIG_URL").unwrap_or(defaults.guild_config_url),
            guild_config_token: env.var("GUILD_CONFIG_TOKEN").unwrap_or_default(),
            guild_service: env.var("GUILD_SERVICE").unwrap_or(defaults.guild_service),
            request_timeout_secs: defaults.request_timeout_secs,
        };

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                prefix: env
                    .var("COMMAND_PREFIX")
                    .unwrap_or_else(default_command_prefix),
                colours: Colours::default(),
                documentation_url: env.var("DOCUMENTATION_URL"),
            },
            kv,
            services,
            pagination: PageLimits::default(),
            deadlines: DeadlineConfig::default(),
            reaper: ReaperConfig::default(),
            commands: Vec::new(),
            confirmations: BTreeMap::new(),
        })
    }

    pub fn confirmation(&self, kind: CommandKind) -> ConfirmationConfig {
        self.confirmations
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| ConfirmationConfig::for_kind(kind))
    }
}

fn default_bot_token() -> String {
    std::env::var("DISCORD_BOT_TOKEN").unwrap_or_default()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_ok_colour() -> u32 {
    0x2ecc71
}

fn default_warn_colour() -> u32 {
    0xf1c40f
}

fn default_error_colour() -> u32 {
    0xe74c3c
}

fn default_game_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_guild_config_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_guild_service() -> String {
    "fleet".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_read_secs() -> u64 {
    120
}

fn default_write_secs() -> u64 {
    120
}

fn default_fallback_secs() -> u64 {
    180
}

fn default_reap_interval_secs() -> u64 {
    DEFAULT_REAP_INTERVAL.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

fn default_confirmation_ttl_secs() -> u64 {
    300
}

fn default_reaction() -> String {
    "✅".to_string()
}
