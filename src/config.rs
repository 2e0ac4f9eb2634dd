use crate::provisioning::{AccessPolicy, DEFAULT_NAME_LIMIT};
use anyhow::{ensure, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for voice-squads
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SquadsConfig {
    /// Partitioning and channel provisioning
    pub formation: FormationConfig,
    /// Squad watchdog timing
    pub presence: PresenceConfig,
    /// Where everyone goes after a replay
    pub reset: ResetConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Group size used when the trigger layer does not pass one
    pub default_group_size: usize,
    pub min_group_size: usize,
    pub max_group_size: usize,
    /// restricted or open
    pub access_policy: AccessPolicy,
    /// Channel grouping new squad channels are created under
    pub parent_grouping: Option<u64>,
    /// Maximum squad channel name length in characters
    pub channel_name_limit: usize,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            default_group_size: 4,
            min_group_size: 2,
            max_group_size: 8,
            access_policy: AccessPolicy::Restricted,
            parent_grouping: None,
            channel_name_limit: DEFAULT_NAME_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Hard lifetime of each squad watchdog
    pub timeout_seconds: u64,
    /// Occupancy poll cadence
    pub poll_interval_seconds: u64,
    /// Text channel receiving abandonment notices
    pub home_channel: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 180,
            poll_interval_seconds: 10,
            home_channel: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Shared voice channel members return to
    pub lobby_channel: u64,
    /// Text spoken into the opposing squad's channel
    pub announcement: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            lobby_channel: 0,
            announcement: "The other team voted for a rematch. Heading back to the lobby.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl SquadsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (voice-squads.toml, .voice-squads-rc)
    /// 3. Environment variables (prefixed with VOICE_SQUADS_, `__` between sections)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&SquadsConfig::default())?);

        if Path::new("voice-squads.toml").exists() {
            builder = builder.add_source(File::with_name("voice-squads"));
        }

        if Path::new(".voice-squads-rc").exists() {
            builder = builder.add_source(File::new(".voice-squads-rc", config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("VOICE_SQUADS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single TOML file on top of the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&SquadsConfig::default())?)
            .add_source(File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?;
        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the watchdog and the partition engine cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.presence.poll_interval_seconds > 0,
            "presence.poll_interval_seconds must be at least 1"
        );
        ensure!(
            self.presence.timeout_seconds > 0,
            "presence.timeout_seconds must be at least 1"
        );
        let formation = &self.formation;
        ensure!(
            formation.min_group_size <= formation.max_group_size,
            "formation.min_group_size ({}) exceeds max_group_size ({})",
            formation.min_group_size,
            formation.max_group_size
        );
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<SquadsConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = SquadsConfig::load_env_file();
        SquadsConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static SquadsConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
