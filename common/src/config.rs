use serde::de::DeserializeOwned;

/// Prefix for environment variable overrides. Nested keys use a double
/// underscore, e.g. `PORTAL_LOGGING__LEVEL` maps to `logging.level`.
pub const ENV_PREFIX: &str = "PORTAL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// The log level to use, this is a tracing env filter
    pub level: String,

    /// Emit logs as json instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// The path to the TLS certificate
    pub cert: String,

    /// The path to the TLS private key
    pub key: String,
}

/// Loads a config by layering an optional TOML file under environment
/// variables. Environment always wins.
///
/// The file path is taken from `PORTAL_CONFIG_FILE` if set, otherwise from
/// `default_config_file`. A missing file is not an error, unknown files are
/// simply skipped so fresh checkouts run on defaults.
pub fn parse<C: DeserializeOwned>(
    default_config_file: Option<String>,
) -> Result<(C, Option<String>), ConfigError> {
    let config_file = std::env::var(format!("{ENV_PREFIX}_CONFIG_FILE"))
        .ok()
        .or(default_config_file);

    let mut builder = config::Config::builder();

    if let Some(file) = &config_file {
        builder = builder.add_source(config::File::with_name(file).required(false));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Ok((config, config_file))
}
