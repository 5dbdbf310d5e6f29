use config::{Config, Environment, File};
use relay_events::HubConfig;
use relay_logger::LoggerConfig;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

const DEFAULT_CONFIG: &str = "relay";
const ENV_PREFIX: &str = "RELAY";

#[relay_derive::relay_error]
pub(crate) enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Everything the `relay` binary reads at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    pub(crate) hub: HubConfig,
    pub(crate) logger: LoggerConfig,
    pub(crate) demo: DemoConfig,
}

/// Shape of the fan-out demo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DemoConfig {
    /// Emitted in order.
    pub(crate) events: Vec<u64>,
    /// The filtered listener only sees events `>= threshold`.
    pub(crate) threshold: u64,
    /// The short-lived listener is stopped after this many emissions.
    pub(crate) stop_after: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            events: vec![5, 4, 9, 1, 2, 2, 10, 120, 100, 1, 3, 4],
            threshold: 100,
            stop_after: 2,
        }
    }
}

/// Loads `T` from a config file overlaid with `RELAY__`-prefixed environment
/// variables (`RELAY__HUB__DELIVERY_TIMEOUT_MS` maps to `hub.delivery_timeout_ms`).
///
/// An explicit `path` must exist. Without one, `relay.{toml,json,yaml,..}` in
/// the working directory is used when present and defaults apply otherwise.
///
/// # Errors
/// Returns [`ConfigError::Config`] when the file is missing (explicit path
/// only), malformed, or does not match `T`.
pub(crate) fn load_config<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (file, required) = path.map_or((Path::new(DEFAULT_CONFIG), false), |p| (p, true));

    let builder = Config::builder()
        .add_source(File::from(file).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .convert_case(config::Case::Snake),
        );

    info!(path = %file.display(), required, "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
