//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults from `sg_shared::config`
//! 2. `config.{environment}.toml` in the working directory, if present
//! 3. Environment variables prefixed with `SG__`, nested with `__`
//!    (e.g. `SG__JWT__SECRET`, `SG__CACHE__URL`)
//!
//! A `.env` file is loaded into the process environment first.

use config::{Config, File, FileFormat};
use sg_shared::config::{AppConfig, Environment, LoggingConfig};
use tracing::debug;

use crate::InfrastructureError;

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "SG";

/// Separator between nested configuration keys in environment variables
pub const ENV_SEPARATOR: &str = "__";

/// Load and validate the application configuration
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    let environment = Environment::from_env();
    let file = environment.config_file();
    debug!(%environment, file = %file, "Loading configuration");

    let settings = Config::builder()
        .set_default("environment", environment.to_string())?
        .add_source(File::new(file, FileFormat::Toml).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()?;

    build_app_config(settings)
}

/// Deserialize and validate a built configuration
///
/// Logging defaults follow the resolved environment unless a `logging`
/// table was supplied.
pub fn build_app_config(settings: Config) -> Result<AppConfig, InfrastructureError> {
    let has_logging = settings.get_table("logging").is_ok();
    let mut app: AppConfig = settings.try_deserialize()?;

    if !has_logging {
        app.logging = LoggingConfig::for_environment(app.environment);
    }

    app.validate().map_err(InfrastructureError::Config)?;
    Ok(app)
}
