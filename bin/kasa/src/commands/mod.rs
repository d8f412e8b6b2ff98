pub mod chat;
pub mod init;
pub mod serve;

use kasa_core::{Config, Paths};

/// Load the config file (or defaults) and overlay environment credentials.
/// Every component downstream receives the resolved values explicitly.
pub(crate) fn load_config() -> anyhow::Result<Config> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    config.apply_env_overrides();
    Ok(config)
}
