use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging TOML and environment
    /// variables, then validates the trading-pair maps.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be read or parsed, or if
    /// a pair map violates the inverse-symmetry invariant.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads configuration from a specific TOML file path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be read or parsed, or if
    /// a pair map violates the inverse-symmetry invariant.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PAIR_TRADE_").split("__"))
            .extract()?;

        config.alpaca.pairs.validate()?;
        config.bybit.pairs.validate()?;
        config.kucoin.pairs.validate()?;

        Ok(config)
    }
}
