//! Application configuration.
//!
//! Everything the orchestrators need — tax rates, capital fraction,
//! development mode, venue credentials, and trading-pair maps — is loaded
//! once at startup and passed in explicitly. Nothing reads ambient
//! mutable state after that.

use crate::pairs::TradingPairMap;
use crate::types::AccountName;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub trading: TradingConfig,
    #[serde(default)]
    pub alpaca: AlpacaConfig,
    #[serde(default)]
    pub bybit: BybitConfig,
    #[serde(default)]
    pub kucoin: KucoinConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Process-wide trading knobs, passed into each orchestrator at
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Capital-gains rate applied to equities profits.
    pub capital_gains_tax_rate: Decimal,
    /// Personal income rate applied to crypto profits.
    pub income_tax_rate: Decimal,
    /// Fraction of deployable capital committed per alert.
    pub capital_to_deploy: Decimal,
    /// Forces paper/testnet credentials for every venue when set.
    pub development_mode: bool,
}

/// Credential table for one venue: at most one live and one paper entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accounts<C> {
    pub live: Option<C>,
    pub paper: Option<C>,
}

// Manual impl: the derive would demand C: Default, which credentials
// deliberately don't provide.
impl<C> Default for Accounts<C> {
    fn default() -> Self {
        Self {
            live: None,
            paper: None,
        }
    }
}

impl<C> Accounts<C> {
    /// Resolves credentials as a pure function of the requested account
    /// and the development-mode flag. Development mode always yields the
    /// paper entry.
    #[must_use]
    pub fn resolve(&self, account: AccountName, development_mode: bool) -> Option<&C> {
        if development_mode {
            return self.paper.as_ref();
        }
        match account {
            AccountName::Live => self.live.as_ref(),
            AccountName::Paper => self.paper.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaCredentials {
    pub endpoint: String,
    pub key: String,
    pub secret: String,
    pub paper: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaConfig {
    /// Market-data API endpoint, shared by live and paper accounts.
    pub data_endpoint: String,
    pub accounts: Accounts<AlpacaCredentials>,
    pub pairs: TradingPairMap,
    /// Slippage fraction added to the resting price for extended-hours
    /// limit orders.
    pub aftermarket_slippage: Decimal,
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            data_endpoint: "https://data.alpaca.markets".to_string(),
            accounts: Accounts::default(),
            pairs: TradingPairMap::default(),
            aftermarket_slippage: dec!(0.001),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BybitCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BybitConfig {
    pub accounts: Accounts<BybitCredentials>,
    pub pairs: TradingPairMap,
    /// Stablecoin that closed positions settle into.
    pub preferred_stablecoin: String,
    /// Pair traded to convert booked tax into a stablecoin holding.
    pub tax_pair: String,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            accounts: Accounts::default(),
            pairs: TradingPairMap::default(),
            preferred_stablecoin: "USDT".to_string(),
            tax_pair: "USDC-USDT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KucoinCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KucoinConfig {
    pub endpoint: String,
    pub accounts: Accounts<KucoinCredentials>,
    pub pairs: TradingPairMap,
    pub preferred_stablecoin: String,
    pub tax_pair: String,
}

impl Default for KucoinConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.kucoin.com".to_string(),
            accounts: Accounts::default(),
            pairs: TradingPairMap::default(),
            preferred_stablecoin: "USDT".to_string(),
            tax_pair: "USDC-USDT".to_string(),
        }
    }
}

/// External scheduling collaborator for the extended-hours price-check
/// flow. Delivery guarantees belong to that service, not to this core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    /// Webhook endpoint the delayed price-check callback is posted to.
    pub callback_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            trading: TradingConfig {
                capital_gains_tax_rate: dec!(0.26375),
                income_tax_rate: dec!(0.42),
                capital_to_deploy: dec!(0.33),
                development_mode: false,
            },
            alpaca: AlpacaConfig::default(),
            bybit: BybitConfig::default(),
            kucoin: KucoinConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}
