pub mod config;
pub mod config_loader;
pub mod error;
pub mod hours;
pub mod orchestrator;
pub mod pairs;
pub mod poll;
pub mod sizing;
pub mod tax;
pub mod traits;
pub mod types;

pub use config::{Accounts, AppConfig, ServerConfig, TradingConfig};
pub use config_loader::ConfigLoader;
pub use error::{ProfitLossError, VenueError};
pub use hours::is_outside_equity_trading_hours;
pub use orchestrator::{AlertCommand, OrchestratorError, PairTradeOrchestrator};
pub use pairs::{PairError, PairSymbols, SpotPair, TradingPairMap};
pub use poll::BoundedPoll;
pub use sizing::SizingError;
pub use tax::TaxKind;
pub use traits::PairTradeVenue;
pub use types::{AccountName, OrderIntent, OrderSide, OrderSizing, Quote, TimeInForce};
