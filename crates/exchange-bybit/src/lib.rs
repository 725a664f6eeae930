pub mod auth;
pub mod client;
pub mod profit_loss;
pub mod venue;

pub use client::{
    BybitClient, BybitClientConfig, Execution, InstrumentInfo, MarketUnit, OrderAck,
    BYBIT_MAINNET_URL, BYBIT_TESTNET_URL,
};
pub use profit_loss::EXECUTION_WINDOW;
pub use venue::BybitVenue;
