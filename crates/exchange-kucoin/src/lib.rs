pub mod auth;
pub mod client;
pub mod profit_loss;
pub mod venue;

pub use client::{Fill, KucoinClient, KucoinClientConfig, MarketAmount, OrderAck, SymbolInfo};
pub use venue::KucoinVenue;
