pub mod client;
pub mod orders;
pub mod profit_loss;
pub mod scheduler;
pub mod types;
pub mod venue;

pub use client::{AlpacaClient, AlpacaClientConfig, OrderAck};
pub use profit_loss::CLOSED_ORDER_WINDOW;
pub use scheduler::{next_interval_time, PriceCheckCallback, SchedulerClient};
pub use types::{AccountBalance, AssetMetadata, ClosedOrder, Position};
pub use venue::AlpacaVenue;
