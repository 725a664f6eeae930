pub mod handlers;
pub mod server;

pub use handlers::{AckResponse, WebhookAlert};
pub use server::{ApiServer, AppState};
