//! Webhook handlers: one per (venue, direction, tax-toggle) tuple.
//!
//! Every route answers 200 with a JSON acknowledgement no matter what
//! happened downstream; a caller cannot tell a placed order from a
//! skipped one. Sell and no-tax routes echo the alert back in the
//! acknowledgement, the buy routes answer a bare message.

use crate::server::AppState;
use axum::{extract::State, Json};
use pair_trade_core::orchestrator::{AlertCommand, PairTradeOrchestrator};
use pair_trade_core::traits::PairTradeVenue;
use pair_trade_core::types::{AccountName, OrderSide};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Inbound webhook payload. Only the ticker is required; the account
/// defaults to live.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAlert {
    pub ticker: String,
    #[serde(default)]
    pub account: Option<AccountName>,
}

/// Acknowledgement returned by every route.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}

async fn dispatch<V: PairTradeVenue>(
    orchestrator: Option<&PairTradeOrchestrator<V>>,
    venue: &str,
    alert: WebhookAlert,
    direction: OrderSide,
    calculate_tax: bool,
    echo: bool,
) -> Json<AckResponse> {
    let message = if echo {
        format!("{} alert for {} received", direction.as_str(), alert.ticker)
    } else {
        "order request received".to_string()
    };

    let Some(orchestrator) = orchestrator else {
        warn!(venue, ticker = %alert.ticker, "venue not configured, alert dropped");
        return Json(AckResponse { message });
    };

    let mut command = AlertCommand::new(alert.ticker.clone(), direction);
    command.calculate_tax = calculate_tax;
    command.account = alert.account.unwrap_or(AccountName::Live);

    match orchestrator.execute(&command).await {
        Ok(()) => info!(venue, ticker = %alert.ticker, "alert processed"),
        Err(err) => {
            // Still a 200: the webhook contract never surfaces failures.
            error!(venue, ticker = %alert.ticker, error = %err, "alert failed");
        }
    }
    Json(AckResponse { message })
}

macro_rules! webhook_handler {
    ($name:ident, $venue_field:ident, $venue:literal, $direction:expr, $tax:expr, $echo:expr) => {
        pub async fn $name(
            State(state): State<Arc<AppState>>,
            Json(alert): Json<WebhookAlert>,
        ) -> Json<AckResponse> {
            dispatch(
                state.$venue_field.as_ref(),
                $venue,
                alert,
                $direction,
                $tax,
                $echo,
            )
            .await
        }
    };
}

webhook_handler!(alpaca_buy, alpaca, "alpaca", OrderSide::Buy, true, false);
webhook_handler!(alpaca_sell, alpaca, "alpaca", OrderSide::Sell, true, true);
webhook_handler!(
    alpaca_sell_no_tax,
    alpaca,
    "alpaca",
    OrderSide::Sell,
    false,
    true
);
webhook_handler!(bybit_buy, bybit, "bybit", OrderSide::Buy, true, false);
webhook_handler!(bybit_sell, bybit, "bybit", OrderSide::Sell, true, true);
webhook_handler!(
    bybit_sell_no_tax,
    bybit,
    "bybit",
    OrderSide::Sell,
    false,
    true
);
webhook_handler!(kucoin_buy, kucoin, "kucoin", OrderSide::Buy, true, false);
webhook_handler!(kucoin_sell, kucoin, "kucoin", OrderSide::Sell, true, true);
webhook_handler!(
    kucoin_sell_no_tax,
    kucoin,
    "kucoin",
    OrderSide::Sell,
    false,
    true
);

/// Liveness probe.
pub async fn health() -> Json<AckResponse> {
    Json(AckResponse {
        message: "ok".to_string(),
    })
}
