use crate::handlers;
use axum::{routing::get, routing::post, Router};
use pair_trade_alpaca::AlpacaVenue;
use pair_trade_bybit::BybitVenue;
use pair_trade_core::orchestrator::PairTradeOrchestrator;
use pair_trade_kucoin::KucoinVenue;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared router state. A `None` venue means its credentials were not
/// configured; the routes still exist and acknowledge alerts.
#[derive(Default)]
pub struct AppState {
    pub alpaca: Option<PairTradeOrchestrator<AlpacaVenue>>,
    pub bybit: Option<PairTradeOrchestrator<BybitVenue>>,
    pub kucoin: Option<PairTradeOrchestrator<KucoinVenue>>,
}

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/webhook/alpaca/buy", post(handlers::alpaca_buy))
            .route("/webhook/alpaca/sell", post(handlers::alpaca_sell))
            .route(
                "/webhook/alpaca/sell-no-tax",
                post(handlers::alpaca_sell_no_tax),
            )
            .route("/webhook/bybit/buy", post(handlers::bybit_buy))
            .route("/webhook/bybit/sell", post(handlers::bybit_sell))
            .route(
                "/webhook/bybit/sell-no-tax",
                post(handlers::bybit_sell_no_tax),
            )
            .route("/webhook/kucoin/buy", post(handlers::kucoin_buy))
            .route("/webhook/kucoin/sell", post(handlers::kucoin_sell))
            .route(
                "/webhook/kucoin/sell-no-tax",
                post(handlers::kucoin_sell_no_tax),
            )
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn unconfigured_router() -> Router {
        ApiServer::new(AppState::default()).router()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let response = unconfigured_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "ok");
    }

    #[tokio::test]
    async fn buy_route_acknowledges_even_without_a_configured_venue() {
        let request = Request::post("/webhook/alpaca/buy")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"ticker":"TSLT"}"#))
            .unwrap();
        let response = unconfigured_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "order request received");
    }

    #[tokio::test]
    async fn sell_route_echoes_the_alert() {
        let request = Request::post("/webhook/kucoin/sell")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"ticker":"BTC-USDT"}"#))
            .unwrap();
        let response = unconfigured_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "sell alert for BTC-USDT received"
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_before_dispatch() {
        let request = Request::post("/webhook/bybit/sell")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"symbol":"BTCUSDT"}"#))
            .unwrap();
        let response = unconfigured_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
