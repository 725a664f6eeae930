//! Request signing for the Bybit v5 REST API.
//!
//! Every private request carries four headers: the API key, a
//! millisecond timestamp, the receive window, and an HMAC-SHA256
//! signature over `timestamp + api_key + recv_window + payload`, where
//! the payload is the query string for GETs and the JSON body for POSTs.

use hmac::{Hmac, Mac};
use pair_trade_core::error::VenueError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Receive window sent with every signed request, in milliseconds.
pub const RECV_WINDOW: &str = "5000";

/// Signed header set for one request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub recv_window: &'static str,
    pub signature: String,
}

impl SignedHeaders {
    /// Header name/value pairs in submission order.
    #[must_use]
    pub fn as_tuples(&self) -> [(&'static str, &str); 4] {
        [
            ("X-BAPI-API-KEY", self.api_key.as_str()),
            ("X-BAPI-TIMESTAMP", self.timestamp.as_str()),
            ("X-BAPI-RECV-WINDOW", self.recv_window),
            ("X-BAPI-SIGN", self.signature.as_str()),
        ]
    }
}

/// Signs one request payload at the given millisecond timestamp.
///
/// # Errors
/// Returns [`VenueError::Serialization`] when the secret cannot key the
/// MAC.
pub fn sign(
    api_key: &str,
    api_secret: &str,
    timestamp_ms: i64,
    payload: &str,
) -> Result<SignedHeaders, VenueError> {
    let timestamp = timestamp_ms.to_string();
    let message = format!("{timestamp}{api_key}{RECV_WINDOW}{payload}");
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| VenueError::Serialization(format!("invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(SignedHeaders {
        api_key: api_key.to_string(),
        timestamp,
        recv_window: RECV_WINDOW,
        signature,
    })
}
