//! Extended-hours price-check scheduling.
//!
//! Price checks during the extended session run on a fixed interval grid
//! between 04:00 and 19:45 US/Eastern. The next slot is computed here;
//! actually delivering the delayed callback belongs to an external
//! scheduling service that accepts a target time and a payload.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::US::Eastern;
use pair_trade_core::config::SchedulerConfig;
use pair_trade_core::error::VenueError;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;

/// First interval slot of the extended session, Eastern time.
const SESSION_FIRST_SLOT_MINUTES: i64 = 4 * 60;

/// Last interval slot of the extended session (19:45 Eastern).
const SESSION_LAST_SLOT_MINUTES: i64 = 19 * 60 + 45;

/// Slot used when the session is over for the day: 04:15 the next day.
const NEXT_DAY_SLOT_MINUTES: i64 = 4 * 60 + 15;

/// Computes the next price-check slot strictly after `now` on an
/// `interval_minutes` grid anchored at 04:00 Eastern. Outside the
/// 04:00–19:45 session the next slot is 04:15, same day before the
/// session opens, next day after the last slot has passed.
#[must_use]
pub fn next_interval_time(now: DateTime<Utc>, interval_minutes: i64) -> DateTime<Utc> {
    let eastern_now = now.with_timezone(&Eastern);
    let minute_of_day = eastern_now
        .time()
        .signed_duration_since(midnight())
        .num_minutes();

    let (day_offset, slot_minutes) = if minute_of_day < SESSION_FIRST_SLOT_MINUTES {
        (0, NEXT_DAY_SLOT_MINUTES)
    } else {
        let elapsed = minute_of_day - SESSION_FIRST_SLOT_MINUTES;
        let next = SESSION_FIRST_SLOT_MINUTES + (elapsed / interval_minutes + 1) * interval_minutes;
        if next > SESSION_LAST_SLOT_MINUTES {
            (1, NEXT_DAY_SLOT_MINUTES)
        } else {
            (0, next)
        }
    };

    let date = eastern_now.date_naive() + Duration::days(day_offset);
    let naive = date.and_time(midnight()) + Duration::minutes(slot_minutes);
    // earliest() only misses inside the spring-forward gap; shifting an
    // hour lands on a real wall-clock time.
    match Eastern.from_local_datetime(&naive).earliest() {
        Some(slot) => slot.with_timezone(&Utc),
        None => match Eastern.from_local_datetime(&(naive + Duration::hours(1))).earliest() {
            Some(slot) => slot.with_timezone(&Utc),
            None => now,
        },
    }
}

fn midnight() -> NaiveTime {
    match NaiveTime::from_hms_opt(0, 0, 0) {
        Some(t) => t,
        None => unreachable!(),
    }
}

/// Payload delivered back to the price-check webhook at the scheduled
/// time.
#[derive(Debug, Clone, Serialize)]
pub struct PriceCheckCallback {
    pub ticker: String,
    pub price: Decimal,
}

/// Client for the external delayed-delivery scheduling service.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    endpoint: String,
    token: String,
    callback_endpoint: String,
    http: Client,
}

impl SchedulerClient {
    /// Builds a client when the scheduler is fully configured; `None`
    /// disables the price-check flow.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let token = config.token.clone()?;
        let callback_endpoint = config.callback_endpoint.clone()?;
        Some(Self {
            endpoint,
            token,
            callback_endpoint,
            http: Client::new(),
        })
    }

    /// Schedules one delayed price-check callback. Delivery and retry
    /// policy belong to the scheduling service.
    ///
    /// # Errors
    /// Returns [`VenueError`] on transport or API failure.
    pub async fn schedule_price_check(
        &self,
        callback: &PriceCheckCallback,
        not_before: DateTime<Utc>,
    ) -> Result<(), VenueError> {
        let url = format!("{}/v2/publish/{}", self.endpoint, self.callback_endpoint);
        tracing::debug!(ticker = %callback.ticker, %not_before, "scheduling price check");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Upstash-Not-Before", not_before.timestamp().to_string())
            .json(callback)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VenueError::api(status.as_u16(), message));
        }
        Ok(())
    }
}
