//! Equities trading-session calendar checks.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::US::Eastern;

/// Regular session open, 9:30 AM ET.
const SESSION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Regular session close, 4:00 PM ET.
const SESSION_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Whether `now` falls outside the regular NASDAQ session (9:30 AM to
/// 4:00 PM Eastern). Outside the session the orchestrator switches from
/// market to limit execution with a slippage tolerance.
///
/// Weekends and exchange holidays are not modelled; the venue rejects
/// orders it cannot take, and the response is logged like any other
/// degraded call.
#[must_use]
pub fn is_outside_equity_trading_hours(now: DateTime<Utc>) -> bool {
    let eastern = now.with_timezone(&Eastern).time();
    eastern < SESSION_OPEN || eastern > SESSION_CLOSE
}
