//! Append-only ledger of realized profit and the tax owed on it.
//!
//! Every taxed close appends one row carrying a running total, so the
//! current tax liability is always the most recent row rather than a
//! scan-and-sum. Rows live under a single partition and are ordered by
//! transaction date, mirroring the single-table layout of the hosted
//! store this backs onto in production.

pub mod memory;

pub use memory::InMemoryLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Partition key shared by every row; the date-ordered index over this
/// partition is what makes "latest row" a single bounded query.
pub const LEDGER_PARTITION: &str = "ALL";

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The backing store could not be read or written.
    #[error("ledger storage error: {0}")]
    Storage(String),
}

/// One booked tax amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Symbol whose close produced this row.
    pub asset: String,
    /// When the row was booked.
    pub transaction_date: DateTime<Utc>,
    /// The amount booked by this row, floored to cents.
    pub amount: Decimal,
    /// Cumulative amount across all rows up to and including this one.
    pub running_total: Decimal,
}

/// The ledger contract the equities venue books tax through.
#[async_trait]
pub trait ProfitLedger: Send + Sync {
    /// Running total of the most recent row, zero when the ledger is
    /// empty. With an asset the most recent row for that asset is read;
    /// without one, the most recent row across all assets via the shared
    /// partition's chronological index.
    ///
    /// # Errors
    /// Returns [`LedgerError::Storage`] when the backing store cannot be
    /// read.
    async fn last_running_total(&self, asset: Option<&str>) -> Result<Decimal, LedgerError>;

    /// Appends one row dated `date`. The amount is floored to whole
    /// cents before it joins the running total. The write is never read
    /// back for verification.
    ///
    /// # Errors
    /// Returns [`LedgerError::Storage`] when the backing store cannot be
    /// written.
    async fn append(
        &self,
        asset: &str,
        date: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<LedgerEntry, LedgerError>;
}
