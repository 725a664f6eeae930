//! In-process ledger used in development mode and in tests.

use crate::{LedgerEntry, LedgerError, ProfitLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pair_trade_core::tax::floor_to_cents;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

/// Ledger rows held in memory behind a read-write lock. Appends hold the
/// write lock for the whole read-total-then-push step, so the running
/// total recurrence stays consistent under concurrent alerts.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows in append order.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl ProfitLedger for InMemoryLedger {
    async fn last_running_total(&self, asset: Option<&str>) -> Result<Decimal, LedgerError> {
        let entries = self.entries.read();
        let last = match asset {
            Some(asset) => entries.iter().rev().find(|entry| entry.asset == asset),
            None => entries.last(),
        };
        Ok(last.map_or(Decimal::ZERO, |entry| entry.running_total))
    }

    async fn append(
        &self,
        asset: &str,
        date: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<LedgerEntry, LedgerError> {
        let amount = floor_to_cents(amount);
        let mut entries = self.entries.write();
        let previous = entries
            .last()
            .map_or(Decimal::ZERO, |entry| entry.running_total);
        let entry = LedgerEntry {
            asset: asset.to_string(),
            transaction_date: date,
            amount,
            running_total: previous + amount,
        };
        debug!(asset, %entry.amount, %entry.running_total, "ledger row appended");
        entries.push(entry.clone());
        Ok(entry)
    }
}
