//! In-process ledger backed by hash maps.
//!
//! [`InMemoryLedger`] keeps every table behind one [`tokio::sync::RwLock`].
//! The session-id index is checked and written under the same write lock as
//! the row, which gives it the same uniqueness guarantee as the PostgreSQL
//! constraint.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LedgerError, LedgerStore, ListFilter};
use crate::domain::{
    Booking, BookingId, Deposit, DepositChange, DepositId, NewBooking, NewDeposit, PaymentStatus,
};

#[derive(Debug, Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    deposits: HashMap<DepositId, Deposit>,
    sessions: HashMap<String, DepositId>,
}

/// Ledger kept in process memory.
///
/// Contents are lost on restart; use it for tests and local runs with
/// `PERSISTENCE_ENABLED=false`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    tables: RwLock<Tables>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored deposits.
    pub async fn deposit_count(&self) -> usize {
        self.tables.read().await.deposits.len()
    }
}

fn newest_first<T>(
    mut rows: Vec<T>,
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    limit: usize,
) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows.truncate(limit);
    rows
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, LedgerError> {
        let booking = booking.into_booking();
        self.tables
            .write()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, LedgerError> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &ListFilter) -> Result<Vec<Booking>, LedgerError> {
        let needle = filter.needle();
        let tables = self.tables.read().await;
        let rows = tables
            .bookings
            .values()
            .filter(|b| filter.in_range(b.created_at))
            .filter(|b| {
                needle.as_deref().is_none_or(|n| {
                    contains(&b.name, n)
                        || contains(&b.email, n)
                        || contains(&b.placement, n)
                        || contains(&b.size, n)
                })
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |b: &Booking| b.created_at, filter.limit))
    }

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, LedgerError> {
        let deposit = deposit.into_deposit();
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&deposit.session_id) {
            return Err(LedgerError::Duplicate(deposit.session_id));
        }
        tables
            .sessions
            .insert(deposit.session_id.clone(), deposit.id);
        tables.deposits.insert(deposit.id, deposit.clone());
        Ok(deposit)
    }

    async fn get_deposit(&self, id: DepositId) -> Result<Option<Deposit>, LedgerError> {
        Ok(self.tables.read().await.deposits.get(&id).cloned())
    }

    async fn find_deposit(
        &self,
        session_id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Deposit>, LedgerError> {
        let tables = self.tables.read().await;
        if let Some(found) = tables
            .sessions
            .get(session_id)
            .and_then(|id| tables.deposits.get(id))
        {
            return Ok(Some(found.clone()));
        }
        let Some(reference) = reference.filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        Ok(tables
            .deposits
            .values()
            .filter(|d| d.payment_intent_id.as_deref() == Some(reference))
            .max_by_key(|d| d.created_at)
            .cloned())
    }

    async fn transition_deposit(
        &self,
        id: DepositId,
        from: &[PaymentStatus],
        change: &DepositChange,
    ) -> Result<Option<Deposit>, LedgerError> {
        let mut tables = self.tables.write().await;
        let Some(deposit) = tables.deposits.get_mut(&id) else {
            return Ok(None);
        };
        if !from.contains(&deposit.payment_status) {
            return Ok(None);
        }
        change.apply(deposit);
        Ok(Some(deposit.clone()))
    }

    async fn list_deposits(&self, filter: &ListFilter) -> Result<Vec<Deposit>, LedgerError> {
        let needle = filter.needle();
        let tables = self.tables.read().await;
        let rows = tables
            .deposits
            .values()
            .filter(|d| filter.in_range(d.created_at))
            .filter(|d| {
                needle.as_deref().is_none_or(|n| {
                    d.email.as_deref().is_some_and(|e| contains(e, n))
                        || contains(&d.session_id, n)
                })
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |d: &Deposit| d.created_at, filter.limit))
    }

    async fn deposits_for_booking(&self, id: BookingId) -> Result<Vec<Deposit>, LedgerError> {
        let tables = self.tables.read().await;
        let rows = tables
            .deposits
            .values()
            .filter(|d| d.booking_id == Some(id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |d: &Deposit| d.created_at, usize::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Provider;

    fn pending(session_id: &str) -> NewDeposit {
        NewDeposit {
            session_id: session_id.to_string(),
            email: Some("ada@example.com".to_string()),
            amount_minor: 1000,
            currency: "usd".to_string(),
            payment_status: PaymentStatus::Pending,
            payment_intent_id: Some(format!("order_{session_id}")),
            provider: Provider::OrderGateway,
            mode: Some("sandbox".to_string()),
            metadata: serde_json::json!({}),
            booking_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_session_is_rejected() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.insert_deposit(pending("T1")).await.is_ok());

        let second = ledger.insert_deposit(pending("T1")).await;
        assert!(matches!(second, Err(LedgerError::Duplicate(ref s)) if s == "T1"));
        assert_eq!(ledger.deposit_count().await, 1);
    }

    #[tokio::test]
    async fn find_falls_back_to_reference() {
        let ledger = InMemoryLedger::new();
        let Ok(stored) = ledger.insert_deposit(pending("T1")).await else {
            panic!("insert failed");
        };

        let by_session = ledger.find_deposit("T1", None).await.ok().flatten();
        assert_eq!(by_session.map(|d| d.id), Some(stored.id));

        let by_reference = ledger
            .find_deposit("unknown", Some("order_T1"))
            .await
            .ok()
            .flatten();
        assert_eq!(by_reference.map(|d| d.id), Some(stored.id));

        let missing = ledger.find_deposit("unknown", Some("")).await.ok().flatten();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn transition_respects_expected_status() {
        let ledger = InMemoryLedger::new();
        let Ok(stored) = ledger.insert_deposit(pending("T1")).await else {
            panic!("insert failed");
        };

        let refund = DepositChange::to_status(PaymentStatus::Refunded);
        let refused = ledger
            .transition_deposit(stored.id, &[PaymentStatus::Completed], &refund)
            .await;
        assert!(matches!(refused, Ok(None)));

        let complete = DepositChange::to_status(PaymentStatus::Completed);
        let Ok(Some(updated)) = ledger
            .transition_deposit(stored.id, &[PaymentStatus::Pending], &complete)
            .await
        else {
            panic!("transition should apply");
        };
        assert_eq!(updated.payment_status, PaymentStatus::Completed);
        assert_eq!(updated.currency, "USD");
    }

    #[tokio::test]
    async fn list_deposits_filters_by_email_or_session() {
        let ledger = InMemoryLedger::new();
        let _ = ledger.insert_deposit(pending("T1")).await;
        let mut other = pending("SESSION-XYZ");
        other.email = Some("bob@example.com".to_string());
        let _ = ledger.insert_deposit(other).await;

        let filter = ListFilter {
            query: Some("xyz".to_string()),
            limit: 10,
            ..ListFilter::default()
        };
        let Ok(rows) = ledger.list_deposits(&filter).await else {
            panic!("list failed");
        };
        assert_eq!(rows.len(), 1);

        let all = ListFilter {
            limit: 10,
            ..ListFilter::default()
        };
        assert_eq!(ledger.list_deposits(&all).await.map(|r| r.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn bookings_are_searchable() {
        let ledger = InMemoryLedger::new();
        let booking = NewBooking {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            placement: "Forearm".to_string(),
            size: "palm".to_string(),
            details: "fern".to_string(),
            ..NewBooking::default()
        };
        let Ok(stored) = ledger.insert_booking(booking).await else {
            panic!("insert failed");
        };

        let filter = ListFilter {
            query: Some("FOREARM".to_string()),
            limit: 10,
            ..ListFilter::default()
        };
        let rows = ledger.list_bookings(&filter).await.unwrap_or_default();
        assert_eq!(rows.first().map(|b| b.id), Some(stored.id));
        assert!(ledger.get_booking(stored.id).await.ok().flatten().is_some());
    }
}
