//! Ledger store: durable storage of bookings and deposits.
//!
//! [`LedgerStore`] is the seam between the payment services and storage.
//! [`postgres::PostgresLedger`] backs production; [`memory::InMemoryLedger`]
//! backs tests and persistence-disabled deployments. Both enforce the
//! unique deposit `session_id`, which is what makes reconciliation
//! idempotent under racing callbacks.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Booking, BookingId, Deposit, DepositChange, DepositId, NewBooking, NewDeposit, PaymentStatus,
};

pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;

/// Ledger failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A deposit with this session id already exists.
    #[error("deposit with session id {0} already exists")]
    Duplicate(String),

    /// The database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back to a domain value.
    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

/// Search and date-range filter for admin list views.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Case-insensitive substring match on the searchable columns.
    pub query: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of rows, newest first.
    pub limit: usize,
}

impl ListFilter {
    /// Normalised, lower-cased search needle; `None` when blank.
    #[must_use]
    pub fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether `created_at` falls inside the date range.
    #[must_use]
    pub fn in_range(&self, created_at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| created_at >= from)
            && self.to.is_none_or(|to| created_at <= to)
    }
}

/// Persistence operations required by the booking and payment services.
#[async_trait]
pub trait LedgerStore: Send + Sync + std::fmt::Debug {
    /// Stores a new booking.
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, LedgerError>;

    /// Fetches a booking by id.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, LedgerError>;

    /// Lists bookings newest first.
    async fn list_bookings(&self, filter: &ListFilter) -> Result<Vec<Booking>, LedgerError>;

    /// Stores a new deposit.
    ///
    /// Fails with [`LedgerError::Duplicate`] if the session id is taken.
    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, LedgerError>;

    /// Fetches a deposit by id.
    async fn get_deposit(&self, id: DepositId) -> Result<Option<Deposit>, LedgerError>;

    /// Looks a deposit up by session id, falling back to the stored
    /// processor reference.
    async fn find_deposit(
        &self,
        session_id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Deposit>, LedgerError>;

    /// Applies `change` only if the deposit's current status is one of
    /// `from`. Returns `None` when the row is missing or in another status.
    async fn transition_deposit(
        &self,
        id: DepositId,
        from: &[PaymentStatus],
        change: &DepositChange,
    ) -> Result<Option<Deposit>, LedgerError>;

    /// Lists deposits newest first.
    async fn list_deposits(&self, filter: &ListFilter) -> Result<Vec<Deposit>, LedgerError>;

    /// Deposits linked to a booking, newest first.
    async fn deposits_for_booking(&self, id: BookingId) -> Result<Vec<Deposit>, LedgerError>;
}
