//! PostgreSQL implementation of the ledger store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{BookingRow, DepositRow};
use super::{LedgerError, LedgerStore, ListFilter};
use crate::domain::{
    Booking, BookingId, Deposit, DepositChange, DepositId, NewBooking, NewDeposit, PaymentStatus,
    deposit::normalize_currency,
};

const BOOKING_COLUMNS: &str = "id, name, email, phone, placement, size, style, preferred_dates, \
     budget, details, reference_links, uploads, created_at";

const DEPOSIT_COLUMNS: &str = "id, session_id, email, amount_minor, currency, payment_status, \
     payment_intent_id, provider, mode, metadata, booking_id, created_at, updated_at";

/// PostgreSQL-backed ledger using `sqlx::PgPool`.
///
/// `deposits.session_id` carries a unique constraint; an insert that hits
/// it surfaces as [`LedgerError::Duplicate`].
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a ledger over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Database(e.to_string()))
    }
}

fn db_error(e: sqlx::Error) -> LedgerError {
    LedgerError::Database(e.to_string())
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn status_names(statuses: &[PaymentStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, LedgerError> {
        let booking = booking.into_booking();
        sqlx::query(
            "INSERT INTO bookings (id, name, email, phone, placement, size, style, preferred_dates, \
             budget, details, reference_links, uploads, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id.as_uuid())
        .bind(&booking.name)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(&booking.placement)
        .bind(&booking.size)
        .bind(&booking.style)
        .bind(&booking.preferred_dates)
        .bind(&booking.budget)
        .bind(&booking.details)
        .bind(&booking.references)
        .bind(serde_json::json!(booking.uploads))
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, LedgerError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Booking::from))
    }

    async fn list_bookings(&self, filter: &ListFilter) -> Result<Vec<Booking>, LedgerError> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 \
                    OR placement ILIKE $1 OR size ILIKE $1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at DESC LIMIT $4"
        ))
        .bind(filter.needle().as_deref().map(like_pattern))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit_param(filter.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, LedgerError> {
        let deposit = deposit.into_deposit();
        let result = sqlx::query(
            "INSERT INTO deposits (id, session_id, email, amount_minor, currency, payment_status, \
             payment_intent_id, provider, mode, metadata, booking_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(deposit.id.as_uuid())
        .bind(&deposit.session_id)
        .bind(&deposit.email)
        .bind(deposit.amount_minor)
        .bind(&deposit.currency)
        .bind(deposit.payment_status.as_str())
        .bind(&deposit.payment_intent_id)
        .bind(deposit.provider.as_str())
        .bind(&deposit.mode)
        .bind(&deposit.metadata)
        .bind(deposit.booking_id.map(Uuid::from))
        .bind(deposit.created_at)
        .bind(deposit.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(deposit),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::Duplicate(deposit.session_id))
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn get_deposit(&self, id: DepositId) -> Result<Option<Deposit>, LedgerError> {
        sqlx::query_as::<_, DepositRow>(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Deposit::try_from)
        .transpose()
    }

    async fn find_deposit(
        &self,
        session_id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Deposit>, LedgerError> {
        // Session id match sorts first; the reference match is the fallback.
        sqlx::query_as::<_, DepositRow>(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits \
             WHERE session_id = $1 OR ($2::text IS NOT NULL AND payment_intent_id = $2) \
             ORDER BY (session_id = $1) DESC, created_at DESC LIMIT 1"
        ))
        .bind(session_id)
        .bind(reference.filter(|r| !r.is_empty()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Deposit::try_from)
        .transpose()
    }

    async fn transition_deposit(
        &self,
        id: DepositId,
        from: &[PaymentStatus],
        change: &DepositChange,
    ) -> Result<Option<Deposit>, LedgerError> {
        sqlx::query_as::<_, DepositRow>(&format!(
            "UPDATE deposits SET \
                payment_status = $3, \
                payment_intent_id = COALESCE($4, payment_intent_id), \
                metadata = CASE WHEN $5::jsonb IS NULL THEN metadata \
                                WHEN jsonb_typeof(metadata) = 'object' THEN metadata || $5::jsonb \
                                ELSE $5::jsonb END, \
                email = COALESCE($6, email), \
                amount_minor = COALESCE($7, amount_minor), \
                currency = COALESCE($8, currency), \
                booking_id = COALESCE($9, booking_id), \
                updated_at = now() \
             WHERE id = $1 AND payment_status = ANY($2) \
             RETURNING {DEPOSIT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(status_names(from))
        .bind(change.status.as_str())
        .bind(&change.payment_intent_id)
        .bind(&change.metadata)
        .bind(&change.email)
        .bind(change.amount_minor)
        .bind(change.currency.as_deref().map(normalize_currency))
        .bind(change.booking_id.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Deposit::try_from)
        .transpose()
    }

    async fn list_deposits(&self, filter: &ListFilter) -> Result<Vec<Deposit>, LedgerError> {
        let rows = sqlx::query_as::<_, DepositRow>(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits \
             WHERE ($1::text IS NULL OR email ILIKE $1 OR session_id ILIKE $1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at DESC LIMIT $4"
        ))
        .bind(filter.needle().as_deref().map(like_pattern))
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit_param(filter.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Deposit::try_from).collect()
    }

    async fn deposits_for_booking(&self, id: BookingId) -> Result<Vec<Deposit>, LedgerError> {
        let rows = sqlx::query_as::<_, DepositRow>(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE booking_id = $1 ORDER BY created_at DESC"
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Deposit::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn limit_saturates() {
        assert_eq!(limit_param(usize::MAX), i64::MAX);
        assert_eq!(limit_param(20), 20);
    }

    #[test]
    fn status_names_use_storage_form() {
        assert_eq!(
            status_names(&[PaymentStatus::Pending, PaymentStatus::Failed]),
            vec!["pending".to_string(), "failed".to_string()]
        );
    }
}
