//! Operator views over the ledger and the card refund action.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::export::{self, BookingWithDeposits};
use crate::card::{CardProcessor, CardProcessorError};
use crate::domain::{BookingId, Deposit, DepositChange, DepositId, PaymentStatus, Provider};
use crate::persistence::{LedgerError, LedgerStore, ListFilter};

const BOOKING_LIMIT: usize = 2000;
const DEPOSIT_LIMIT: usize = 4000;

/// Admin operation failure.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// A query parameter could not be parsed.
    #[error("{0}")]
    Validation(String),

    /// `ALLOW_REFUNDS` is off.
    #[error("refunds are disabled")]
    RefundsDisabled,

    /// No card processor key is configured.
    #[error("card processor is not configured")]
    ProcessorNotConfigured,

    /// The booking or deposit does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The deposit carries no payment intent to refund.
    #[error("deposit {0} has no payment intent")]
    NoPaymentIntent(DepositId),

    /// Only completed card deposits can be refunded.
    #[error("deposit {id} is a {status} {provider} deposit; only completed card deposits can be refunded")]
    NotRefundable {
        /// Deposit id.
        id: DepositId,
        /// Current status.
        status: PaymentStatus,
        /// Provider.
        provider: Provider,
    },

    /// The processor refused or failed the refund.
    #[error(transparent)]
    Processor(#[from] CardProcessorError),

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Raw list query parameters.
#[derive(Debug, Clone, Default)]
pub struct AdminQuery {
    /// Search text.
    pub q: Option<String>,
    /// Lower date bound, RFC 3339 or `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Upper date bound, RFC 3339 or `YYYY-MM-DD`.
    pub to: Option<String>,
}

/// Result of a refund.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    /// Processor refund id.
    pub refund_id: String,
    /// Processor refund status.
    pub refund_status: String,
    /// Refunded amount in minor units, when reported.
    pub amount_cents: Option<i64>,
    /// Deposit after the refund.
    pub deposit: Deposit,
}

/// Parses a date bound: RFC 3339, or a bare date meaning midnight UTC.
///
/// # Errors
///
/// [`AdminError::Validation`] when neither form matches.
pub fn parse_date_bound(raw: &str) -> Result<DateTime<Utc>, AdminError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| AdminError::Validation(format!("invalid date: {raw}")))
}

fn bound(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AdminError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_date_bound)
        .transpose()
}

impl AdminQuery {
    fn into_filter(self, limit: usize) -> Result<ListFilter, AdminError> {
        Ok(ListFilter {
            from: bound(self.from.as_deref())?,
            to: bound(self.to.as_deref())?,
            query: self.q,
            limit,
        })
    }
}

/// Admin views and refunds.
#[derive(Debug, Clone)]
pub struct AdminService {
    ledger: Arc<dyn LedgerStore>,
    card: Option<Arc<dyn CardProcessor>>,
    allow_refunds: bool,
}

impl AdminService {
    /// Creates the service. Refunds need both `card` and `allow_refunds`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        card: Option<Arc<dyn CardProcessor>>,
        allow_refunds: bool,
    ) -> Self {
        Self {
            ledger,
            card,
            allow_refunds,
        }
    }

    /// Bookings newest first, each with its deposits.
    ///
    /// # Errors
    ///
    /// Validation errors for bad dates; ledger errors.
    pub async fn list_bookings(
        &self,
        query: AdminQuery,
    ) -> Result<Vec<BookingWithDeposits>, AdminError> {
        let filter = query.into_filter(BOOKING_LIMIT)?;
        let bookings = self.ledger.list_bookings(&filter).await?;
        let mut rows = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let deposits = self.ledger.deposits_for_booking(booking.id).await?;
            rows.push(BookingWithDeposits { booking, deposits });
        }
        Ok(rows)
    }

    /// One booking with its deposits.
    ///
    /// # Errors
    ///
    /// [`AdminError::NotFound`] for an unknown id; ledger errors.
    pub async fn booking_detail(&self, id: BookingId) -> Result<BookingWithDeposits, AdminError> {
        let booking = self
            .ledger
            .get_booking(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("booking {id}")))?;
        let deposits = self.ledger.deposits_for_booking(id).await?;
        Ok(BookingWithDeposits { booking, deposits })
    }

    /// Deposits newest first.
    ///
    /// # Errors
    ///
    /// Validation errors for bad dates; ledger errors.
    pub async fn list_deposits(&self, query: AdminQuery) -> Result<Vec<Deposit>, AdminError> {
        let filter = query.into_filter(DEPOSIT_LIMIT)?;
        Ok(self.ledger.list_deposits(&filter).await?)
    }

    /// Bookings as CSV.
    ///
    /// # Errors
    ///
    /// As [`AdminService::list_bookings`].
    pub async fn export_bookings_csv(&self, query: AdminQuery) -> Result<String, AdminError> {
        Ok(export::bookings_csv(&self.list_bookings(query).await?))
    }

    /// Deposits as CSV.
    ///
    /// # Errors
    ///
    /// As [`AdminService::list_deposits`].
    pub async fn export_deposits_csv(&self, query: AdminQuery) -> Result<String, AdminError> {
        Ok(export::deposits_csv(&self.list_deposits(query).await?))
    }

    /// Refunds a completed card deposit, in full when `amount_minor` is
    /// `None`, then marks it `refunded`.
    ///
    /// # Errors
    ///
    /// See [`AdminError`]; checks run in declaration order and the
    /// processor is only called once all of them pass.
    pub async fn refund(
        &self,
        deposit_id: DepositId,
        amount_minor: Option<i64>,
    ) -> Result<RefundOutcome, AdminError> {
        if !self.allow_refunds {
            return Err(AdminError::RefundsDisabled);
        }
        let Some(card) = &self.card else {
            return Err(AdminError::ProcessorNotConfigured);
        };
        if amount_minor.is_some_and(|amount| amount <= 0) {
            return Err(AdminError::Validation(
                "amountCents must be positive".to_string(),
            ));
        }

        let deposit = self
            .ledger
            .get_deposit(deposit_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("deposit {deposit_id}")))?;
        let Some(payment_intent) = deposit.payment_intent_id.clone() else {
            return Err(AdminError::NoPaymentIntent(deposit_id));
        };
        if deposit.provider != Provider::Card || deposit.payment_status != PaymentStatus::Completed
        {
            return Err(AdminError::NotRefundable {
                id: deposit_id,
                status: deposit.payment_status,
                provider: deposit.provider,
            });
        }

        let refund = card
            .create_refund(&payment_intent, amount_minor)
            .await
            .map_err(|e| {
                tracing::error!(deposit_id = %deposit_id, error = %e, "refund failed");
                AdminError::from(e)
            })?;
        tracing::info!(
            deposit_id = %deposit_id,
            refund_id = %refund.id,
            refund_status = %refund.status,
            "refund issued"
        );

        let change = DepositChange {
            metadata: Some(serde_json::json!({
                "refundId": refund.id,
                "refundStatus": refund.status,
                "refundAmountCents": refund.amount_minor,
            })),
            ..DepositChange::to_status(PaymentStatus::Refunded)
        };
        let updated = self
            .ledger
            .transition_deposit(deposit_id, &[PaymentStatus::Completed], &change)
            .await?;
        let deposit = match updated {
            Some(deposit) => deposit,
            None => {
                tracing::warn!(
                    deposit_id = %deposit_id,
                    "deposit changed during refund; ledger status left as found"
                );
                self.ledger.get_deposit(deposit_id).await?.unwrap_or(deposit)
            }
        };

        Ok(RefundOutcome {
            refund_id: refund.id,
            refund_status: refund.status,
            amount_cents: refund.amount_minor,
            deposit,
        })
    }
}
