//! Lookup-or-insert convergence of a deposit onto a target status.
//!
//! Every path that learns about a payment outcome (browser callback, IPN,
//! card webhook) funnels through [`converge`]. The routine never reads and
//! then blindly writes: updates are conditional on the status that was
//! read, and inserts rely on the unique session id. When either guard
//! trips, another caller got there first, so the routine re-reads and
//! tries again.

use crate::domain::{Deposit, DepositChange, LedgerSync, NewDeposit, PaymentStatus};
use crate::persistence::{LedgerError, LedgerStore};

const MAX_ATTEMPTS: usize = 4;

/// What a payment outcome should do to the ledger.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Session / tracking id (the unique key).
    pub session_id: String,
    /// Secondary lookup key, matched against the stored processor reference.
    pub reference: Option<String>,
    /// Change applied to an existing deposit. `amount_minor`, `currency`,
    /// `email` and `booking_id` only fill gaps in the stored record.
    pub change: DepositChange,
    /// Record inserted when no deposit exists yet.
    pub insert: NewDeposit,
}

/// How the ledger ended up reflecting a settlement.
#[derive(Debug, Clone, PartialEq)]
pub enum Convergence {
    /// No deposit existed; this call inserted it.
    Inserted(Deposit),
    /// This call moved an existing deposit out of `previous`.
    Updated {
        /// Deposit after the change.
        deposit: Deposit,
        /// Status before the change.
        previous: PaymentStatus,
    },
    /// The deposit was already in the target status, or in a status the
    /// target may not overwrite (e.g. `refunded`).
    Unchanged(Deposit),
}

impl Convergence {
    /// The deposit as it now stands.
    #[must_use]
    pub const fn deposit(&self) -> &Deposit {
        match self {
            Self::Inserted(deposit) | Self::Updated { deposit, .. } | Self::Unchanged(deposit) => {
                deposit
            }
        }
    }

    /// Ledger outcome for receipts.
    #[must_use]
    pub const fn ledger_sync(&self) -> LedgerSync {
        match self {
            Self::Inserted(_) => LedgerSync::Inserted,
            Self::Updated { .. } => LedgerSync::Updated,
            Self::Unchanged(_) => LedgerSync::AlreadySettled,
        }
    }
}

/// Drops gap-filling fields the stored deposit already has.
fn gap_fill(existing: &Deposit, change: &DepositChange) -> DepositChange {
    let has_amount = existing.amount_minor > 0;
    DepositChange {
        amount_minor: change.amount_minor.filter(|_| !has_amount),
        currency: change.currency.clone().filter(|_| !has_amount),
        email: change.email.clone().filter(|_| existing.email.is_none()),
        booking_id: change.booking_id.filter(|_| existing.booking_id.is_none()),
        ..change.clone()
    }
}

/// Brings the deposit for `settlement.session_id` to the target status.
///
/// # Errors
///
/// Returns the ledger error of a failed read or write, or
/// [`LedgerError::Database`] if the row kept changing underneath every
/// attempt.
pub async fn converge(
    ledger: &dyn LedgerStore,
    settlement: &Settlement,
) -> Result<Convergence, LedgerError> {
    let target = settlement.change.status;
    let from = PaymentStatus::predecessors(target);

    for attempt in 1..=MAX_ATTEMPTS {
        let existing = ledger
            .find_deposit(&settlement.session_id, settlement.reference.as_deref())
            .await?;

        let Some(existing) = existing else {
            match ledger.insert_deposit(settlement.insert.clone()).await {
                Ok(inserted) => return Ok(Convergence::Inserted(inserted)),
                Err(LedgerError::Duplicate(_)) => {
                    tracing::debug!(
                        session_id = %settlement.session_id,
                        attempt,
                        "concurrent insert won; retrying as update"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        };

        if !existing.payment_status.can_transition_to(target) {
            if existing.payment_status != target {
                tracing::info!(
                    deposit_id = %existing.id,
                    current = %existing.payment_status,
                    requested = %target,
                    "stale payment outcome ignored"
                );
            }
            return Ok(Convergence::Unchanged(existing));
        }

        let change = gap_fill(&existing, &settlement.change);
        match ledger.transition_deposit(existing.id, &from, &change).await? {
            Some(deposit) => {
                return Ok(Convergence::Updated {
                    deposit,
                    previous: existing.payment_status,
                });
            }
            None => {
                tracing::debug!(
                    deposit_id = %existing.id,
                    attempt,
                    "deposit changed concurrently; re-reading"
                );
            }
        }
    }

    Err(LedgerError::Database(format!(
        "deposit {} did not converge after {MAX_ATTEMPTS} attempts",
        settlement.session_id
    )))
}
