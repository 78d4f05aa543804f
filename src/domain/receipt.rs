//! Payment receipt assembled after a successful reconciliation.

use serde::Serialize;
use utoipa::ToSchema;

use super::{BookingId, DepositId};

/// What the reconciliation did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSync {
    /// No deposit existed; one was created directly in `completed`.
    Inserted,
    /// An existing deposit was moved to `completed`.
    Updated,
    /// The deposit was already settled by an earlier call.
    AlreadySettled,
    /// The ledger write failed; a later notification must repair it.
    Deferred,
}

impl LedgerSync {
    /// `true` when this call moved the deposit to `completed` for the first time
    /// or could not tell (deferred), i.e. when a confirmation should go out.
    #[must_use]
    pub const fn is_first_confirmation(&self) -> bool {
        !matches!(self, Self::AlreadySettled)
    }
}

/// Receipt returned to callers and rendered into confirmation emails.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Linked booking, if any.
    #[schema(value_type = Option<String>, format = Uuid)]
    pub booking_id: Option<BookingId>,
    /// Ledger row that now reflects the payment (absent when deferred).
    #[schema(value_type = Option<String>, format = Uuid)]
    pub deposit_id: Option<DepositId>,
    /// Display name of the customer.
    pub customer_name: String,
    /// Where the receipt is sent; may be a phone or account string when no
    /// email is on file.
    pub customer_email: String,
    /// Amount paid in major units as reported by the gateway.
    pub amount: f64,
    /// Amount paid in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Payment method reported by the gateway.
    pub payment_method: String,
    /// Gateway confirmation code.
    pub transaction_id: String,
    /// Gateway-reported payment date.
    pub payment_date: String,
    /// Always `Completed` for a receipt.
    pub status: String,
    /// Gateway tracking id.
    pub order_tracking_id: String,
    /// Merchant reference echoed by the gateway.
    pub merchant_reference: String,
    /// Ledger outcome of this reconciliation.
    pub ledger: LedgerSync,
}

impl Receipt {
    /// `true` when the receipt address looks like an email.
    #[must_use]
    pub fn has_customer_email(&self) -> bool {
        self.customer_email.contains('@')
    }
}
