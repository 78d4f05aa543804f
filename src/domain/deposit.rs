//! Deposit ledger records and their status lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{BookingId, DepositId};

/// Payment status of a [`Deposit`].
///
/// Transitions are monotonic: `pending → completed → refunded` and
/// `pending → failed`. A failed deposit may still become `completed` when
/// the gateway later reports an authoritative success for the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout started, gateway outcome unknown.
    Pending,
    /// Gateway confirmed the payment.
    Completed,
    /// Gateway reported a failed or cancelled payment.
    Failed,
    /// Refunded by an administrator.
    Refunded,
}

impl PaymentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// `true` once the money has moved: `completed` or `refunded`.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded)
    }

    /// Whether the ledger may move a deposit from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Completed)
                | (Self::Completed, Self::Refunded)
        )
    }

    /// Statuses from which `next` is reachable in one step.
    #[must_use]
    pub fn predecessors(next: Self) -> Vec<Self> {
        [Self::Pending, Self::Completed, Self::Failed, Self::Refunded]
            .into_iter()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    /// Accepts the storage names case-insensitively, plus `paid`
    /// (card processor wording for a completed payment).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "unpaid" => Ok(Self::Pending),
            "completed" | "paid" | "no_payment_required" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Which payment processor a deposit went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Token-authenticated order gateway (mobile money and cards).
    OrderGateway,
    /// Session-checkout card processor with signed webhooks.
    Card,
}

impl Provider {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderGateway => "order_gateway",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_gateway" => Ok(Self::OrderGateway),
            "card" => Ok(Self::Card),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// One payment attempt and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    /// Unique deposit identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: DepositId,
    /// External tracking / session id; unique across the ledger.
    pub session_id: String,
    /// Payer email, when known.
    pub email: Option<String>,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// Uppercase ISO currency code.
    pub currency: String,
    /// Lifecycle status.
    pub payment_status: PaymentStatus,
    /// Processor transaction reference (merchant reference, confirmation
    /// code or payment intent id depending on stage and provider).
    pub payment_intent_id: Option<String>,
    /// Processor that handled the payment.
    pub provider: Provider,
    /// Gateway environment, e.g. `sandbox`.
    pub mode: Option<String>,
    /// Gateway-specific fields.
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    /// Optional back-reference to the booking.
    #[schema(value_type = Option<String>, format = Uuid)]
    pub booking_id: Option<BookingId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields of a deposit before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeposit {
    /// External tracking / session id.
    pub session_id: String,
    /// Payer email.
    pub email: Option<String>,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code (normalised on insert).
    pub currency: String,
    /// Initial status.
    pub payment_status: PaymentStatus,
    /// Processor reference.
    pub payment_intent_id: Option<String>,
    /// Processor.
    pub provider: Provider,
    /// Gateway environment.
    pub mode: Option<String>,
    /// Gateway-specific fields.
    pub metadata: serde_json::Value,
    /// Linked booking.
    pub booking_id: Option<BookingId>,
}

impl NewDeposit {
    /// Stamps the deposit with a fresh id and timestamps.
    #[must_use]
    pub fn into_deposit(self) -> Deposit {
        let now = Utc::now();
        Deposit {
            id: DepositId::new(),
            session_id: self.session_id,
            email: self.email,
            amount_minor: self.amount_minor,
            currency: normalize_currency(&self.currency),
            payment_status: self.payment_status,
            payment_intent_id: self.payment_intent_id,
            provider: self.provider,
            mode: self.mode,
            metadata: self.metadata,
            booking_id: self.booking_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A status transition plus the fields that travel with it.
///
/// `None` fields are left untouched; `metadata` is shallow-merged into the
/// stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositChange {
    /// Target status.
    pub status: PaymentStatus,
    /// New processor reference.
    pub payment_intent_id: Option<String>,
    /// Keys to merge into the stored metadata.
    pub metadata: Option<serde_json::Value>,
    /// Payer email, if previously unknown.
    pub email: Option<String>,
    /// Amount, only for records stored without one.
    pub amount_minor: Option<i64>,
    /// Currency, only for records stored without an amount.
    pub currency: Option<String>,
    /// Booking link, if previously unknown.
    pub booking_id: Option<BookingId>,
}

impl DepositChange {
    /// A bare status change.
    #[must_use]
    pub const fn to_status(status: PaymentStatus) -> Self {
        Self {
            status,
            payment_intent_id: None,
            metadata: None,
            email: None,
            amount_minor: None,
            currency: None,
            booking_id: None,
        }
    }

    /// Applies the change to an in-memory record.
    pub fn apply(&self, deposit: &mut Deposit) {
        deposit.payment_status = self.status;
        if let Some(reference) = &self.payment_intent_id {
            deposit.payment_intent_id = Some(reference.clone());
        }
        if let Some(extra) = &self.metadata {
            merge_metadata(&mut deposit.metadata, extra);
        }
        if let Some(email) = &self.email {
            deposit.email = Some(email.clone());
        }
        if let Some(amount) = self.amount_minor {
            deposit.amount_minor = amount;
        }
        if let Some(currency) = &self.currency {
            deposit.currency = normalize_currency(currency);
        }
        if let Some(booking_id) = self.booking_id {
            deposit.booking_id = Some(booking_id);
        }
        deposit.updated_at = Utc::now();
    }
}

/// Shallow-merges the keys of `extra` into `target`.
///
/// A non-object `target` is replaced by `extra`.
pub fn merge_metadata(target: &mut serde_json::Value, extra: &serde_json::Value) {
    match (target.as_object_mut(), extra.as_object()) {
        (Some(existing), Some(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
        }
        _ => *target = extra.clone(),
    }
}

/// Converts a major-unit amount (e.g. `15.50`) to minor units (`1550`).
///
/// Returns `None` for negative, non-finite or out-of-range input.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_minor_units(major: f64) -> Option<i64> {
    let minor = (major * 100.0).round();
    if !minor.is_finite() || minor < 0.0 || minor > i64::MAX as f64 {
        return None;
    }
    Some(minor as i64)
}

/// Converts minor units back to a major-unit amount for gateway requests.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Trims and upper-cases a currency code.
#[must_use]
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Refunded));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn predecessors_of_completed() {
        assert_eq!(
            PaymentStatus::predecessors(PaymentStatus::Completed),
            vec![PaymentStatus::Pending, PaymentStatus::Failed]
        );
        assert!(PaymentStatus::predecessors(PaymentStatus::Pending).is_empty());
    }

    #[test]
    fn parses_processor_wording() {
        assert_eq!("paid".parse::<PaymentStatus>(), Ok(PaymentStatus::Completed));
        assert_eq!("Completed".parse::<PaymentStatus>(), Ok(PaymentStatus::Completed));
        assert_eq!("unpaid".parse::<PaymentStatus>(), Ok(PaymentStatus::Pending));
        assert!("reversed".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn minor_units_round_half_cents() {
        assert_eq!(to_minor_units(15.50), Some(1550));
        assert_eq!(to_minor_units(10.0), Some(1000));
        assert_eq!(to_minor_units(0.1 + 0.2), Some(30));
        assert_eq!(to_minor_units(-1.0), None);
        assert_eq!(to_minor_units(f64::NAN), None);
    }

    #[test]
    fn currency_is_uppercased() {
        assert_eq!(normalize_currency(" usd "), "USD");
    }

    #[test]
    fn change_merges_metadata_and_keeps_amount() {
        let mut deposit = NewDeposit {
            session_id: "T1".to_string(),
            email: None,
            amount_minor: 1000,
            currency: "usd".to_string(),
            payment_status: PaymentStatus::Pending,
            payment_intent_id: Some("order_1".to_string()),
            provider: Provider::OrderGateway,
            mode: None,
            metadata: serde_json::json!({ "orderTrackingId": "T1" }),
            booking_id: None,
        }
        .into_deposit();

        let change = DepositChange {
            payment_intent_id: Some("CONF-9".to_string()),
            metadata: Some(serde_json::json!({ "paymentMethod": "MpesaKE" })),
            ..DepositChange::to_status(PaymentStatus::Completed)
        };
        change.apply(&mut deposit);

        assert_eq!(deposit.currency, "USD");
        assert_eq!(deposit.amount_minor, 1000);
        assert_eq!(deposit.payment_status, PaymentStatus::Completed);
        assert_eq!(deposit.payment_intent_id.as_deref(), Some("CONF-9"));
        assert_eq!(deposit.metadata["orderTrackingId"], "T1");
        assert_eq!(deposit.metadata["paymentMethod"], "MpesaKE");
    }
}
