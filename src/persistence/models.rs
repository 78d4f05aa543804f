//! Database row models for the `bookings` and `deposits` tables.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::LedgerError;
use crate::domain::{Booking, BookingId, Deposit, DepositId};

/// A row from the `bookings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    /// Primary key.
    pub id: Uuid,
    /// Customer name.
    pub name: String,
    /// Customer email.
    pub email: String,
    /// Customer phone.
    pub phone: Option<String>,
    /// Tattoo placement.
    pub placement: String,
    /// Tattoo size.
    pub size: String,
    /// Preferred style.
    pub style: Option<String>,
    /// Preferred dates.
    pub preferred_dates: Option<String>,
    /// Budget.
    pub budget: Option<String>,
    /// Free-text idea.
    pub details: String,
    /// Reference links (`references` is an SQL keyword).
    pub reference_links: Option<String>,
    /// JSONB array of upload URLs.
    pub uploads: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        let uploads = row
            .uploads
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: BookingId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            placement: row.placement,
            size: row.size,
            style: row.style,
            preferred_dates: row.preferred_dates,
            budget: row.budget,
            details: row.details,
            references: row.reference_links,
            uploads,
            created_at: row.created_at,
        }
    }
}

/// A row from the `deposits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DepositRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique tracking / session id.
    pub session_id: String,
    /// Payer email.
    pub email: Option<String>,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Status string.
    pub payment_status: String,
    /// Processor reference.
    pub payment_intent_id: Option<String>,
    /// Provider string.
    pub provider: String,
    /// Gateway environment.
    pub mode: Option<String>,
    /// JSONB metadata.
    pub metadata: serde_json::Value,
    /// Linked booking.
    pub booking_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DepositRow> for Deposit {
    type Error = LedgerError;

    fn try_from(row: DepositRow) -> Result<Self, Self::Error> {
        let payment_status = row
            .payment_status
            .parse()
            .map_err(|e| LedgerError::Corrupt(format!("deposit {}: {e}", row.id)))?;
        let provider = row
            .provider
            .parse()
            .map_err(|e| LedgerError::Corrupt(format!("deposit {}: {e}", row.id)))?;
        Ok(Self {
            id: DepositId::from_uuid(row.id),
            session_id: row.session_id,
            email: row.email,
            amount_minor: row.amount_minor,
            currency: row.currency,
            payment_status,
            payment_intent_id: row.payment_intent_id,
            provider,
            mode: row.mode,
            metadata: row.metadata,
            booking_id: row.booking_id.map(BookingId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
