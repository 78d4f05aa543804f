//! Consultation booking records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::BookingId;

/// A consultation request submitted through the booking form.
///
/// Immutable after creation. The reconciliation flow only reads it to put
/// the customer's name and tattoo particulars on receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Unique booking identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: BookingId,
    /// Customer name.
    pub name: String,
    /// Customer email.
    pub email: String,
    /// Customer phone number.
    pub phone: Option<String>,
    /// Body placement of the tattoo.
    pub placement: String,
    /// Approximate size.
    pub size: String,
    /// Preferred style.
    pub style: Option<String>,
    /// Free-text preferred dates.
    pub preferred_dates: Option<String>,
    /// Free-text budget.
    pub budget: Option<String>,
    /// Description of the idea.
    pub details: String,
    /// Reference links pasted by the customer.
    pub references: Option<String>,
    /// URLs of images already uploaded to external storage.
    pub uploads: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields of a booking before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBooking {
    /// Customer name.
    pub name: String,
    /// Customer email.
    pub email: String,
    /// Customer phone number.
    pub phone: Option<String>,
    /// Body placement of the tattoo.
    pub placement: String,
    /// Approximate size.
    pub size: String,
    /// Preferred style.
    pub style: Option<String>,
    /// Free-text preferred dates.
    pub preferred_dates: Option<String>,
    /// Free-text budget.
    pub budget: Option<String>,
    /// Description of the idea.
    pub details: String,
    /// Reference links.
    pub references: Option<String>,
    /// Uploaded image URLs.
    pub uploads: Vec<String>,
}

impl NewBooking {
    /// Names of required fields that are empty or whitespace-only.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("placement", &self.placement),
            ("size", &self.size),
            ("details", &self.details),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Stamps the booking with a fresh id and creation time.
    #[must_use]
    pub fn into_booking(self) -> Booking {
        Booking {
            id: BookingId::new(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            placement: self.placement,
            size: self.size,
            style: self.style,
            preferred_dates: self.preferred_dates,
            budget: self.budget,
            details: self.details,
            references: self.references,
            uploads: self.uploads,
            created_at: Utc::now(),
        }
    }
}
