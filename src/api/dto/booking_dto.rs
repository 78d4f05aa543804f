//! Booking form body.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BookingId, NewBooking};

/// Request body for `POST /booking`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingBody {
    /// Customer name.
    #[serde(default)]
    pub name: String,
    /// Customer email.
    #[serde(default)]
    pub email: String,
    /// Customer phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Body placement.
    #[serde(default)]
    pub placement: String,
    /// Approximate size.
    #[serde(default)]
    pub size: String,
    /// Preferred style.
    #[serde(default)]
    pub style: Option<String>,
    /// Free-text preferred dates.
    #[serde(default)]
    pub preferred_dates: Option<String>,
    /// Free-text budget.
    #[serde(default)]
    pub budget: Option<String>,
    /// Description of the idea.
    #[serde(default)]
    pub details: String,
    /// Reference links.
    #[serde(default)]
    pub references: Option<String>,
    /// URLs of images uploaded beforehand.
    #[serde(default)]
    pub uploads: Vec<String>,
}

impl From<BookingBody> for NewBooking {
    fn from(body: BookingBody) -> Self {
        Self {
            name: body.name.trim().to_string(),
            email: body.email.trim().to_string(),
            phone: body.phone,
            placement: body.placement,
            size: body.size,
            style: body.style,
            preferred_dates: body.preferred_dates,
            budget: body.budget,
            details: body.details,
            references: body.references,
            uploads: body.uploads,
        }
    }
}

/// Response body for `POST /booking`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    /// Always `true`.
    pub ok: bool,
    /// Id of the stored booking.
    #[schema(value_type = String, format = Uuid)]
    pub booking_id: BookingId,
    /// Whether the studio email went out.
    pub notified: bool,
}
