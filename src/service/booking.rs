//! Booking intake.

use std::sync::Arc;

use crate::domain::{Booking, NewBooking};
use crate::notify::{Delivery, NotificationDispatch};
use crate::persistence::{LedgerError, LedgerStore};

/// Why a booking was not stored.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Required fields are blank.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The ledger rejected the write.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A stored booking and whether the studio was told about it.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    /// The stored booking.
    pub booking: Booking,
    /// Studio notification outcome.
    pub notified: Delivery,
}

/// Stores consultation requests and notifies the studio.
#[derive(Debug, Clone)]
pub struct BookingService {
    ledger: Arc<dyn LedgerStore>,
    notifier: NotificationDispatch,
}

impl BookingService {
    /// Creates the service.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>, notifier: NotificationDispatch) -> Self {
        Self { ledger, notifier }
    }

    /// Validates and stores `booking`, then emails the studio.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingFields`] when a required field is blank;
    /// [`BookingError::Ledger`] when the booking cannot be stored. A failed
    /// email is not an error.
    pub async fn submit(&self, booking: NewBooking) -> Result<BookingReceipt, BookingError> {
        let missing = booking.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::MissingFields(missing));
        }

        let booking = self.ledger.insert_booking(booking).await?;
        tracing::info!(booking_id = %booking.id, uploads = booking.uploads.len(), "booking stored");

        let notified = self.notifier.booking_received(&booking).await;
        Ok(BookingReceipt { booking, notified })
    }
}
