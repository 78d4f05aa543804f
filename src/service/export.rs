//! CSV rendering of the admin views.
//!
//! The header row is bare; every data field is double-quoted with inner
//! quotes doubled. Lines are separated by `\n`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Booking, Deposit};

const BOOKING_COLUMNS: [&str; 15] = [
    "id",
    "created_at",
    "name",
    "email",
    "phone",
    "placement",
    "size",
    "style",
    "preferred_dates",
    "budget",
    "references",
    "uploads_count",
    "deposit_count",
    "deposit_total_cents",
    "deposit_currency",
];

const DEPOSIT_COLUMNS: [&str; 9] = [
    "id",
    "created_at",
    "email",
    "amount_cents",
    "currency",
    "payment_status",
    "session_id",
    "payment_intent_id",
    "booking_id",
];

/// A booking with the deposits linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookingWithDeposits {
    /// The booking.
    pub booking: Booking,
    /// Linked deposits, newest first.
    pub deposits: Vec<Deposit>,
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn document(columns: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    std::iter::once(columns.join(","))
        .chain(rows.map(|row| {
            row.iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(",")
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

fn single_line(value: &str) -> String {
    value.replace("\r\n", " ").replace(['\n', '\r', ','], " ")
}

/// Renders bookings with deposit totals.
#[must_use]
pub fn bookings_csv(rows: &[BookingWithDeposits]) -> String {
    document(
        &BOOKING_COLUMNS,
        rows.iter().map(|row| {
            let b = &row.booking;
            let total: i64 = row.deposits.iter().map(|d| d.amount_minor).sum();
            let currency = row
                .deposits
                .first()
                .map(|d| d.currency.clone())
                .unwrap_or_default();
            vec![
                b.id.to_string(),
                b.created_at.to_rfc3339(),
                b.name.clone(),
                b.email.clone(),
                b.phone.clone().unwrap_or_default(),
                b.placement.clone(),
                b.size.clone(),
                b.style.clone().unwrap_or_default(),
                b.preferred_dates.clone().unwrap_or_default(),
                b.budget.clone().unwrap_or_default(),
                single_line(b.references.as_deref().unwrap_or_default()),
                b.uploads.len().to_string(),
                row.deposits.len().to_string(),
                total.to_string(),
                currency,
            ]
        }),
    )
}

/// Renders deposits.
#[must_use]
pub fn deposits_csv(deposits: &[Deposit]) -> String {
    document(
        &DEPOSIT_COLUMNS,
        deposits.iter().map(|d| {
            vec![
                d.id.to_string(),
                d.created_at.to_rfc3339(),
                d.email.clone().unwrap_or_default(),
                d.amount_minor.to_string(),
                d.currency.clone(),
                d.payment_status.to_string(),
                d.session_id.clone(),
                d.payment_intent_id.clone().unwrap_or_default(),
                d.booking_id.map(|id| id.to_string()).unwrap_or_default(),
            ]
        }),
    )
}
