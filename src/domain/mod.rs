//! Domain layer: bookings, deposits, and payment receipts.
//!
//! These types are shared by the ledger store, the payment services and the
//! HTTP layer. They carry no I/O.

pub mod booking;
pub mod deposit;
pub mod ids;
pub mod receipt;

pub use booking::{Booking, NewBooking};
pub use deposit::{Deposit, DepositChange, NewDeposit, PaymentStatus, Provider};
pub use ids::{BookingId, DepositId};
pub use receipt::{LedgerSync, Receipt};
