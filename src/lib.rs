//! # studio-payments
//!
//! Booking intake, deposit checkout and payment reconciliation for a
//! tattoo studio.
//!
//! Deposits are taken through two processors: an order gateway (token
//! authenticated, hosted payment page, push notifications) and a card
//! processor (hosted checkout sessions, signed webhooks). Three
//! independent triggers can report the same gateway payment (the
//! browser return, a POST notification and a GET notification), so the
//! ledger update is idempotent: every trigger converges on one deposit
//! row keyed by the gateway tracking id.
//!
//! ## Architecture
//!
//! ```text
//! Clients (browser, gateway, card processor, operator)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── Checkout / Reconciliation / CardWebhook / Booking / Admin (service/)
//!     │       └── converge(): lookup → conditional transition → insert
//!     │
//!     ├── GatewayClient (gateway/)    CardProcessor (card/)
//!     ├── NotificationDispatch (notify/)
//!     │
//!     └── LedgerStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod card;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod openapi;
pub mod persistence;
pub mod service;
