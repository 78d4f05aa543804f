//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names follow the wire formats the browser front-end and the
//! payment providers already use: camelCase for the studio's own JSON,
//! PascalCase for gateway notifications.

pub mod admin_dto;
pub mod booking_dto;
pub mod checkout_dto;
pub mod payment_dto;

pub use admin_dto::*;
pub use booking_dto::*;
pub use checkout_dto::*;
pub use payment_dto::*;
