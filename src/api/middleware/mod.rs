//! Request middleware.

pub mod basic_auth;

pub use basic_auth::{AdminCredentials, require_basic_auth};
