//! Network transport for the order gateway.
//!
//! [`GatewayTransport`] performs one HTTP exchange per call and hands back
//! the decoded body together with the HTTP status; interpreting failures is
//! left to [`super::GatewayClient`]. [`HttpTransport`] is the `reqwest`
//! implementation; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::wire::{
    IpnRegistration, IpnResponse, OrderRequest, OrderResponse, StatusResponse, TokenRequest,
    TokenResponse,
};

/// Failure to complete an HTTP exchange at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The reply body was not the expected JSON.
    #[error("unreadable reply (HTTP {status}): {message}")]
    Decode {
        /// HTTP status of the reply.
        status: u16,
        /// Decoder message.
        message: String,
    },
}

/// A decoded reply and its HTTP status.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body.
    pub body: T,
}

impl<T> Reply<T> {
    /// `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP exchange per gateway endpoint.
#[async_trait]
pub trait GatewayTransport: Send + Sync + std::fmt::Debug {
    /// `POST /api/Auth/RequestToken`.
    async fn request_token(
        &self,
        request: &TokenRequest,
    ) -> Result<Reply<TokenResponse>, TransportError>;

    /// `POST /api/URLSetup/RegisterIPN`.
    async fn register_ipn(
        &self,
        token: &str,
        registration: &IpnRegistration,
    ) -> Result<Reply<IpnResponse>, TransportError>;

    /// `POST /api/Transactions/SubmitOrderRequest`.
    async fn submit_order(
        &self,
        token: &str,
        order: &OrderRequest,
    ) -> Result<Reply<OrderResponse>, TransportError>;

    /// `GET /api/Transactions/GetTransactionStatus?orderTrackingId=..`.
    async fn transaction_status(
        &self,
        token: &str,
        tracking_id: &str,
    ) -> Result<Reply<StatusResponse>, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<Reply<T>, TransportError> {
    let response = response.map_err(|e| TransportError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::Request(e.to_string()))?;
    let body = serde_json::from_str(&text).map_err(|e| TransportError::Decode {
        status,
        message: format!("{e}; body: {}", text.chars().take(200).collect::<String>()),
    })?;
    Ok(Reply { status, body })
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn request_token(
        &self,
        request: &TokenRequest,
    ) -> Result<Reply<TokenResponse>, TransportError> {
        let response = self
            .client
            .post(self.endpoint("/api/Auth/RequestToken"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await;
        decode(response).await
    }

    async fn register_ipn(
        &self,
        token: &str,
        registration: &IpnRegistration,
    ) -> Result<Reply<IpnResponse>, TransportError> {
        let response = self
            .client
            .post(self.endpoint("/api/URLSetup/RegisterIPN"))
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token)
            .json(registration)
            .send()
            .await;
        decode(response).await
    }

    async fn submit_order(
        &self,
        token: &str,
        order: &OrderRequest,
    ) -> Result<Reply<OrderResponse>, TransportError> {
        let response = self
            .client
            .post(self.endpoint("/api/Transactions/SubmitOrderRequest"))
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token)
            .json(order)
            .send()
            .await;
        decode(response).await
    }

    async fn transaction_status(
        &self,
        token: &str,
        tracking_id: &str,
    ) -> Result<Reply<StatusResponse>, TransportError> {
        let mut url = url::Url::parse(&self.endpoint("/api/Transactions/GetTransactionStatus"))
            .map_err(|e| TransportError::Request(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("orderTrackingId", tracking_id);

        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await;
        decode(response).await
    }
}
