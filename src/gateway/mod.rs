//! Order gateway client.
//!
//! [`GatewayClient`] wraps a [`GatewayTransport`] with the two process-wide
//! caches the gateway protocol needs: the bearer token (refreshed a safety
//! margin before the gateway-reported expiry) and the registered IPN
//! notification channel id. Both caches sit behind [`tokio::sync::RwLock`]
//! and are shared through the `Arc<GatewayClient>` held in application
//! state; concurrent refreshes are allowed and the last writer wins.
//!
//! The client performs no retries. Every failure surfaces as a
//! [`GatewayError`] and the caller decides.

pub mod transport;
pub mod wire;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::deposit::to_major_units;
use transport::{GatewayTransport, Reply};
use wire::{BillingAddress, IpnRegistration, OrderRequest, TokenRequest, WireError};

/// Notification id used when channel registration fails, so that checkout
/// can still proceed (the payment is then reconciled from the browser
/// callback alone).
pub const PLACEHOLDER_CHANNEL_ID: &str = "default-ipn-id";

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment.
    Sandbox,
    /// Live environment.
    Production,
}

impl Environment {
    /// Parses the `PESAPAL_ENVIRONMENT` value; anything other than
    /// `production` or `live` selects the sandbox.
    #[must_use]
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "live" => Self::Production,
            _ => Self::Sandbox,
        }
    }

    /// API root for this environment.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://cybqa.pesapal.com/pesapalv3",
            Self::Production => "https://pay.pesapal.com/v3",
        }
    }

    /// Name recorded as the deposit `mode`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

/// Merchant API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Consumer key.
    pub consumer_key: String,
    /// Consumer secret.
    pub consumer_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

/// Gateway client failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Credentials missing or rejected, or the token request failed.
    #[error("gateway authentication failed: {0}")]
    Auth(String),

    /// The order was rejected or no redirect URL came back.
    #[error("order submission failed: {0}")]
    OrderSubmission(String),

    /// The status query failed or the gateway reported an error.
    #[error("transaction status query failed: {0}")]
    StatusQuery(String),
}

/// Outcome of notification channel registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChannel {
    /// The gateway issued (or previously issued) this id.
    Registered(String),
    /// Registration failed; orders fall back to [`PLACEHOLDER_CHANNEL_ID`].
    Unavailable {
        /// Why registration failed.
        reason: String,
    },
}

impl NotificationChannel {
    /// The id to put on an order.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Registered(id) => id,
            Self::Unavailable { .. } => PLACEHOLDER_CHANNEL_ID,
        }
    }

    /// `true` for a real gateway-issued id.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

/// Payer details sent with an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payer {
    /// Email address.
    pub email: String,
    /// Phone number (may be empty).
    pub phone: String,
    /// ISO country code.
    pub country_code: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
}

/// An order to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSubmission {
    /// Unique merchant reference.
    pub merchant_reference: String,
    /// Amount in minor units; sent in major units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Description shown on the hosted page.
    pub description: String,
    /// Browser return URL.
    pub callback_url: String,
    /// Payer.
    pub payer: Payer,
}

/// Accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOrder {
    /// Gateway tracking id; becomes the deposit `session_id`.
    pub tracking_id: String,
    /// Hosted payment page.
    pub redirect_url: String,
    /// Merchant reference (as echoed, else as submitted).
    pub merchant_reference: String,
    /// Whether a real notification channel was attached.
    pub channel_registered: bool,
}

/// Payment status reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Money moved.
    Completed,
    /// Still in progress.
    Pending,
    /// Declined or errored.
    Failed,
    /// Abandoned by the payer.
    Cancelled,
    /// Any other description, kept verbatim.
    Other(String),
}

impl GatewayStatus {
    /// Reads a `payment_status_description` (case-insensitive).
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        match description.trim().to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(description.trim().to_string()),
        }
    }

    /// Gateway wording.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative transaction status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatus {
    /// Tracking id the status was queried for.
    pub tracking_id: String,
    /// Reported status.
    pub status: GatewayStatus,
    /// Amount in major units (0 when not reported).
    pub amount: f64,
    /// Currency code (may be empty).
    pub currency: String,
    /// Payment method.
    pub payment_method: Option<String>,
    /// Confirmation code.
    pub confirmation_code: Option<String>,
    /// Payer account (masked phone or card).
    pub payment_account: Option<String>,
    /// Gateway-formatted transaction date.
    pub created_date: Option<String>,
    /// Merchant reference, when echoed.
    pub merchant_reference: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

/// Client for the order gateway with token and channel caches.
pub struct GatewayClient {
    transport: Arc<dyn GatewayTransport>,
    credentials: Option<Credentials>,
    environment: Environment,
    notification_url: String,
    token_margin: chrono::Duration,
    token: RwLock<Option<CachedToken>>,
    channel: RwLock<Option<String>>,
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("transport", &self.transport)
            .field("credentials", &self.credentials)
            .field("environment", &self.environment)
            .field("notification_url", &self.notification_url)
            .field("token_margin", &self.token_margin)
            .finish_non_exhaustive()
    }
}

fn wire_error(error: Option<&WireError>) -> Option<String> {
    error.filter(|e| e.is_set()).map(WireError::describe)
}

fn http_error<T>(reply: &Reply<T>) -> Option<String> {
    (!reply.is_success()).then(|| format!("HTTP {}", reply.status))
}

/// Parses the gateway's `expiryDate`.
///
/// RFC 3339 is tried first; a timestamp without an offset is read as UTC.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl GatewayClient {
    /// Creates a client.
    ///
    /// `notification_url` is the IPN endpoint registered on first order
    /// submission. `token_margin` is subtracted from the gateway-reported
    /// token expiry.
    #[must_use]
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        credentials: Option<Credentials>,
        environment: Environment,
        notification_url: impl Into<String>,
        token_margin: chrono::Duration,
    ) -> Self {
        Self {
            transport,
            credentials,
            environment,
            notification_url: notification_url.into(),
            token_margin,
            token: RwLock::new(None),
            channel: RwLock::new(None),
        }
    }

    /// Environment the client talks to.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns a bearer token, requesting a new one when the cached token
    /// is missing or within the safety margin of its expiry.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Auth`] when credentials are not configured, the
    /// request fails, or the gateway rejects it.
    pub async fn authenticate(&self) -> Result<String, GatewayError> {
        let now = Utc::now();
        if let Some(cached) = self
            .token
            .read()
            .await
            .as_ref()
            .filter(|cached| now < cached.refresh_at)
        {
            return Ok(cached.token.clone());
        }

        let Some(credentials) = &self.credentials else {
            return Err(GatewayError::Auth(
                "gateway credentials are not configured".to_string(),
            ));
        };

        let request = TokenRequest {
            consumer_key: credentials.consumer_key.clone(),
            consumer_secret: credentials.consumer_secret.clone(),
        };
        let reply = self
            .transport
            .request_token(&request)
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        if let Some(reason) = wire_error(reply.body.error.as_ref()).or_else(|| http_error(&reply)) {
            tracing::error!(status = reply.status, %reason, "gateway token request rejected");
            return Err(GatewayError::Auth(reason));
        }

        let Some(token) = reply.body.token.filter(|t| !t.is_empty()) else {
            return Err(GatewayError::Auth("no token in gateway reply".to_string()));
        };

        match reply.body.expiry_date.as_deref().and_then(parse_expiry) {
            Some(expires_at) => {
                let refresh_at = expires_at - self.token_margin;
                tracing::debug!(%refresh_at, "gateway token cached");
                *self.token.write().await = Some(CachedToken {
                    token: token.clone(),
                    refresh_at,
                });
            }
            None => {
                tracing::warn!(
                    expiry = ?reply.body.expiry_date,
                    "gateway token expiry unreadable; token not cached"
                );
            }
        }

        Ok(token)
    }

    /// Registers `url` as the IPN endpoint, or returns the cached id.
    ///
    /// Never fails: a failed registration yields
    /// [`NotificationChannel::Unavailable`], which is not cached so the next
    /// call tries again.
    pub async fn register_notification_channel(&self, url: &str) -> NotificationChannel {
        if let Some(id) = self.channel.read().await.clone() {
            return NotificationChannel::Registered(id);
        }

        match self.try_register(url).await {
            Ok(id) => {
                tracing::info!(ipn_id = %id, %url, "notification channel registered");
                *self.channel.write().await = Some(id.clone());
                NotificationChannel::Registered(id)
            }
            Err(reason) => {
                tracing::warn!(%url, %reason, "notification channel registration failed; using placeholder id");
                NotificationChannel::Unavailable { reason }
            }
        }
    }

    async fn try_register(&self, url: &str) -> Result<String, String> {
        let token = self.authenticate().await.map_err(|e| e.to_string())?;
        let registration = IpnRegistration {
            url: url.to_string(),
            ipn_notification_type: "POST".to_string(),
        };
        let reply = self
            .transport
            .register_ipn(&token, &registration)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(reason) = wire_error(reply.body.error.as_ref()).or_else(|| http_error(&reply)) {
            return Err(reason);
        }
        reply
            .body
            .ipn_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "no ipn_id in gateway reply".to_string())
    }

    /// Submits an order and returns where to send the payer.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Auth`] if no token can be obtained;
    /// [`GatewayError::OrderSubmission`] if the gateway rejects the order or
    /// returns no redirect URL.
    pub async fn submit_order(
        &self,
        order: &OrderSubmission,
    ) -> Result<SubmittedOrder, GatewayError> {
        let token = self.authenticate().await?;
        let channel = self
            .register_notification_channel(&self.notification_url)
            .await;

        let request = OrderRequest {
            id: order.merchant_reference.clone(),
            currency: order.currency.clone(),
            amount: to_major_units(order.amount_minor),
            description: order.description.clone(),
            callback_url: order.callback_url.clone(),
            notification_id: channel.id().to_string(),
            billing_address: BillingAddress {
                email_address: order.payer.email.clone(),
                phone_number: order.payer.phone.clone(),
                country_code: order.payer.country_code.clone(),
                first_name: order.payer.first_name.clone(),
                last_name: order.payer.last_name.clone(),
            },
        };

        let reply = self
            .transport
            .submit_order(&token, &request)
            .await
            .map_err(|e| GatewayError::OrderSubmission(e.to_string()))?;

        if let Some(reason) = wire_error(reply.body.error.as_ref()).or_else(|| http_error(&reply)) {
            tracing::error!(
                merchant_reference = %order.merchant_reference,
                status = reply.status,
                %reason,
                "order rejected by gateway"
            );
            return Err(GatewayError::OrderSubmission(reason));
        }

        let body = reply.body;
        let Some(redirect_url) = body.redirect_url.filter(|u| !u.is_empty()) else {
            return Err(GatewayError::OrderSubmission(
                "gateway did not return a redirect URL".to_string(),
            ));
        };
        let Some(tracking_id) = body.order_tracking_id.filter(|t| !t.is_empty()) else {
            return Err(GatewayError::OrderSubmission(
                "gateway did not return a tracking id".to_string(),
            ));
        };

        Ok(SubmittedOrder {
            tracking_id,
            redirect_url,
            merchant_reference: body
                .merchant_reference
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| order.merchant_reference.clone()),
            channel_registered: channel.is_registered(),
        })
    }

    /// Queries the authoritative status of a transaction. Never cached.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Auth`] if no token can be obtained;
    /// [`GatewayError::StatusQuery`] on transport failure, a non-success
    /// HTTP status, or a gateway-reported error code.
    pub async fn get_status(&self, tracking_id: &str) -> Result<TransactionStatus, GatewayError> {
        let token = self.authenticate().await?;
        let reply = self
            .transport
            .transaction_status(&token, tracking_id)
            .await
            .map_err(|e| GatewayError::StatusQuery(e.to_string()))?;

        // A status body with an error object whose code is null is normal;
        // only a populated code counts as a failure.
        if let Some(error) = reply.body.error.as_ref().filter(|e| e.code.is_some()) {
            return Err(GatewayError::StatusQuery(error.describe()));
        }
        if let Some(reason) = http_error(&reply) {
            return Err(GatewayError::StatusQuery(reason));
        }

        let body = reply.body;
        Ok(TransactionStatus {
            tracking_id: tracking_id.to_string(),
            status: GatewayStatus::from_description(
                body.payment_status_description.as_deref().unwrap_or_default(),
            ),
            amount: body.amount.unwrap_or_default(),
            currency: body.currency.unwrap_or_default(),
            payment_method: body.payment_method,
            confirmation_code: body.confirmation_code,
            payment_account: body.payment_account,
            created_date: body.created_date,
            merchant_reference: body.merchant_reference,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::transport::TransportError;
    use super::wire::{IpnResponse, OrderResponse, StatusResponse, TokenResponse};
    use super::*;

    /// Scriptable transport that counts calls per endpoint.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        pub(crate) token_calls: AtomicUsize,
        pub(crate) ipn_calls: AtomicUsize,
        pub(crate) order_calls: AtomicUsize,
        pub(crate) status_calls: AtomicUsize,
        pub(crate) expiry: Mutex<Option<String>>,
        pub(crate) ipn_fails: Mutex<bool>,
        pub(crate) status: Mutex<StatusResponse>,
        pub(crate) last_order: Mutex<Option<OrderRequest>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            let expiry = (Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
            Self {
                expiry: Mutex::new(Some(expiry)),
                ..Self::default()
            }
        }

        pub(crate) fn with_status(self, status: StatusResponse) -> Self {
            if let Ok(mut slot) = self.status.lock() {
                *slot = status;
            }
            self
        }
    }

    #[async_trait]
    impl GatewayTransport for MockTransport {
        async fn request_token(
            &self,
            _request: &TokenRequest,
        ) -> Result<Reply<TokenResponse>, TransportError> {
            let n = self.token_calls.fetch_add(1, Ordering::SeqCst);
            let expiry = self.expiry.lock().ok().and_then(|e| e.clone());
            Ok(Reply {
                status: 200,
                body: TokenResponse {
                    token: Some(format!("token-{n}")),
                    expiry_date: expiry,
                    error: None,
                },
            })
        }

        async fn register_ipn(
            &self,
            _token: &str,
            _registration: &IpnRegistration,
        ) -> Result<Reply<IpnResponse>, TransportError> {
            self.ipn_calls.fetch_add(1, Ordering::SeqCst);
            if self.ipn_fails.lock().map(|f| *f).unwrap_or(false) {
                return Err(TransportError::Request("connection refused".to_string()));
            }
            Ok(Reply {
                status: 200,
                body: IpnResponse {
                    ipn_id: Some("ipn-123".to_string()),
                    error: None,
                },
            })
        }

        async fn submit_order(
            &self,
            _token: &str,
            order: &OrderRequest,
        ) -> Result<Reply<OrderResponse>, TransportError> {
            let n = self.order_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_order.lock() {
                *last = Some(order.clone());
            }
            Ok(Reply {
                status: 200,
                body: OrderResponse {
                    order_tracking_id: Some(format!("TRACK-{n}")),
                    merchant_reference: Some(order.id.clone()),
                    redirect_url: Some(format!("https://pay.example/{n}")),
                    error: None,
                },
            })
        }

        async fn transaction_status(
            &self,
            _token: &str,
            _tracking_id: &str,
        ) -> Result<Reply<StatusResponse>, TransportError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let body = self
                .status
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default();
            Ok(Reply { status: 200, body })
        }
    }

    pub(crate) fn credentials() -> Option<Credentials> {
        Some(Credentials {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
        })
    }

    fn client(transport: Arc<MockTransport>) -> GatewayClient {
        GatewayClient::new(
            transport,
            credentials(),
            Environment::Sandbox,
            "https://studio.example/payment/ipn",
            chrono::Duration::minutes(5),
        )
    }

    fn order() -> OrderSubmission {
        OrderSubmission {
            merchant_reference: "order_1_abc".to_string(),
            amount_minor: 1550,
            currency: "USD".to_string(),
            description: "Tattoo deposit".to_string(),
            callback_url: "https://studio.example/payment/callback".to_string(),
            payer: Payer {
                email: "ada@example.com".to_string(),
                phone: String::new(),
                country_code: "UG".to_string(),
                first_name: "Customer".to_string(),
                last_name: "User".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn token_is_reused_until_margin() {
        let transport = Arc::new(MockTransport::new());
        let client = client(Arc::clone(&transport));

        let first = client.authenticate().await;
        let second = client.authenticate().await;
        assert_eq!(first, second);
        assert_eq!(transport.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let transport = Arc::new(MockTransport::new());
        if let Ok(mut expiry) = transport.expiry.lock() {
            *expiry = Some((Utc::now() + chrono::Duration::minutes(4)).to_rfc3339());
        }
        let client = client(Arc::clone(&transport));

        let _ = client.authenticate().await;
        let _ = client.authenticate().await;
        assert_eq!(transport.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparseable_expiry_is_not_cached() {
        let transport = Arc::new(MockTransport::new());
        if let Ok(mut expiry) = transport.expiry.lock() {
            *expiry = Some("next tuesday".to_string());
        }
        let client = client(Arc::clone(&transport));

        assert!(client.authenticate().await.is_ok());
        assert!(client.authenticate().await.is_ok());
        assert_eq!(transport.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credentials_fail_auth() {
        let transport = Arc::new(MockTransport::new());
        let client = GatewayClient::new(
            Arc::clone(&transport) as Arc<dyn GatewayTransport>,
            None,
            Environment::Sandbox,
            "https://studio.example/payment/ipn",
            chrono::Duration::minutes(5),
        );
        assert!(matches!(
            client.authenticate().await,
            Err(GatewayError::Auth(_))
        ));
        assert_eq!(transport.token_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn channel_id_is_cached_after_registration() {
        let transport = Arc::new(MockTransport::new());
        let client = client(Arc::clone(&transport));

        let url = "https://studio.example/payment/ipn";
        let first = client.register_notification_channel(url).await;
        let second = client.register_notification_channel(url).await;
        assert_eq!(first, NotificationChannel::Registered("ipn-123".to_string()));
        assert_eq!(first, second);
        assert_eq!(transport.ipn_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_registration_falls_back_and_retries() {
        let transport = Arc::new(MockTransport::new());
        if let Ok(mut fails) = transport.ipn_fails.lock() {
            *fails = true;
        }
        let client = client(Arc::clone(&transport));

        let url = "https://studio.example/payment/ipn";
        let channel = client.register_notification_channel(url).await;
        assert!(!channel.is_registered());
        assert_eq!(channel.id(), PLACEHOLDER_CHANNEL_ID);

        let _ = client.register_notification_channel(url).await;
        assert_eq!(transport.ipn_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn order_amount_is_sent_in_major_units() {
        let transport = Arc::new(MockTransport::new());
        let client = client(Arc::clone(&transport));

        let Ok(submitted) = client.submit_order(&order()).await else {
            panic!("submission should succeed");
        };
        assert_eq!(submitted.tracking_id, "TRACK-0");
        assert_eq!(submitted.merchant_reference, "order_1_abc");
        assert!(submitted.channel_registered);

        let sent = transport.last_order.lock().ok().and_then(|o| o.clone());
        let Some(sent) = sent else {
            panic!("order was not sent");
        };
        assert!((sent.amount - 15.5).abs() < f64::EPSILON);
        assert_eq!(sent.notification_id, "ipn-123");
    }

    #[tokio::test]
    async fn status_with_error_code_fails() {
        let transport = Arc::new(MockTransport::new().with_status(StatusResponse {
            error: Some(WireError {
                error_type: Some("api_error".to_string()),
                code: Some("invalid_tracking_id".to_string()),
                message: Some("Invalid order tracking id".to_string()),
            }),
            ..StatusResponse::default()
        }));
        let client = client(transport);

        assert_eq!(
            client.get_status("nope").await,
            Err(GatewayError::StatusQuery(
                "Invalid order tracking id".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn status_maps_description() {
        let transport = Arc::new(MockTransport::new().with_status(StatusResponse {
            payment_status_description: Some("COMPLETED".to_string()),
            amount: Some(15.5),
            currency: Some("KES".to_string()),
            error: Some(WireError::default()),
            ..StatusResponse::default()
        }));
        let client = client(transport);

        let Ok(status) = client.get_status("T1").await else {
            panic!("status query should succeed");
        };
        assert_eq!(status.status, GatewayStatus::Completed);
        assert_eq!(status.tracking_id, "T1");
        assert_eq!(status.currency, "KES");
    }

    #[test]
    fn expiry_without_offset_is_utc() {
        let parsed = parse_expiry("2024-03-01T10:05:00.123");
        assert_eq!(
            parsed.map(|p| p.to_rfc3339()),
            Some("2024-03-01T10:05:00.123+00:00".to_string())
        );
        assert!(parse_expiry("2024-03-01T10:05:00.000Z").is_some());
        assert!(parse_expiry("garbage").is_none());
    }

    #[test]
    fn environment_selects_base_url() {
        assert_eq!(
            Environment::from_setting("Production").base_url(),
            "https://pay.pesapal.com/v3"
        );
        assert_eq!(Environment::from_setting("").as_str(), "sandbox");
    }
}
