//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::card::CardProcessor;
use crate::config::StudioConfig;
use crate::gateway::GatewayClient;
use crate::notify::{NotificationDispatch, NotificationSender};
use crate::persistence::LedgerStore;
use crate::service::{
    AdminService, BookingService, CardWebhookService, CheckoutService, CheckoutSettings,
    ReconciliationService,
};

/// Outbound collaborators the services are built from.
#[derive(Debug, Clone)]
pub struct Dependencies {
    /// Ledger store.
    pub ledger: Arc<dyn LedgerStore>,
    /// Order gateway client, shared so its token cache is process-wide.
    pub gateway: Arc<GatewayClient>,
    /// Email sender.
    pub sender: Arc<dyn NotificationSender>,
    /// Card processor, when a secret key is configured.
    pub card: Option<Arc<dyn CardProcessor>>,
    /// Ledger backend name reported by `/health`.
    pub ledger_backend: &'static str,
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Starts gateway checkouts.
    pub checkout: Arc<CheckoutService>,
    /// Settles gateway orders from callbacks and notifications.
    pub reconciliation: Arc<ReconciliationService>,
    /// Applies signed card processor webhooks.
    pub card_webhooks: Arc<CardWebhookService>,
    /// Stores booking requests.
    pub bookings: Arc<BookingService>,
    /// Admin views and refunds.
    pub admin: Arc<AdminService>,
    /// Public origin for browser redirects, without a trailing slash.
    pub public_base_url: String,
    /// Ledger backend name reported by `/health`.
    pub ledger_backend: &'static str,
}

impl AppState {
    /// Wires every service from `config` and `deps`.
    #[must_use]
    pub fn new(config: &StudioConfig, deps: Dependencies) -> Self {
        let notifier = NotificationDispatch::new(
            Arc::clone(&deps.sender),
            config.studio_email.clone(),
            config.studio_name.clone(),
        );

        let checkout = CheckoutService::new(
            Arc::clone(&deps.gateway),
            Arc::clone(&deps.ledger),
            CheckoutSettings {
                default_amount_minor: config.deposit_default_minor,
                default_currency: config.default_currency.clone(),
                country_code: config.country_code.clone(),
                callback_url: config.callback_url(),
                description: format!("{} booking deposit", config.studio_name),
            },
        );
        let reconciliation = ReconciliationService::new(
            Arc::clone(&deps.gateway),
            Arc::clone(&deps.ledger),
            notifier.clone(),
            config.default_currency.clone(),
        );
        let card_webhooks = CardWebhookService::new(
            Arc::clone(&deps.ledger),
            notifier.clone(),
            config.card_webhook_secret.clone(),
            config.card_webhook_tolerance_secs,
        );
        let bookings = BookingService::new(Arc::clone(&deps.ledger), notifier);
        let admin = AdminService::new(deps.ledger, deps.card, config.allow_refunds);

        Self {
            checkout: Arc::new(checkout),
            reconciliation: Arc::new(reconciliation),
            card_webhooks: Arc::new(card_webhooks),
            bookings: Arc::new(bookings),
            admin: Arc::new(admin),
            public_base_url: config.public_base_url.clone(),
            ledger_backend: deps.ledger_backend,
        }
    }
}
