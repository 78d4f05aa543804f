//! Gateway callback and notification payloads.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Only notification type that triggers reconciliation.
pub const STATUS_CHANGE: &str = "IPNCHANGE";

/// Query string of the browser return from the hosted payment page.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Gateway tracking id.
    #[serde(rename = "OrderTrackingId")]
    pub order_tracking_id: Option<String>,
    /// Merchant reference of the order.
    #[serde(rename = "OrderMerchantReference")]
    pub order_merchant_reference: Option<String>,
}

/// Gateway push notification, as JSON body or query string.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IpnNotification {
    /// Gateway tracking id.
    #[serde(rename = "OrderTrackingId")]
    pub order_tracking_id: Option<String>,
    /// Merchant reference of the order.
    #[serde(rename = "OrderMerchantReference")]
    pub order_merchant_reference: Option<String>,
    /// Notification discriminator, e.g. `IPNCHANGE`.
    #[serde(rename = "OrderNotificationType")]
    pub order_notification_type: Option<String>,
}

impl IpnNotification {
    /// Non-blank tracking id.
    #[must_use]
    pub fn tracking_id(&self) -> Option<&str> {
        self.order_tracking_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Merchant reference, empty when absent.
    #[must_use]
    pub fn merchant_reference(&self) -> &str {
        self.order_merchant_reference.as_deref().unwrap_or_default()
    }

    /// Whether this notification reports a status change.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        self.order_notification_type.as_deref() == Some(STATUS_CHANGE)
    }
}

/// Acknowledgement returned to the gateway. Always sent with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IpnAck {
    /// `OK` or `ERROR`.
    pub status: &'static str,
    /// What happened.
    pub message: String,
}

impl IpnAck {
    /// Successful acknowledgement.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "OK",
            message: message.into(),
        }
    }

    /// Acknowledged, but processing failed.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "ERROR",
            message: message.into(),
        }
    }
}
