//! Order gateway entry points: browser return and push notifications.
//!
//! The notification endpoints always answer 200 so the gateway does not
//! retry on outcomes that are final for us; failures travel in the body.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{CallbackParams, IpnAck, IpnNotification};
use crate::app_state::AppState;
use crate::service::ReconcileError;

fn page(base: &str, path: &str, pairs: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();
    format!("{base}{path}?{query}")
}

fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `GET /payment/callback` — Browser return from the hosted payment page.
#[utoipa::path(
    get,
    path = "/payment/callback",
    tag = "Payments",
    summary = "Payment return",
    description = "Reconciles the order and redirects the customer to the success page, or to the cancel page with an error reason.",
    params(CallbackParams),
    responses(
        (status = 302, description = "Redirect to /checkout/success or /checkout/cancel"),
    )
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let base = state.public_base_url.as_str();
    let (Some(tracking_id), Some(reference)) = (
        non_blank(params.order_tracking_id.as_deref()),
        non_blank(params.order_merchant_reference.as_deref()),
    ) else {
        tracing::warn!("payment callback without tracking id or merchant reference");
        return redirect(page(base, "/checkout/cancel", &[("error", "missing_params")]));
    };

    match state.reconciliation.reconcile(tracking_id, reference).await {
        Ok(_) => redirect(page(
            base,
            "/checkout/success",
            &[("order", tracking_id), ("ref", reference)],
        )),
        Err(e) => {
            tracing::warn!(tracking_id, error = %e, "payment callback not reconciled");
            let reason = e.to_string();
            redirect(page(base, "/checkout/cancel", &[("error", reason.as_str())]))
        }
    }
}

async fn acknowledge(state: &AppState, notification: &IpnNotification, reconcile: bool) -> IpnAck {
    let Some(tracking_id) = notification.tracking_id() else {
        tracing::warn!("notification without OrderTrackingId");
        return IpnAck::error("Missing OrderTrackingId");
    };
    if !reconcile {
        tracing::info!(
            tracking_id,
            notification_type = ?notification.order_notification_type,
            "notification type not processed"
        );
        return IpnAck::ok("IPN received; notification type not processed");
    }

    match state
        .reconciliation
        .reconcile(tracking_id, notification.merchant_reference())
        .await
    {
        Ok(receipt) => {
            tracing::info!(tracking_id, ledger = ?receipt.ledger, "notification reconciled");
            IpnAck::ok("IPN received and processed")
        }
        Err(ReconcileError::NotCompleted(status)) => {
            tracing::info!(tracking_id, %status, "notification for unfinished payment");
            IpnAck::ok(format!("payment not completed: {status}"))
        }
        Err(e) => {
            tracing::error!(tracking_id, error = %e, "notification not reconciled");
            IpnAck::error(e.to_string())
        }
    }
}

/// `POST /payment/ipn` — Gateway push notification.
#[utoipa::path(
    post,
    path = "/payment/ipn",
    tag = "Payments",
    summary = "Gateway notification",
    description = "Reconciles the order when the notification type is IPNCHANGE. Always answers 200; failures are reported as status ERROR.",
    request_body = IpnNotification,
    responses(
        (status = 200, description = "Notification acknowledged", body = IpnAck),
    )
)]
pub async fn ipn_post(State(state): State<AppState>, body: Bytes) -> Json<IpnAck> {
    let notification: IpnNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!(error = %e, "malformed notification body");
            return Json(IpnAck::error(format!("malformed notification: {e}")));
        }
    };
    let reconcile = notification.is_status_change();
    Json(acknowledge(&state, &notification, reconcile).await)
}

/// `GET /payment/ipn` — Gateway notification delivered as a query string.
#[utoipa::path(
    get,
    path = "/payment/ipn",
    tag = "Payments",
    summary = "Gateway notification (GET)",
    description = "Same as the POST variant; also reconciles when OrderNotificationType is absent.",
    params(IpnNotification),
    responses(
        (status = 200, description = "Notification acknowledged", body = IpnAck),
    )
)]
pub async fn ipn_get(
    State(state): State<AppState>,
    Query(notification): Query<IpnNotification>,
) -> Json<IpnAck> {
    let reconcile =
        notification.order_notification_type.is_none() || notification.is_status_change();
    Json(acknowledge(&state, &notification, reconcile).await)
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/callback", get(payment_callback))
        .route("/payment/ipn", get(ipn_get).post(ipn_post))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn redirect_query_is_encoded() {
        let url = page(
            "https://studio.example",
            "/checkout/cancel",
            &[("error", "payment not completed: Failed")],
        );
        assert_eq!(
            url,
            "https://studio.example/checkout/cancel?error=payment+not+completed%3A+Failed"
        );
    }

    #[test]
    fn get_query_parses_gateway_names() {
        let uri: axum::http::Uri = "/payment/ipn?OrderTrackingId=T1&OrderMerchantReference=order_1"
            .parse()
            .unwrap_or_default();
        let Ok(Query(params)) = Query::<IpnNotification>::try_from_uri(&uri) else {
            panic!("query should parse");
        };
        assert_eq!(params.tracking_id(), Some("T1"));
        assert_eq!(params.merchant_reference(), "order_1");
        assert!(!params.is_status_change());
    }
}
