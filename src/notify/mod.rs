//! Outbound notifications.
//!
//! [`NotificationDispatch`] turns domain events into emails and sends each
//! one independently: a failed customer email never prevents the operator
//! email and vice versa, and no failure is ever returned to the caller.
//! Outcomes are reported as [`Delivery`] values for logging and tests.

pub mod sender;
pub mod templates;

use std::sync::Arc;

use crate::domain::{Booking, Receipt};
pub use sender::{EmailMessage, LogSender, NotificationSender, NotifyError, ResendSender};

/// Outcome of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the sender.
    Sent,
    /// Not attempted (no usable recipient).
    Skipped,
    /// The sender failed; the error was logged.
    Failed(String),
}

impl Delivery {
    /// `true` for [`Delivery::Sent`].
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Outcome of a customer + operator notification pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Customer email.
    pub customer: Delivery,
    /// Operator email.
    pub studio: Delivery,
}

/// Builds and sends the service's emails.
#[derive(Debug, Clone)]
pub struct NotificationDispatch {
    sender: Arc<dyn NotificationSender>,
    studio_email: String,
    studio_name: String,
}

fn looks_like_email(address: &str) -> bool {
    let address = address.trim();
    address.contains('@') && !address.starts_with('@') && !address.ends_with('@')
}

impl NotificationDispatch {
    /// Creates a dispatcher that notifies `studio_email` as the operator.
    #[must_use]
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        studio_email: impl Into<String>,
        studio_name: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            studio_email: studio_email.into(),
            studio_name: studio_name.into(),
        }
    }

    async fn deliver(&self, kind: &'static str, message: EmailMessage) -> Delivery {
        if !looks_like_email(&message.to) {
            tracing::info!(kind, to = %message.to, "no usable recipient; email skipped");
            return Delivery::Skipped;
        }
        match self.sender.send(&message).await {
            Ok(()) => {
                tracing::info!(kind, to = %message.to, "email sent");
                Delivery::Sent
            }
            Err(e) => {
                tracing::error!(kind, to = %message.to, error = %e, "email failed");
                Delivery::Failed(e.to_string())
            }
        }
    }

    /// Customer receipt and operator notice for a reconciled payment.
    pub async fn deposit_confirmed(
        &self,
        receipt: &Receipt,
        booking: Option<&Booking>,
    ) -> DispatchReport {
        let customer = self
            .deliver(
                "customer_receipt",
                EmailMessage {
                    to: receipt.customer_email.clone(),
                    subject: format!(
                        "Deposit Received - Booking Confirmed | {}",
                        self.studio_name
                    ),
                    html: templates::customer_receipt(&self.studio_name, receipt, booking),
                    reply_to: Some(self.studio_email.clone()),
                },
            )
            .await;

        let studio = self
            .deliver(
                "studio_deposit_notice",
                EmailMessage {
                    to: self.studio_email.clone(),
                    subject: format!("Deposit Received - {}", receipt.customer_name),
                    html: templates::studio_deposit_notice(receipt, booking),
                    reply_to: receipt
                        .has_customer_email()
                        .then(|| receipt.customer_email.clone()),
                },
            )
            .await;

        DispatchReport { customer, studio }
    }

    /// Operator notice and customer thanks for a settled card session.
    pub async fn card_deposit_received(
        &self,
        session_id: &str,
        email: Option<&str>,
        amount_minor: i64,
        currency: &str,
        payment_status: &str,
    ) -> DispatchReport {
        let formatted = templates::format_minor(amount_minor, currency);

        let studio = self
            .deliver(
                "studio_card_deposit",
                EmailMessage {
                    to: self.studio_email.clone(),
                    subject: format!("Deposit received: {formatted}"),
                    html: templates::card_deposit_notice(
                        &formatted,
                        email,
                        session_id,
                        payment_status,
                    ),
                    reply_to: email.map(str::to_string),
                },
            )
            .await;

        let customer = self
            .deliver(
                "customer_card_deposit",
                EmailMessage {
                    to: email.unwrap_or_default().to_string(),
                    subject: format!("We received your deposit ({formatted})"),
                    html: templates::card_deposit_thanks(&formatted),
                    reply_to: Some(self.studio_email.clone()),
                },
            )
            .await;

        DispatchReport { customer, studio }
    }

    /// Operator notice for a new booking request.
    pub async fn booking_received(&self, booking: &Booking) -> Delivery {
        self.deliver(
            "booking_request",
            EmailMessage {
                to: self.studio_email.clone(),
                subject: format!("New booking request from {}", booking.name),
                html: templates::booking_request(booking),
                reply_to: Some(booking.email.clone()),
            },
        )
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::LedgerSync;

    /// Records messages; fails for recipients listed in `fail_for`.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSender {
        pub(crate) sent: Mutex<Vec<EmailMessage>>,
        pub(crate) fail_for: Vec<String>,
    }

    impl RecordingSender {
        pub(crate) fn recipients(&self) -> Vec<String> {
            self.sent
                .lock()
                .map(|sent| sent.iter().map(|m| m.to.clone()).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            if self.fail_for.contains(&message.to) {
                return Err(NotifyError::Rejected("mailbox unavailable".to_string()));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message.clone());
            }
            Ok(())
        }
    }

    fn receipt(email: &str) -> Receipt {
        Receipt {
            booking_id: None,
            deposit_id: None,
            customer_name: "Ada".to_string(),
            customer_email: email.to_string(),
            amount: 15.5,
            amount_minor: 1550,
            currency: "USD".to_string(),
            payment_method: "MpesaKE".to_string(),
            transaction_id: "CONF-1".to_string(),
            payment_date: "2024-03-01".to_string(),
            status: "Completed".to_string(),
            order_tracking_id: "T1".to_string(),
            merchant_reference: "order_1".to_string(),
            ledger: LedgerSync::Inserted,
        }
    }

    fn dispatch_for(sender: &Arc<RecordingSender>) -> NotificationDispatch {
        NotificationDispatch::new(
            Arc::clone(sender) as Arc<dyn NotificationSender>,
            "studio@example.com",
            "Ink Studio",
        )
    }

    #[tokio::test]
    async fn customer_failure_does_not_block_studio_email() {
        let sender = Arc::new(RecordingSender {
            fail_for: vec!["ada@example.com".to_string()],
            ..RecordingSender::default()
        });
        let dispatch = dispatch_for(&sender);

        let report = dispatch
            .deposit_confirmed(&receipt("ada@example.com"), None)
            .await;

        assert!(matches!(report.customer, Delivery::Failed(_)));
        assert_eq!(report.studio, Delivery::Sent);
        assert_eq!(sender.recipients(), vec!["studio@example.com".to_string()]);
    }

    #[tokio::test]
    async fn phone_only_customer_is_skipped() {
        let sender = Arc::new(RecordingSender::default());
        let dispatch = dispatch_for(&sender);

        let report = dispatch.deposit_confirmed(&receipt("2547xxxx123"), None).await;

        assert_eq!(report.customer, Delivery::Skipped);
        assert!(report.studio.is_sent());
    }

    #[tokio::test]
    async fn card_deposit_without_email_notifies_studio_only() {
        let sender = Arc::new(RecordingSender::default());
        let dispatch = dispatch_for(&sender);

        let report = dispatch
            .card_deposit_received("cs_1", None, 5000, "usd", "paid")
            .await;

        assert_eq!(report.customer, Delivery::Skipped);
        assert_eq!(report.studio, Delivery::Sent);
        let subjects: Vec<String> = sender
            .sent
            .lock()
            .map(|s| s.iter().map(|m| m.subject.clone()).collect())
            .unwrap_or_default();
        assert_eq!(subjects, vec!["Deposit received: USD 50.00".to_string()]);
    }
}
