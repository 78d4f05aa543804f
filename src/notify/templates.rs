//! HTML bodies for outbound emails.
//!
//! Every interpolated value goes through [`escape_html`]; booking fields and
//! gateway strings are user- or third-party-controlled.

use std::fmt::Write as _;

use crate::domain::{Booking, Receipt, deposit::to_major_units};

const WRAPPER_OPEN: &str = "<div style=\"font-family:ui-sans-serif,system-ui,Segoe UI,Roboto,\
     Helvetica,Arial;line-height:1.6;color:#111\">";
const WRAPPER_CLOSE: &str = "</div>";

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// `USD 15.50` style amount from minor units.
#[must_use]
pub fn format_minor(amount_minor: i64, currency: &str) -> String {
    format!("{} {:.2}", currency.to_uppercase(), to_major_units(amount_minor))
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<p><strong>{label}:</strong> {}</p>",
        escape_html(value)
    );
}

fn optional_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        field(out, label, value);
    }
}

/// Customer receipt for a reconciled gateway payment.
#[must_use]
pub fn customer_receipt(studio_name: &str, receipt: &Receipt, booking: Option<&Booking>) -> String {
    let mut out = String::from(WRAPPER_OPEN);
    let _ = write!(
        out,
        "<h2>Deposit received</h2><p>Thank you, {}! Your deposit payment has been processed \
         and your booking is confirmed.</p><h3>Payment receipt</h3>",
        escape_html(&receipt.customer_name)
    );
    field(&mut out, "Customer name", &receipt.customer_name);
    if let Some(booking_id) = receipt.booking_id {
        field(&mut out, "Booking ID", &booking_id.to_string());
    }
    field(
        &mut out,
        "Amount paid",
        &format_minor(receipt.amount_minor, &receipt.currency),
    );
    field(&mut out, "Payment method", &receipt.payment_method);
    field(&mut out, "Transaction ID", &receipt.transaction_id);
    field(&mut out, "Payment date", &receipt.payment_date);
    field(&mut out, "Status", &receipt.status);

    if let Some(booking) = booking {
        out.push_str("<h3>Booking details</h3>");
        field(&mut out, "Placement", &booking.placement);
        field(&mut out, "Size", &booking.size);
        optional_field(&mut out, "Style", booking.style.as_deref());
        optional_field(&mut out, "Preferred dates", booking.preferred_dates.as_deref());
    }

    out.push_str(
        "<h3>What's next?</h3><ul><li>Keep this email as your payment receipt.</li>\
         <li>We'll contact you within 24-48 hours to confirm your appointment.</li>\
         <li>Your deposit will be applied to the final cost of your tattoo.</li>\
         <li>If you have any questions, reply to this email.</li></ul>",
    );
    let _ = write!(out, "<p>Thank you for choosing {}!</p>", escape_html(studio_name));
    out.push_str(WRAPPER_CLOSE);
    out
}

/// Operator notification for a reconciled gateway payment.
#[must_use]
pub fn studio_deposit_notice(receipt: &Receipt, booking: Option<&Booking>) -> String {
    let mut out = String::from(WRAPPER_OPEN);
    out.push_str("<h2>New deposit payment received</h2><h3>Customer</h3>");
    field(&mut out, "Name", &receipt.customer_name);
    field(&mut out, "Contact", &receipt.customer_email);
    if let Some(booking_id) = receipt.booking_id {
        field(&mut out, "Booking ID", &booking_id.to_string());
    }

    out.push_str("<h3>Payment</h3>");
    field(
        &mut out,
        "Amount",
        &format_minor(receipt.amount_minor, &receipt.currency),
    );
    field(&mut out, "Payment method", &receipt.payment_method);
    field(&mut out, "Transaction ID", &receipt.transaction_id);
    field(&mut out, "Order tracking ID", &receipt.order_tracking_id);
    field(&mut out, "Merchant reference", &receipt.merchant_reference);
    field(&mut out, "Payment date", &receipt.payment_date);

    if let Some(booking) = booking {
        out.push_str("<h3>Booking</h3>");
        field(&mut out, "Placement", &booking.placement);
        field(&mut out, "Size", &booking.size);
        optional_field(&mut out, "Style", booking.style.as_deref());
        optional_field(&mut out, "Preferred dates", booking.preferred_dates.as_deref());
        optional_field(&mut out, "Phone", booking.phone.as_deref());
        field(&mut out, "Idea", &booking.details);
    }
    out.push_str(WRAPPER_CLOSE);
    out
}

/// Operator notification for a new booking request.
#[must_use]
pub fn booking_request(booking: &Booking) -> String {
    let mut out = String::from(WRAPPER_OPEN);
    out.push_str("<h2 style=\"margin:0 0 12px 0\">New booking request</h2>");
    field(&mut out, "Name", &booking.name);
    field(&mut out, "Email", &booking.email);
    optional_field(&mut out, "Phone", booking.phone.as_deref());
    field(&mut out, "Placement", &booking.placement);
    field(&mut out, "Size", &booking.size);
    optional_field(&mut out, "Style", booking.style.as_deref());
    optional_field(&mut out, "Preferred dates", booking.preferred_dates.as_deref());
    optional_field(&mut out, "Budget", booking.budget.as_deref());
    optional_field(&mut out, "References", booking.references.as_deref());
    if !booking.uploads.is_empty() {
        out.push_str("<p><strong>Uploaded images:</strong></p><ul>");
        for url in &booking.uploads {
            let url = escape_html(url);
            let _ = write!(out, "<li><a href=\"{url}\">{url}</a></li>");
        }
        out.push_str("</ul>");
    }
    let _ = write!(
        out,
        "<p><strong>Idea</strong></p><div>{}</div>",
        escape_html(&booking.details)
    );
    out.push_str(WRAPPER_CLOSE);
    out
}

/// Operator notification for a settled card checkout session.
#[must_use]
pub fn card_deposit_notice(
    formatted_amount: &str,
    email: Option<&str>,
    session_id: &str,
    payment_status: &str,
) -> String {
    let mut out = String::from(WRAPPER_OPEN);
    out.push_str("<h2>Deposit received</h2>");
    field(&mut out, "Amount", formatted_amount);
    field(&mut out, "Customer email", email.unwrap_or("N/A"));
    field(&mut out, "Session ID", session_id);
    field(&mut out, "Payment status", payment_status);
    out.push_str(WRAPPER_CLOSE);
    out
}

/// Customer acknowledgement for a settled card checkout session.
#[must_use]
pub fn card_deposit_thanks(formatted_amount: &str) -> String {
    format!(
        "{WRAPPER_OPEN}<p>Thanks! We received your deposit of {}. We'll follow up by email \
         to confirm details.</p>{WRAPPER_CLOSE}",
        escape_html(formatted_amount)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewBooking;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b onclick="x">Tom & 'Jerry'</b>"#),
            "&lt;b onclick=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_minor(1550, "usd"), "USD 15.50");
        assert_eq!(format_minor(100_000, "UGX"), "UGX 1000.00");
    }

    #[test]
    fn booking_request_escapes_user_input() {
        let booking = NewBooking {
            name: "<script>alert(1)</script>".to_string(),
            email: "ada@example.com".to_string(),
            placement: "arm".to_string(),
            size: "small".to_string(),
            details: "fern & moon".to_string(),
            uploads: vec!["https://img.example/1.png".to_string()],
            ..NewBooking::default()
        }
        .into_booking();

        let html = booking_request(&booking);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("fern &amp; moon"));
        assert!(html.contains("href=\"https://img.example/1.png\""));
        assert!(!html.contains("Budget"));
    }
}
