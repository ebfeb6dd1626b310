//! Message templates for SMS and email
//!
//! Plain builders, no templating engine; every email has both an HTML and a
//! text body.

use rust_decimal::Decimal;

use crate::booking::Booking;
use crate::withdrawal::WithdrawalRequest;

pub fn otp_sms(code: &str, amount: Decimal, currency: &str) -> String {
    format!(
        "Your TripVault withdrawal code is {}. It authorizes a withdrawal of {} {} and expires in 5 minutes. Never share this code.",
        code, amount, currency
    )
}

pub fn otp_email(code: &str, amount: Decimal, currency: &str) -> (String, String, String) {
    let subject = "Your TripVault withdrawal code".to_string();
    let text = otp_sms(code, amount, currency);
    let html = format!(
        "<p>Your TripVault withdrawal code is <strong>{}</strong>.</p>\
         <p>It authorizes a withdrawal of <strong>{} {}</strong> and expires in 5 minutes.</p>\
         <p>Never share this code.</p>",
        code, amount, currency
    );
    (subject, html, text)
}

pub fn booking_code_sms(booking: &Booking, code: &str) -> String {
    format!(
        "Hello {}, your TripVault {} check-in code is {}. Show it to your {} on arrival.",
        booking.guest_name,
        booking.kind.label(),
        code,
        staff_label(booking)
    )
}

pub fn booking_code_email(booking: &Booking, code: &str) -> (String, String, String) {
    let subject = format!("Your TripVault {} check-in code", booking.kind.label());
    let text = booking_code_sms(booking, code);
    let html = format!(
        "<p>Hello {},</p>\
         <p>Your {} check-in code is <strong style=\"font-size:1.4em\">{}</strong>.</p>\
         <p>Show it to your {} on arrival to confirm your check-in.</p>",
        booking.guest_name,
        booking.kind.label(),
        code,
        staff_label(booking)
    );
    (subject, html, text)
}

pub fn checkin_guest_email(booking: &Booking, instructions: Option<&str>) -> (String, String, String) {
    let subject = "Check-in confirmed".to_string();
    let extra_text = instructions
        .map(|i| format!("\n\nA note from your {}: {}", staff_label(booking), i))
        .unwrap_or_default();
    let text = format!(
        "Hello {}, your {} check-in is confirmed. Enjoy your {}!{}",
        booking.guest_name,
        booking.kind.label(),
        booking.kind.label(),
        extra_text
    );
    let extra_html = instructions
        .map(|i| format!("<p>A note from your {}: {}</p>", staff_label(booking), i))
        .unwrap_or_default();
    let html = format!(
        "<p>Hello {},</p><p>Your {} check-in is confirmed. Enjoy your {}!</p>{}",
        booking.guest_name,
        booking.kind.label(),
        booking.kind.label(),
        extra_html
    );
    (subject, html, text)
}

pub fn checkin_staff_email(booking: &Booking) -> (String, String, String) {
    let subject = format!("Guest checked in - booking {}", booking.id);
    let text = format!(
        "{} has checked in for booking {}. Held funds for this booking have been released to your wallet.",
        booking.guest_name, booking.id
    );
    let html = format!("<p>{}</p>", text);
    (subject, html, text)
}

pub fn checkout_guest_email(booking: &Booking) -> (String, String, String) {
    let subject = "Check-out confirmed".to_string();
    let text = format!(
        "Hello {}, your check-out is confirmed. Thank you for travelling with TripVault!",
        booking.guest_name
    );
    let html = format!("<p>{}</p>", text);
    (subject, html, text)
}

pub fn withdrawal_sms(request: &WithdrawalRequest) -> String {
    format!(
        "TripVault: your withdrawal {} of {} {} is now {}.",
        request.reference,
        request.amount,
        request.currency,
        request.status.as_str()
    )
}

pub fn withdrawal_email(request: &WithdrawalRequest) -> (String, String, String) {
    let subject = format!("Withdrawal {} {}", request.reference, request.status.as_str());

    let outcome_text = if request.status.requires_refund() {
        let reason = request.failure_reason.as_deref().unwrap_or("not specified");
        format!(
            "The withdrawal did not complete (reason: {}). The full amount of {} {} has been returned to your wallet balance.",
            reason, request.amount, request.currency
        )
    } else if request.status.is_terminal() {
        format!(
            "Your withdrawal of {} {} has been paid out to your selected destination.",
            request.amount, request.currency
        )
    } else {
        format!(
            "Your withdrawal of {} {} is now {}. We will keep you posted.",
            request.amount,
            request.currency,
            request.status.as_str()
        )
    };

    let text = format!("Withdrawal {}: {}", request.reference, outcome_text);
    let html = format!(
        "<p>Withdrawal <strong>{}</strong></p><p>{}</p>",
        request.reference, outcome_text
    );
    (subject, html, text)
}

pub fn admin_withdrawal_email(request: &WithdrawalRequest) -> (String, String, String) {
    let subject = format!(
        "[withdrawals] {} -> {}",
        request.reference,
        request.status.as_str()
    );
    let text = format!(
        "Withdrawal {} for user {} ({} {}) moved to {}.{}",
        request.reference,
        request.user_id,
        request.amount,
        request.currency,
        request.status.as_str(),
        request
            .failure_reason
            .as_deref()
            .map(|r| format!(" Reason: {}", r))
            .unwrap_or_default()
    );
    let html = format!("<p>{}</p>", text);
    (subject, html, text)
}

fn staff_label(booking: &Booking) -> &'static str {
    match booking.kind.label() {
        "tour" => "guide",
        _ => "host",
    }
}
