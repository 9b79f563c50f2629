use super::EmailMessage;
use crate::models::{subscription::Subscription, user::User};

fn format_price(price_cents: i64, currency: &str) -> String {
    format!("{}.{:02} {}", price_cents / 100, (price_cents % 100).abs(), currency)
}

fn layout(heading: &str, content: &str) -> String {
    format!(
        r#"
<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; line-height: 1.6;">
    <h2 style="color: #1f2937;">{}</h2>
    {}
    <hr style="margin: 30px 0; border: none; border-top: 1px solid #e5e7eb;">
    <p style="font-size: 12px; color: #6b7280; margin: 0;">
        You are receiving this email because of activity on your subtrack account.
    </p>
</body>
</html>
        "#,
        heading, content
    )
    .trim()
    .to_string()
}

fn details_table(subscription: &Subscription) -> String {
    let mut rows = vec![
        ("Plan", subscription.name.clone()),
        (
            "Price",
            format!(
                "{} / {}",
                format_price(subscription.price_cents, &subscription.currency),
                subscription.frequency
            ),
        ),
        (
            "Next renewal",
            subscription.renewal_date.format("%Y-%m-%d").to_string(),
        ),
    ];
    if let Some(method) = &subscription.payment_method {
        rows.push(("Payment method", method.clone()));
    }

    let rows: String = rows
        .into_iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"padding: 4px 12px 4px 0; color: #6b7280;\">{}</td><td>{}</td></tr>",
                label, value
            )
        })
        .collect();

    format!("<table>{}</table>", rows)
}

pub fn subscription_created(user: &User, subscription: &Subscription) -> EmailMessage {
    let content = format!(
        "<p>Hi {},</p><p>Your subscription to <strong>{}</strong> is now being tracked.</p>{}",
        user.name,
        subscription.name,
        details_table(subscription)
    );

    EmailMessage {
        to: user.email.clone(),
        subject: format!("Subscription confirmed: {}", subscription.name),
        html_body: layout("Subscription confirmed", &content),
    }
}

pub fn subscription_cancelled(user: &User, subscription: &Subscription) -> EmailMessage {
    let cancelled_on = subscription
        .cancelled_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "today".to_string());

    let content = format!(
        "<p>Hi {},</p><p>Your subscription to <strong>{}</strong> was cancelled on {}. It will not renew.</p>",
        user.name, subscription.name, cancelled_on
    );

    EmailMessage {
        to: user.email.clone(),
        subject: format!("Subscription cancelled: {}", subscription.name),
        html_body: layout("Subscription cancelled", &content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::{Frequency, Status};
    use chrono::{NaiveDate, Utc};

    fn user() -> User {
        User {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: "user".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn subscription() -> Subscription {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Subscription {
            id: 9,
            user_id: 1,
            name: "Cloud Storage".to_string(),
            price_cents: 1205,
            currency: "EUR".to_string(),
            frequency: Frequency::Monthly,
            category: None,
            payment_method: Some("paypal".to_string()),
            status: Status::Active,
            start_date: start,
            renewal_date: start + chrono::Duration::days(30),
            cancelled_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1205, "EUR"), "12.05 EUR");
        assert_eq!(format_price(0, "USD"), "0.00 USD");
        assert_eq!(format_price(100000, "GBP"), "1000.00 GBP");
    }

    #[test]
    fn test_created_message() {
        let msg = subscription_created(&user(), &subscription());
        assert_eq!(msg.to, "ada@example.com");
        assert_eq!(msg.subject, "Subscription confirmed: Cloud Storage");
        assert!(msg.html_body.contains("12.05 EUR / monthly"));
        assert!(msg.html_body.contains("2026-01-31"));
        assert!(msg.html_body.contains("paypal"));
        assert!(msg.html_body.starts_with("<html>"));
    }

    #[test]
    fn test_cancelled_message() {
        let mut sub = subscription();
        sub.status = Status::Cancelled;
        sub.cancelled_at = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0);

        let msg = subscription_cancelled(&user(), &sub);
        assert_eq!(msg.subject, "Subscription cancelled: Cloud Storage");
        assert!(msg.html_body.contains("cancelled on 2026-01-15"));
    }
}
