//! Delivery of a finished [`ResultSet`].

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::EmailConfig;
use crate::error::{Result, WatchError};
use crate::models::ResultSet;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, results: &ResultSet) -> Result<()>;
}

/// Subject and plain-text body describing one run's matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

impl Report {
    pub fn compose(
        results: &ResultSet,
        subject_prefix: &str,
        subject_label: &str,
        checked_at: DateTime<Local>,
    ) -> Self {
        let subject = format!(
            "{subject_prefix} {} {subject_label} Found!",
            results.len()
        );
        let entries = results
            .iter()
            .map(|m| format!("{} - ¥{}\n{}", m.title(), m.price(), m.url()))
            .collect::<Vec<_>>()
            .join("\n\n");
        let body = format!("{entries}\n\nChecked at {}", checked_at.to_rfc3339());
        Self { subject, body }
    }
}

/// Prints matches to stdout, as a numbered list or as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    json: bool,
}

impl ConsoleNotifier {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// The text printed for `results`. In JSON mode this is always a JSON
    /// array, `[]` when nothing matched.
    pub fn render(&self, results: &ResultSet) -> Result<String> {
        if self.json {
            return serde_json::to_string_pretty(results)
                .map_err(|e| WatchError::Notify(format!("failed to encode results: {e}")));
        }

        let mut out = String::new();
        for (i, m) in results.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n", i + 1, m.title()));
            out.push_str(&format!("   💰 Price: ¥{}\n", m.price()));
            out.push_str(&format!("   🔗 {}\n", m.url()));
        }
        Ok(out)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, results: &ResultSet) -> Result<()> {
        let rendered = self.render(results)?;
        if self.json {
            println!("{rendered}");
        } else {
            print!("{rendered}");
        }
        Ok(())
    }
}

/// Sends the [`Report`] over SMTP with implicit TLS.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject_prefix: String,
    subject_label: String,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let (Some(username), Some(password), Some(recipient)) = (
            non_empty(&config.username),
            non_empty(&config.password),
            non_empty(&config.recipient),
        ) else {
            return Err(WatchError::Notify(
                "missing e-mail credentials (EMAIL_USER, EMAIL_PASS, EMAIL_TO)".into(),
            ));
        };

        let from = parse_mailbox(username)?;
        let to = parse_mailbox(recipient)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| WatchError::Notify(format!("invalid SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
            subject_prefix: config.subject_prefix.clone(),
            subject_label: config.subject_label.clone(),
        })
    }

    pub fn message(&self, results: &ResultSet) -> Result<Message> {
        let report = Report::compose(
            results,
            &self.subject_prefix,
            &self.subject_label,
            Local::now(),
        );
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(report.body)
            .map_err(|e| WatchError::Notify(format!("failed to build message: {e}")))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, results: &ResultSet) -> Result<()> {
        let message = self.message(results)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| WatchError::Notify(format!("failed to send email: {e}")))?;
        info!("✅ Email sent to {}", self.to);
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| WatchError::Notify(format!("invalid e-mail address `{address}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedRecord;
    use chrono::TimeZone;

    fn results() -> ResultSet {
        let mut results = ResultSet::new();
        for (title, price, asin) in [
            ("LG UltraGear OLED Curved", 75_000, "B01"),
            ("Samsung Odyssey OLED G8 曲面", 68_500, "B02"),
        ] {
            results.push(
                NormalizedRecord {
                    title: title.into(),
                    price,
                    absolute_url: format!("https://www.amazon.co.jp/dp/{asin}"),
                }
                .into(),
            );
        }
        results
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            username: Some("watcher@example.com".into()),
            password: Some("app-password".into()),
            recipient: Some("me@example.com".into()),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn composes_subject_and_body() {
        let checked_at = Local.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let report = Report::compose(
            &results(),
            "[Amazon JP Alert]",
            "Curved OLED Monitors",
            checked_at,
        );

        assert_eq!(report.subject, "[Amazon JP Alert] 2 Curved OLED Monitors Found!");
        let expected = format!(
            "LG UltraGear OLED Curved - ¥75000\nhttps://www.amazon.co.jp/dp/B01\n\n\
             Samsung Odyssey OLED G8 曲面 - ¥68500\nhttps://www.amazon.co.jp/dp/B02\n\n\
             Checked at {}",
            checked_at.to_rfc3339()
        );
        assert_eq!(report.body, expected);
    }

    #[test]
    fn missing_credentials_are_reported() {
        let config = EmailConfig {
            password: Some("   ".into()),
            ..email_config()
        };
        let err = EmailNotifier::new(&config).err().unwrap();
        assert!(err.to_string().contains("EMAIL_PASS"));
        assert!(EmailNotifier::new(&EmailConfig::default()).is_err());
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let config = EmailConfig {
            recipient: Some("not an address".into()),
            ..email_config()
        };
        assert!(matches!(EmailNotifier::new(&config), Err(WatchError::Notify(_))));
    }

    #[tokio::test]
    async fn builds_message_for_results() {
        let notifier = EmailNotifier::new(&email_config()).unwrap();
        let message = notifier.message(&results()).unwrap();
        let headers = message.headers().to_string();
        assert!(headers.contains("Subject: [Amazon JP Alert] 2 Curved OLED Monitors Found!"));
        assert!(headers.contains("To: me@example.com"));
    }

    #[test]
    fn json_output_is_an_array_of_matches() {
        let rendered = ConsoleNotifier::new(true).render(&results()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        let matches = parsed.as_array().unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0]["title"], "LG UltraGear OLED Curved");
        assert_eq!(matches[0]["price"], 75_000);
        assert_eq!(matches[1]["absolute_url"], "https://www.amazon.co.jp/dp/B02");
    }

    #[test]
    fn empty_json_output_is_an_empty_array() {
        let rendered = ConsoleNotifier::new(true).render(&ResultSet::new()).unwrap();
        assert_eq!(rendered, "[]");
    }

    #[test]
    fn text_output_numbers_each_match() {
        let rendered = ConsoleNotifier::new(false).render(&results()).unwrap();
        assert!(rendered.contains("\n1. LG UltraGear OLED Curved\n   💰 Price: ¥75000\n"));
        assert!(rendered.contains("\n2. Samsung Odyssey OLED G8 曲面\n"));
        assert!(ConsoleNotifier::new(false).render(&ResultSet::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn console_notifier_accepts_empty_results() {
        ConsoleNotifier::new(false).notify(&ResultSet::new()).await.unwrap();
        ConsoleNotifier::new(true).notify(&results()).await.unwrap();
    }
}
