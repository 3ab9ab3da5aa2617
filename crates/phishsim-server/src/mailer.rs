use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use phishsim_core::config::SmtpConfig;

/// Outbound email transport.
///
/// The error string is a per-target transport failure, recorded in the
/// dispatch outcome — it never aborts the batch. Implementations must not
/// block past the dispatcher's send timeout (the dispatcher wraps every
/// call in one anyway).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), String>;
}

/// Real SMTP transport via lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(smtp: &SmtpConfig, timeout: Duration) -> Self {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp.host.clone())
            .port(smtp.port)
            .timeout(Some(timeout));
        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Self {
            transport: builder.build(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), String> {
        let from: Mailbox = from
            .parse()
            .map_err(|_| format!("invalid from address: {from}"))?;
        let to: Mailbox = to
            .parse()
            .map_err(|_| format!("invalid recipient address: {to}"))?;
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("smtp message build failed: {e}"))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| format!("smtp send failed: {e}"))?;
        Ok(())
    }
}

/// Accepts every message without touching the network.
///
/// Selected when `PHISHSIM_SMTP_NOOP` is set — local runs and CI, where a
/// real relay is unavailable and delivery is not what's under test.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(
        &self,
        _from: &str,
        to: &str,
        _subject: &str,
        _html_body: &str,
    ) -> Result<(), String> {
        info!(
            to = %to,
            "SMTP noop transport enabled; marking send as accepted without network dispatch"
        );
        Ok(())
    }
}
