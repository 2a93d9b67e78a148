use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
    notifications::{Notifier, PaymentEvent},
    payments::charge_description::format_cents,
};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    reply_to: Option<Mailbox>,
}

impl EmailNotifier {
    /// Returns None when email is disabled or the SMTP config is incomplete.
    pub fn new(config: EmailConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let host = config.smtp_host?;
        let from: Mailbox = config.from_address?.parse().ok()?;
        let reply_to = config
            .member_services_address
            .and_then(|addr| addr.parse().ok());

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&host).ok()?;
        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (config.smtp_username, config.smtp_password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Some(Self {
            mailer: builder.build(),
            from,
            reply_to,
        })
    }

    fn build_message(&self, event: &PaymentEvent) -> Result<Message> {
        let (to, subject, body) = match event {
            PaymentEvent::InstallmentReceived {
                user,
                charge,
                outstanding_cents,
            } => (
                user.email.clone(),
                "Payment received".to_string(),
                format!(
                    "Hi {},\n\nWe received your payment: {}.\n\nYour outstanding balance is {}. \
                     You can pay the remainder from your membership page at any time.\n",
                    user.display_name,
                    charge.comment,
                    format_cents(*outstanding_cents, &charge.currency),
                ),
            ),
            PaymentEvent::FullyPaid { user, charge } => (
                user.email.clone(),
                "Membership paid in full".to_string(),
                format!(
                    "Hi {},\n\nWe received your payment: {}.\n\nYour membership is now paid in full. \
                     Thank you, and see you at the convention!\n",
                    user.display_name, charge.comment,
                ),
            ),
            PaymentEvent::SiteSelectionPaid { user, charge, token } => (
                user.email.clone(),
                "Site selection payment received".to_string(),
                format!(
                    "Hi {},\n\nWe received your site selection payment: {}.\n\nYour voting token is: {}\n\n\
                     Keep this token; you will need it to cast your site selection ballot.\n",
                    user.display_name, charge.comment, token.token,
                ),
            ),
        };

        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid recipient address: {}", e)))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        builder
            .body(body)
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn notify(&self, event: &PaymentEvent) -> Result<()> {
        let message = self.build_message(event)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::External(format!("SMTP delivery failed: {}", e)))?;
        Ok(())
    }
}
