//! Account notification subscriber.
//!
//! Turns `user.registered` and `user.password_reset_requested` events into
//! emails carrying a one-time link. Without a mailer the link is logged, which
//! is what local development runs rely on.

use tokio::sync::broadcast;

use crate::bus::{event_types, DomainEvent};
use crate::delivery::email::EmailDelivery;

/// An email ready to hand to [`EmailDelivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub link: String,
    pub body: String,
}

pub struct AccountNotifier {
    mailer: Option<EmailDelivery>,
    app_base_url: String,
    /// Lifetime of a password reset token, quoted in the reset email.
    reset_token_ttl_mins: i64,
}

impl AccountNotifier {
    pub fn new(
        mailer: Option<EmailDelivery>,
        app_base_url: impl Into<String>,
        reset_token_ttl_mins: i64,
    ) -> Self {
        Self {
            mailer,
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
            reset_token_ttl_mins,
        }
    }

    /// Run until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(email) = self.compose(&event) {
                        self.deliver(email).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Account notifier lagged, some emails were not sent",
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, account notifier shutting down");
                    break;
                }
            }
        }
    }

    /// Build the email for an event, or `None` if the event needs no email or
    /// lacks the address or token.
    pub fn compose(&self, event: &DomainEvent) -> Option<OutgoingEmail> {
        let to = event.payload_str("email")?.to_string();
        let name = event.payload_str("name").unwrap_or("there");

        match event.event_type.as_str() {
            event_types::USER_REGISTERED => {
                let token = event.payload_str("verification_token")?;
                let link = format!("{}/verify-email?token={token}", self.app_base_url);
                let body = format!(
                    "Hi {name},\n\nWelcome to Parlor. \
                     Confirm your email address by opening:\n\n{link}\n"
                );
                Some(OutgoingEmail {
                    to,
                    subject: "Verify your email".into(),
                    link,
                    body,
                })
            }
            event_types::PASSWORD_RESET_REQUESTED => {
                let token = event.payload_str("reset_token")?;
                let link = format!("{}/reset-password?token={token}", self.app_base_url);
                let expiry = describe_minutes(self.reset_token_ttl_mins);
                let body = format!(
                    "Hi {name},\n\nSomeone asked to reset your Parlor password. \
                     The link below expires in {expiry}:\n\n{link}\n\n\
                     If this was not you, ignore this email.\n"
                );
                Some(OutgoingEmail {
                    to,
                    subject: "Reset your password".into(),
                    link,
                    body,
                })
            }
            _ => None,
        }
    }

    async fn deliver(&self, email: OutgoingEmail) {
        let Some(mailer) = &self.mailer else {
            tracing::info!(
                to = %email.to,
                subject = %email.subject,
                link = %email.link,
                "SMTP not configured, email not sent",
            );
            return;
        };
        if let Err(e) = mailer.send(&email.to, &email.subject, email.body).await {
            tracing::error!(error = %e, to = %email.to, "Failed to send account email");
        }
    }
}

/// "1 hour", "90 minutes", "2 hours".
fn describe_minutes(mins: i64) -> String {
    match mins {
        60 => "1 hour".into(),
        m if m > 0 && m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".into(),
        m => format!("{m} minutes"),
    }
}
