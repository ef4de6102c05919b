//! Outbound email
//!
//! Reset tokens and welcome messages. Delivery is fire-and-forget: the
//! reset endpoint must answer 200 in constant shape whether or not a
//! matching account exists, so nothing downstream may block or leak into
//! the response. When email is disabled (the default for development) the
//! message is logged instead of sent.

use crate::core::config::EmailConfig;

#[derive(Clone)]
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Queue a password-reset message. Never fails; delivery problems are
    /// logged and swallowed.
    pub fn send_password_reset(&self, to: &str, token: &str) {
        let body = format!(
            "A password reset was requested for this address.\r\n\
             Reset token: {token}\r\n\r\n\
             If you did not request this, you can ignore this message.\r\n"
        );
        self.send(to, "Password reset", body);
    }

    /// Welcome message after registration. Same fire-and-forget rules.
    pub fn send_verification(&self, to: &str, screen_name: &str) {
        let body = format!("Welcome, {screen_name}. Your account has been created.\r\n");
        self.send(to, "Welcome", body);
    }

    fn send(&self, to: &str, subject: &'static str, body: String) {
        let to = to.to_string();
        let from = self.config.from.clone();
        let enabled = self.config.enabled;

        tokio::spawn(async move {
            if !enabled {
                tracing::info!(%to, subject, "Email disabled; message dropped");
                return;
            }
            // Hands off to the local MTA via sendmail so no SMTP
            // credentials live in the config
            match deliver(&from, &to, subject, &body).await {
                Ok(()) => tracing::info!(%to, subject, "Sent email"),
                Err(e) => tracing::error!(%to, subject, error = %e, "Failed to send email"),
            }
        });
    }
}

async fn deliver(from: &str, to: &str, subject: &str, body: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    use tokio::process::Command;

    let message = format!("From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\n\r\n{body}");

    let mut child = Command::new("sendmail")
        .arg("-t")
        .stdin(std::process::Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(message.as_bytes()).await?;
        // Close stdin so sendmail sees EOF before we wait on it
        stdin.shutdown().await?;
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("sendmail exited with {status}"),
        ));
    }
    Ok(())
}
