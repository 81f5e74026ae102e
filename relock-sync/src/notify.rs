//! Operator notification over SMTP.
//!
//! Plain, unauthenticated SMTP to a relay the host already trusts, which
//! is how the updater's deployment environment delivers mail. Message
//! bodies are assembled by the `*_body` helpers so their wording is
//! testable without a transport.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use relock_core::Recipient;

/// SMTP line-length guard: RFC 5321 caps lines at 1000 characters, and
/// some relays reject anything close to it.
const MAX_LINE_LENGTH: usize = 950;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("no recipients to notify")]
    NoRecipients,
}

/// Delivery seam consumed by the orchestrator.
///
/// Failures are logged by the caller, never escalated.
pub trait Notifier {
    fn notify(
        &self,
        recipients: &[Recipient],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;
}

/// Production notifier: one SMTP message per call.
pub struct SmtpNotifier {
    pub host: String,
    pub port: u16,
    pub from: String,
}

impl Notifier for SmtpNotifier {
    fn notify(
        &self,
        recipients: &[Recipient],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .subject(subject);
        for recipient in recipients {
            builder = builder.to(Mailbox::new(
                Some(recipient.name.clone()),
                recipient.address.parse()?,
            ));
        }
        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(truncate_long_lines(body, MAX_LINE_LENGTH))?;

        let mailer = SmtpTransport::builder_dangerous(&self.host)
            .port(self.port)
            .build();
        mailer.send(&message)?;
        tracing::info!("ok / notification sent to {} recipient(s)", recipients.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message assembly
// ---------------------------------------------------------------------------

/// Subject line carrying the reporting host and the project.
pub fn subject_line(server_name: &str, project_name: &str) -> String {
    format!("relock info from ``{server_name}`` for project ``{project_name}``")
}

/// Body for fatal setup problems (preflight, initial test gate).
pub fn setup_problem_body(message: &str) -> String {
    format!(
        "There was a problem running the dependency auto-updater.\n\n\
         Message: ``{message}``\n\n\
         Suggestion: after fixing the problem, run relock manually once to \
         make sure there are no other environment issues.\n\n\
         (end-of-message)\n"
    )
}

/// Body for a completed update with no follow-up problems.
pub fn update_ok_body(project_name: &str, diff_text: &str) -> String {
    format!(
        "The environment for project ``{project_name}`` has been \
         auto-updated successfully.\n\n\
         The manifest diff:\n\n{diff_text}\n\n\
         (end-of-message)\n"
    )
}

/// Body for a run that changed something but hit follow-up problems
/// (rollback, static assets, post-update tests).
pub fn update_problem_body(project_name: &str, diff_text: &str, problems: &str) -> String {
    format!(
        "The dependency update for project ``{project_name}`` ran, but \
         there were problems which should be reviewed:\n\n\
         {problems}\n\n\
         The manifest diff:\n\n{diff_text}\n\n\
         (end-of-message)\n"
    )
}

/// Truncate any line longer than `max_length` characters.
///
/// Relays enforce RFC 5321 §4.5.3.1.6; an overlong diff line would
/// otherwise bounce the whole notification.
pub fn truncate_long_lines(message: &str, max_length: usize) -> String {
    message
        .lines()
        .map(|line| {
            if line.chars().count() > max_length {
                let truncated: String = line.chars().take(max_length).collect();
                format!("{truncated}... [truncated]")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lines_are_truncated() {
        let long = "x".repeat(1200);
        let message = format!("short\n{long}\nalso short");
        let out = truncate_long_lines(&message, 950);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "short");
        assert!(lines[1].ends_with("... [truncated]"));
        assert_eq!(lines[1].len(), 950 + "... [truncated]".len());
        assert_eq!(lines[2], "also short");
    }

    #[test]
    fn short_messages_pass_through_unchanged() {
        assert_eq!(truncate_long_lines("a\nb", 950), "a\nb");
    }

    #[test]
    fn update_problem_body_carries_problems_and_diff() {
        let body = update_problem_body("myapp", "-django==4.2.20\n+django==4.2.27", "tests failed");
        assert!(body.contains("myapp"));
        assert!(body.contains("tests failed"));
        assert!(body.contains("+django==4.2.27"));
    }

    #[test]
    fn subject_names_host_and_project() {
        let subject = subject_line("pweb2", "myapp");
        assert!(subject.contains("pweb2"));
        assert!(subject.contains("myapp"));
    }

    #[test]
    fn empty_recipient_list_is_rejected() {
        let notifier = SmtpNotifier {
            host: "localhost".to_string(),
            port: 25,
            from: "noreply@example.edu".to_string(),
        };
        let result = notifier.notify(&[], "s", "b");
        assert!(matches!(result, Err(NotifyError::NoRecipients)));
    }
}
