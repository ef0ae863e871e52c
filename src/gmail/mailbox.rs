//! Mail operations exposed to the tool gateway
//!
//! [`Mailbox`] turns raw provider messages into [`EmailSummary`] values and
//! composes draft replies. All provider access goes through [`MailProvider`].

use std::sync::Arc;

use crate::config::gmail::labels;
use crate::error::{DraftMailError, MailError, Result};
use crate::gmail::client::MailProvider;
use crate::gmail::types::{DraftResult, EmailSummary, Message};
use crate::gmail::utils::{
    create_reply_message, encode_raw_message, reply_subject, require_header, ReplyParams,
};

/// Number of unread emails returned when the caller gives no limit
pub const DEFAULT_UNREAD_LIMIT: u32 = 5;

/// Mail client adapter
pub struct Mailbox {
    provider: Arc<dyn MailProvider>,
}

impl Mailbox {
    pub fn new(provider: Arc<dyn MailProvider>) -> Self {
        Self { provider }
    }

    /// Fetch one email and normalize it.
    ///
    /// Fails with `HeaderMissing` when `Subject` or `From` is absent.
    pub async fn fetch_email(&self, email_id: &str) -> Result<EmailSummary> {
        let message = self.provider.get_message(email_id).await?;
        summarize(email_id, &message)
    }

    /// Unread emails in the inbox, in provider order.
    ///
    /// Emails that cannot be fetched or lack required headers are left out.
    pub async fn list_unread(&self, limit: u32) -> Result<Vec<EmailSummary>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let refs = self
            .provider
            .list_messages(&[labels::INBOX, labels::UNREAD], limit)
            .await?;

        let mut emails = Vec::with_capacity(refs.len());
        for message_ref in refs.iter().take(limit as usize) {
            match self.fetch_email(&message_ref.id).await {
                Ok(email) => emails.push(email),
                Err(e) => {
                    tracing::warn!("Skipping unread email {}: {}", message_ref.id, e);
                }
            }
        }

        tracing::debug!("Resolved {} of {} unread emails", emails.len(), refs.len());
        Ok(emails)
    }

    /// Create a draft reply to `email_id` in the original thread
    pub async fn create_draft_reply(&self, email_id: &str, reply_body: &str) -> Result<DraftResult> {
        let original = self.fetch_email(email_id).await?;

        let params = ReplyParams {
            to: original.sender.clone(),
            subject: reply_subject(&original.subject),
            body: reply_body.to_string(),
            in_reply_to: email_id.to_string(),
        };
        let raw = encode_raw_message(&create_reply_message(&params));

        let draft = self
            .provider
            .create_draft(raw, Some(original.thread_id.clone()))
            .await
            .map_err(|e| {
                tracing::error!("Draft reply to {} failed: {}", email_id, e);
                e
            })?;

        tracing::info!("Created draft {} in thread {}", draft.id, original.thread_id);

        Ok(DraftResult {
            message: serde_json::to_string(&draft.message)?,
            draft_id: draft.id,
            thread_id: original.thread_id,
            to: params.to,
            subject: params.subject,
        })
    }
}

/// Build a summary from a provider message
fn summarize(email_id: &str, message: &Message) -> Result<EmailSummary> {
    let subject = require_header(message, "Subject")?.to_string();
    let sender = require_header(message, "From")?.to_string();

    let thread_id = message.thread_id.clone().ok_or_else(|| {
        DraftMailError::Mail(MailError::RequestFailed {
            message: format!("Message {} has no thread id", email_id),
        })
    })?;

    Ok(EmailSummary {
        id: email_id.to_string(),
        sender,
        subject,
        thread_id,
        timestamp: message.internal_date.clone().unwrap_or_default(),
        snippet: message.snippet.clone().unwrap_or_default(),
    })
}
