//! Shared test fixtures: an in-memory mail provider

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use draft_email_mcp::error::{DraftMailError, MailError, Result};
use draft_email_mcp::gmail::client::MailProvider;
use draft_email_mcp::gmail::mailbox::Mailbox;
use draft_email_mcp::gmail::types::{Draft, Header, Message, MessagePart, MessageRef};
use draft_email_mcp::mcp::gateway::ToolGateway;

/// Decode a base64url `raw` message as sent to the drafts endpoint
pub fn decode_raw(raw: &str) -> String {
    String::from_utf8(URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap()
}

/// A draft as the provider received it
#[derive(Debug, Clone)]
pub struct StoredDraft {
    pub raw: String,
    pub thread_id: Option<String>,
}

impl StoredDraft {
    /// Decoded RFC 822 text
    pub fn rfc822(&self) -> String {
        decode_raw(&self.raw)
    }

    /// Value of the first header called `name`
    pub fn header(&self, name: &str) -> Option<String> {
        let text = self.rfc822();
        let (head, _) = text.split_once("\r\n\r\n")?;
        head.split("\r\n").find_map(|line| {
            let (key, value) = line.split_once(": ")?;
            (key == name).then(|| value.to_string())
        })
    }
}

#[derive(Default)]
pub struct FakeProvider {
    messages: HashMap<String, Message>,
    unread: Vec<String>,
    pub fail_list: bool,
    pub fail_drafts: bool,
    pub drafts: Mutex<Vec<StoredDraft>>,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unread message with the given headers
    pub fn with_unread(mut self, id: &str, from: Option<&str>, subject: Option<&str>) -> Self {
        let mut headers = Vec::new();
        if let Some(from) = from {
            headers.push(Header::new("From", from));
        }
        if let Some(subject) = subject {
            headers.push(Header::new("Subject", subject));
        }

        self.messages.insert(
            id.to_string(),
            Message {
                id: id.to_string(),
                thread_id: Some(format!("thread-{}", id)),
                label_ids: vec!["INBOX".to_string(), "UNREAD".to_string()],
                snippet: Some(format!("snippet of {}", id)),
                payload: Some(MessagePart {
                    mime_type: Some("text/plain".to_string()),
                    headers,
                }),
                internal_date: Some("1700000000000".to_string()),
            },
        );
        self.unread.push(id.to_string());
        self
    }

    /// List an id as unread without a backing message
    pub fn with_dangling(mut self, id: &str) -> Self {
        self.unread.push(id.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stored_drafts(&self) -> Vec<StoredDraft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailProvider for FakeProvider {
    async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.get(message_id).cloned().ok_or_else(|| {
            DraftMailError::Mail(MailError::MessageNotFound {
                message_id: message_id.to_string(),
            })
        })
    }

    async fn list_messages(&self, label_ids: &[&str], max_results: u32) -> Result<Vec<MessageRef>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(label_ids, ["INBOX", "UNREAD"]);

        if self.fail_list {
            return Err(DraftMailError::Mail(MailError::RequestFailed {
                message: "quota exceeded".to_string(),
            }));
        }

        Ok(self
            .unread
            .iter()
            .take(max_results as usize)
            .map(|id| MessageRef {
                id: id.clone(),
                thread_id: format!("thread-{}", id),
            })
            .collect())
    }

    async fn create_draft(&self, raw: String, thread_id: Option<String>) -> Result<Draft> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_drafts {
            return Err(DraftMailError::Mail(MailError::RequestFailed {
                message: "draft rejected".to_string(),
            }));
        }

        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(StoredDraft {
            raw,
            thread_id: thread_id.clone(),
        });

        Ok(Draft {
            id: format!("draft-{}", drafts.len()),
            message: Message {
                id: format!("draft-msg-{}", drafts.len()),
                thread_id,
                label_ids: vec!["DRAFT".to_string()],
                snippet: None,
                payload: None,
                internal_date: None,
            },
        })
    }
}

pub fn gateway_for(provider: Arc<FakeProvider>) -> ToolGateway {
    ToolGateway::new(Arc::new(Mailbox::new(provider)))
}
