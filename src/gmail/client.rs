//! Gmail API client
//!
//! [`MailProvider`] is the narrow surface the rest of the crate needs from the
//! mail provider; [`GmailClient`] implements it over the Gmail REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tokio::sync::RwLock;

use crate::config::gmail::USER_ID;
use crate::error::{DraftMailError, MailError, Result};
use crate::gmail::auth::{Session, SessionSource};
use crate::gmail::types::*;

/// Remote mail provider operations
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Get a single message with its `Subject` and `From` headers
    async fn get_message(&self, message_id: &str) -> Result<Message>;

    /// List messages carrying all of `label_ids`, newest first
    async fn list_messages(&self, label_ids: &[&str], max_results: u32) -> Result<Vec<MessageRef>>;

    /// Store a base64url-encoded RFC 822 message as a draft
    async fn create_draft(&self, raw: String, thread_id: Option<String>) -> Result<Draft>;
}

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// API base URL, without trailing slash
    base_url: String,

    /// Where sessions come from
    source: Arc<dyn SessionSource>,

    /// Current session; replaced wholesale on re-acquisition
    session: RwLock<Option<Arc<Session>>>,
}

impl GmailClient {
    /// Create a client against `base_url` and acquire a session
    pub async fn connect_to(base_url: &str, source: Arc<dyn SessionSource>) -> Result<Self> {
        let session = source.acquire().await?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            source,
            session: RwLock::new(Some(Arc::new(session))),
        })
    }

    /// Current session, re-acquired if it was dropped or has expired
    async fn session(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.session.read().await.as_ref() {
            if !session.is_expired() {
                return Ok(session.clone());
            }
        }

        tracing::debug!("Acquiring a new mail session");
        let fresh = Arc::new(self.source.acquire().await?);
        *self.session.write().await = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the current session after the provider rejected it
    async fn discard_session(&self) {
        *self.session.write().await = None;
        self.source.invalidate().await;
    }

    /// Base URL for messages
    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.base_url, USER_ID)
    }

    /// Base URL for drafts
    fn drafts_url(&self) -> String {
        format!("{}/users/{}/drafts", self.base_url, USER_ID)
    }

    /// Turn a non-success response into an error
    async fn failure(&self, response: Response, action: &str) -> DraftMailError {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Mail session rejected while trying to {}", action);
            self.discard_session().await;
            return DraftMailError::Mail(MailError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let text = response.text().await.unwrap_or_default();
        DraftMailError::Mail(MailError::RequestFailed {
            message: format!("Failed to {} ({}): {}", action, status, text),
        })
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn get_message(&self, message_id: &str) -> Result<Message> {
        let session = self.session().await?;
        let url = format!(
            "{}/{}?format=metadata&metadataHeaders=Subject&metadataHeaders=From",
            self.messages_url(),
            urlencoding::encode(message_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(session.access_token())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status() == StatusCode::NOT_FOUND {
            Err(DraftMailError::Mail(MailError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            Err(self.failure(response, "get message").await)
        }
    }

    async fn list_messages(&self, label_ids: &[&str], max_results: u32) -> Result<Vec<MessageRef>> {
        let session = self.session().await?;

        let mut query: Vec<(&str, String)> = label_ids
            .iter()
            .map(|label| ("labelIds", label.to_string()))
            .collect();
        query.push(("maxResults", max_results.to_string()));

        let response = self
            .http_client
            .get(self.messages_url())
            .query(&query)
            .bearer_auth(session.access_token())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure(response, "list messages").await);
        }

        let message_list: MessageList = response.json().await?;
        Ok(message_list.messages)
    }

    async fn create_draft(&self, raw: String, thread_id: Option<String>) -> Result<Draft> {
        let session = self.session().await?;

        let request = CreateDraftRequest {
            message: SendMessageRequest { raw, thread_id },
        };

        let response = self
            .http_client
            .post(self.drafts_url())
            .bearer_auth(session.access_token())
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.failure(response, "create draft").await)
        }
    }
}
