//! Tool invocation gateway
//!
//! Validates an invocation against the tool registry, runs it against the
//! [`Mailbox`] and formats the outcome as a text envelope.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::gmail::mailbox::{Mailbox, DEFAULT_UNREAD_LIMIT};
use crate::mcp::tools::{self, CreateDraftReplyArgs, GetUnreadEmailsArgs, ToolRequest};
use crate::mcp::types::{CallToolResult, Tool};

/// Marks a successful mail operation in the response text
pub const SUCCESS_MARK: &str = "✓";

/// Fixed reply of `hello_world`
pub const GREETING: &str = "Hello, World!";

/// The uniform result envelope for every tool
pub type ToolResponse = CallToolResult;

/// A tool call as received from the transport
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Stateless dispatcher from tool calls to mail operations
pub struct ToolGateway {
    mailbox: Arc<Mailbox>,
}

impl ToolGateway {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    /// All available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        tools::list_tools()
    }

    /// Validate and run one invocation
    pub async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolResponse> {
        let request = ToolRequest::parse(&invocation.name, invocation.arguments)?;
        tracing::debug!("Dispatching tool {}", request.tool_name());

        match request {
            ToolRequest::HelloWorld => Ok(CallToolResult::text(GREETING)),
            ToolRequest::GetUnreadEmails(args) => self.get_unread_emails(args).await,
            ToolRequest::CreateDraftReply(args) => self.create_draft_reply(args).await,
        }
    }

    /// Like [`invoke`](Self::invoke), but failures become an error envelope
    /// instead of an `Err`
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.invoke(ToolInvocation::new(name, arguments)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), "Tool {} failed: {}", name, e);
                CallToolResult::error(e.to_string())
            }
        }
    }

    async fn get_unread_emails(&self, args: GetUnreadEmailsArgs) -> Result<ToolResponse> {
        let limit = args.limit.unwrap_or(DEFAULT_UNREAD_LIMIT);
        let emails = self.mailbox.list_unread(limit).await?;

        if emails.is_empty() {
            return Ok(CallToolResult::text(format!(
                "{} No unread emails found",
                SUCCESS_MARK
            )));
        }

        let email_texts = serde_json::to_string(&emails)?;
        Ok(CallToolResult::text(format!(
            "{} Here are your unread emails:\n\n{}",
            SUCCESS_MARK, email_texts
        )))
    }

    async fn create_draft_reply(&self, args: CreateDraftReplyArgs) -> Result<ToolResponse> {
        let draft = self
            .mailbox
            .create_draft_reply(&args.email_id, &args.reply_body)
            .await?;

        Ok(CallToolResult::text(format!(
            "{} Draft reply created:\nDraft id: {}\nDraft message: {}",
            SUCCESS_MARK, draft.draft_id, draft.message
        )))
    }
}
