//! Gmail client tests against a mock HTTP server.
//!
//! Uses [`wiremock`] to stand in for the Gmail REST API, so the full request
//! and response path runs without network access or real credentials.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::decode_raw;
use draft_email_mcp::error::{DraftMailError, ErrorKind, MailError, Result};
use draft_email_mcp::gmail::auth::{Session, SessionSource, StaticSession};
use draft_email_mcp::gmail::client::{GmailClient, MailProvider};
use draft_email_mcp::gmail::mailbox::Mailbox;

/// Hands out `token-1`, `token-2`, ... on successive acquisitions
#[derive(Default)]
struct CountingSource {
    acquired: AtomicUsize,
    invalidated: AtomicUsize,
}

#[async_trait]
impl SessionSource for CountingSource {
    async fn acquire(&self) -> Result<Session> {
        let n = self.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session::new(format!("token-{}", n), None))
    }

    async fn invalidate(&self) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
    }
}

async fn client_for(server: &MockServer) -> GmailClient {
    let source = Arc::new(StaticSession(Session::new("test-token", None)));
    GmailClient::connect_to(&server.uri(), source).await.unwrap()
}

fn message_json(id: &str, subject: Option<&str>) -> serde_json::Value {
    let mut headers = vec![json!({"name": "From", "value": "Alice <alice@example.com>"})];
    if let Some(subject) = subject {
        headers.push(json!({"name": "Subject", "value": subject}));
    }
    json!({
        "id": id,
        "threadId": format!("thread-{}", id),
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": "See you there",
        "internalDate": "1700000000000",
        "payload": {"mimeType": "text/plain", "headers": headers}
    })
}

#[tokio::test]
async fn get_message_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/abc"))
        .and(query_param("format", "metadata"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("abc", Some("Lunch"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let message = client.get_message("abc").await.unwrap();

    assert_eq!(message.id, "abc");
    assert_eq!(message.thread_id.as_deref(), Some("thread-abc"));
    assert_eq!(message.payload.unwrap().headers.len(), 2);
}

#[tokio::test]
async fn get_message_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_message("missing").await.unwrap_err();

    assert!(matches!(
        err,
        DraftMailError::Mail(MailError::MessageNotFound { ref message_id }) if message_id == "missing"
    ));
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[tokio::test]
async fn list_messages_filters_by_inbox_and_unread() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .and(query_param("labelIds", "INBOX"))
        .and(query_param("labelIds", "UNREAD"))
        .and(query_param("maxResults", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "m1", "threadId": "t1"},
                {"id": "m2", "threadId": "t2"}
            ],
            "resultSizeEstimate": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let refs = client.list_messages(&["INBOX", "UNREAD"], 3).await.unwrap();

    let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2"]);
}

#[tokio::test]
async fn list_messages_with_no_matches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.list_messages(&["INBOX", "UNREAD"], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_messages_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_messages(&["INBOX"], 5).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("backend error"));
}

#[tokio::test]
async fn create_draft_posts_raw_message_in_thread() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users/me/drafts"))
        .and(body_partial_json(json!({"message": {"raw": "UmF3", "threadId": "t9"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r-123",
            "message": {"id": "m-456", "threadId": "t9", "labelIds": ["DRAFT"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let draft = client
        .create_draft("UmF3".to_string(), Some("t9".to_string()))
        .await
        .unwrap();

    assert_eq!(draft.id, "r-123");
    assert_eq!(draft.message.id, "m-456");
}

#[tokio::test]
async fn rejected_session_is_reacquired_on_next_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/abc"))
        .and(header("Authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/abc"))
        .and(header("Authorization", "Bearer token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("abc", Some("Hi"))))
        .expect(1)
        .mount(&server)
        .await;

    let source = Arc::new(CountingSource::default());
    let client = GmailClient::connect_to(&server.uri(), source.clone())
        .await
        .unwrap();

    let err = client.get_message("abc").await.unwrap_err();
    assert!(matches!(err, DraftMailError::Mail(MailError::Unauthorized { status: 401 })));
    assert_eq!(source.invalidated.load(Ordering::SeqCst), 1);

    // No automatic retry; the next call picks up a fresh session
    let message = client.get_message("abc").await.unwrap();
    assert_eq!(message.id, "abc");
    assert_eq!(source.acquired.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn mailbox_end_to_end_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "good", "threadId": "thread-good"},
                {"id": "nosubject", "threadId": "thread-nosubject"},
                {"id": "gone", "threadId": "thread-gone"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("good", Some("Lunch"))))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/nosubject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("nosubject", None)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me/messages/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/me/drafts"))
        .and(body_partial_json(json!({"message": {"threadId": "thread-good"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "draft-1",
            "message": {"id": "m-1", "threadId": "thread-good"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mailbox = Mailbox::new(Arc::new(client_for(&server).await));

    let unread = mailbox.list_unread(5).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, "good");
    assert_eq!(unread[0].sender, "Alice <alice@example.com>");

    let draft = mailbox.create_draft_reply("good", "Sure").await.unwrap();
    assert_eq!(draft.draft_id, "draft-1");
    assert_eq!(draft.thread_id, "thread-good");
    assert_eq!(draft.to, "Alice <alice@example.com>");
    assert_eq!(draft.subject, "Re: Lunch");

    let requests = server.received_requests().await.unwrap();
    let draft_request = requests
        .iter()
        .find(|r| r.url.path() == "/users/me/drafts")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&draft_request.body).unwrap();
    let raw = decode_raw(body["message"]["raw"].as_str().unwrap());
    assert!(raw.contains("Subject: Re: Lunch\r\n"));
    assert!(raw.contains("In-Reply-To: good\r\n"));
}
