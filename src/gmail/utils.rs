//! Gmail utility functions
//!
//! Header lookup, reply message construction and raw message encoding.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{DraftMailError, MailError, Result};
use crate::gmail::types::{Message, MessagePart};

/// Prefix prepended to the subject of every reply
pub const REPLY_PREFIX: &str = "Re: ";

/// Find header value by name (case-insensitive, first match wins)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Look up a header that must be present on `message`
pub fn require_header<'a>(message: &'a Message, name: &str) -> Result<&'a str> {
    message
        .payload
        .as_ref()
        .and_then(|p| find_header(p, name))
        .ok_or_else(|| {
            DraftMailError::Mail(MailError::HeaderMissing {
                message_id: message.id.clone(),
                header: name.to_string(),
            })
        })
}

/// Subject line for a reply. The prefix is always added, even when the
/// original subject already carries one.
pub fn reply_subject(subject: &str) -> String {
    format!("{}{}", REPLY_PREFIX, subject)
}

/// Bytes of UTF-8 carried by one encoded word. Encodes to 52 base64
/// characters, so the word stays within 75 characters and a `Subject:` line
/// stays within 76.
const ENCODED_WORD_BYTES: usize = 39;

/// Encode text for MIME header (RFC 2047)
///
/// Long values are split into several encoded words on character
/// boundaries, separated by folding whitespace.
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if i + c.len_utf8() - start > ENCODED_WORD_BYTES {
            words.push(&text[start..i]);
            start = i;
        }
    }
    words.push(&text[start..]);

    words
        .into_iter()
        .map(|word| format!("=?UTF-8?B?{}?=", STANDARD.encode(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Encode an address header value such as `Jörg Müller <jm@example.de>`.
///
/// Only the display name is encoded; the angle-addr must stay readable.
pub fn encode_address_header(value: &str) -> String {
    let value = value.replace(['\r', '\n'], " ");

    match (value.rfind('<'), value.ends_with('>')) {
        (Some(start), true) => {
            let name = value[..start].trim().trim_matches('"');
            let addr = &value[start..];
            if name.is_empty() {
                addr.to_string()
            } else if name.is_ascii() {
                format!("{} {}", value[..start].trim(), addr)
            } else {
                format!("{} {}", encode_mime_header(name), addr)
            }
        }
        _ => value.trim().to_string(),
    }
}

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Parameters for a plain-text reply
#[derive(Debug, Clone)]
pub struct ReplyParams {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub in_reply_to: String,
}

/// Build the RFC 822 text of a plain-text reply
pub fn create_reply_message(params: &ReplyParams) -> String {
    let transfer_encoding = if params.body.is_ascii() { "7bit" } else { "8bit" };
    let in_reply_to = params.in_reply_to.replace(['\r', '\n'], "");

    let lines = vec![
        "From: me".to_string(),
        format!("To: {}", encode_address_header(&params.to)),
        format!("Subject: {}", encode_mime_header(&params.subject)),
        format!("In-Reply-To: {}", in_reply_to),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=UTF-8".to_string(),
        format!("Content-Transfer-Encoding: {}", transfer_encoding),
        String::new(),
        params.body.clone(),
    ];

    lines.join("\r\n")
}
