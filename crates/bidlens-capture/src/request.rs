//! The captured request record.

use crate::event::{HostRequestBody, RequestStarted};
use bidlens_core::{RequestId, TabId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single HTTP header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    /// Header name
    pub name: String,
    /// Header value (empty when the host only provides binary data)
    #[serde(default)]
    pub value: String,
}

impl HttpHeader {
    /// Create a header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request body decoded at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    /// UTF-8 text of the concatenated raw upload chunks
    Raw {
        /// Decoded text
        text: String,
    },
    /// Form-encoded fields
    FormData {
        /// Field name to values
        fields: BTreeMap<String, Vec<String>>,
    },
    /// The body could not be decoded; the diagnostic replaces the content
    DecodeError {
        /// Human-readable diagnostic
        message: String,
    },
}

impl RequestBody {
    /// Decode a host body. Never fails: undecodable content becomes
    /// [`RequestBody::DecodeError`].
    ///
    /// Returns `None` when the host body carries no content at all.
    #[must_use]
    pub fn decode(host: &HostRequestBody) -> Option<Self> {
        if let Some(error) = &host.error {
            return Some(Self::DecodeError {
                message: format!("Error decoding body: {error}"),
            });
        }

        if let Some(chunks) = &host.raw {
            let mut bytes = Vec::new();
            let mut any = false;
            for chunk in chunks {
                if let Some(data) = &chunk.bytes {
                    bytes.extend_from_slice(data);
                    any = true;
                }
            }
            if !any {
                return None;
            }
            return Some(match String::from_utf8(bytes) {
                Ok(text) => Self::Raw { text },
                Err(e) => {
                    tracing::warn!("Failed to decode request body: {}", e);
                    Self::DecodeError {
                        message: format!("Error decoding body: {e}"),
                    }
                }
            });
        }

        host.form_data
            .as_ref()
            .map(|fields| Self::FormData {
                fields: fields.clone(),
            })
    }

    /// Raw text, when the body was decoded successfully as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Raw { text } => Some(text),
            _ => None,
        }
    }
}

/// One observed network request.
///
/// Identity fields are fixed at creation; response fields fill in as the
/// host reports progress. Once `completed` is set the record is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    /// Host request id
    pub id: RequestId,
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Host resource type
    pub resource_type: String,
    /// Initiating tab
    pub tab_id: TabId,
    /// Time the request was sent
    pub timestamp: Timestamp,
    /// Request headers in send order
    pub request_headers: Vec<HttpHeader>,
    /// Decoded request body
    pub request_body: Option<RequestBody>,
    /// Response headers, once the response started
    pub response_headers: Option<Vec<HttpHeader>>,
    /// HTTP status code
    pub status_code: Option<u16>,
    /// HTTP status line
    pub status_line: Option<String>,
    /// Whether the request completed or failed
    pub completed: bool,
    /// Host-reported error
    pub error: Option<String>,
}

impl CapturedRequest {
    /// Build the initial record for a request-start event.
    #[must_use]
    pub fn from_start(event: RequestStarted) -> Self {
        let request_body = event.request_body.as_ref().and_then(RequestBody::decode);
        Self {
            id: event.request_id,
            url: event.url,
            method: event.method,
            resource_type: event.resource_type,
            tab_id: event.tab_id,
            timestamp: Timestamp::from_epoch_millis(event.time_stamp),
            request_headers: event.request_headers,
            request_body,
            response_headers: None,
            status_code: None,
            status_line: None,
            completed: false,
            error: None,
        }
    }

    /// Neither completion nor error has been observed.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        !self.completed
    }

    /// Short status for listings: the error, the status code, or `Pending`.
    #[must_use]
    pub fn status_text(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(error), _) => format!("ERROR: {error}"),
            (None, Some(code)) => code.to_string(),
            (None, None) => "Pending".to_string(),
        }
    }

    /// Whether the method is POST (case-insensitive).
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }
}
