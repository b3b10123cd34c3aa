//! Host network lifecycle events.
//!
//! Field names follow the host's camelCase payloads so recorded sessions
//! deserialize without translation.

use crate::request::HttpHeader;
use crate::store::CaptureStore;
use bidlens_core::{RequestId, TabId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw request body as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRequestBody {
    /// Raw upload chunks, in order
    #[serde(default)]
    pub raw: Option<Vec<UploadData>>,
    /// Form-encoded fields, name to values
    #[serde(default)]
    pub form_data: Option<BTreeMap<String, Vec<String>>>,
    /// Host-side failure to obtain the body
    #[serde(default)]
    pub error: Option<String>,
}

impl HostRequestBody {
    /// Body made of a single raw chunk.
    #[must_use]
    pub fn raw_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: Some(vec![UploadData {
                bytes: Some(bytes.into()),
                file: None,
            }]),
            ..Self::default()
        }
    }

    /// Body made of form fields.
    #[must_use]
    pub fn form(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            form_data: Some(fields),
            ..Self::default()
        }
    }
}

/// One element of a raw upload body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadData {
    /// Chunk bytes
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
    /// Path of an uploaded file (contents are never available)
    #[serde(default)]
    pub file: Option<String>,
}

/// Fired when a request is about to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStarted {
    /// Host request id
    pub request_id: RequestId,
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Host resource type (`xmlhttprequest`, `script`, `image`, ...)
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub time_stamp: f64,
    /// Initiating tab
    pub tab_id: TabId,
    /// Request headers in send order
    #[serde(default)]
    pub request_headers: Vec<HttpHeader>,
    /// Request body, when the host exposes one
    #[serde(default)]
    pub request_body: Option<HostRequestBody>,
}

impl RequestStarted {
    /// Minimal request-start event.
    #[must_use]
    pub fn new(
        request_id: impl Into<RequestId>,
        url: impl Into<String>,
        method: impl Into<String>,
        tab_id: TabId,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            method: method.into(),
            resource_type: "xmlhttprequest".to_string(),
            time_stamp: 0.0,
            tab_id,
            request_headers: Vec::new(),
            request_body: None,
        }
    }

    /// Set the event time.
    #[must_use]
    pub fn at(mut self, time_stamp: f64) -> Self {
        self.time_stamp = time_stamp;
        self
    }

    /// Attach a request body.
    #[must_use]
    pub fn with_body(mut self, body: HostRequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Attach request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<HttpHeader>) -> Self {
        self.request_headers = headers;
        self
    }
}

/// Fired when the first byte of the response arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStarted {
    /// Host request id
    pub request_id: RequestId,
    /// HTTP status code
    pub status_code: u16,
    /// HTTP status line
    #[serde(default)]
    pub status_line: String,
    /// Response headers
    #[serde(default)]
    pub response_headers: Option<Vec<HttpHeader>>,
    /// Initiating tab
    #[serde(default)]
    pub tab_id: Option<TabId>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub time_stamp: f64,
}

impl ResponseStarted {
    /// Response-started event with a status and no headers.
    #[must_use]
    pub fn new(request_id: impl Into<RequestId>, status_code: u16, status_line: &str) -> Self {
        Self {
            request_id: request_id.into(),
            status_code,
            status_line: status_line.to_string(),
            response_headers: None,
            tab_id: None,
            time_stamp: 0.0,
        }
    }

    /// Attach response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<HttpHeader>) -> Self {
        self.response_headers = Some(headers);
        self
    }
}

/// Fired when a request completes successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completed {
    /// Host request id
    pub request_id: RequestId,
    /// HTTP status code, when the host reports one
    #[serde(default)]
    pub status_code: Option<u16>,
    /// HTTP status line, when the host reports one
    #[serde(default)]
    pub status_line: Option<String>,
    /// Initiating tab
    #[serde(default)]
    pub tab_id: Option<TabId>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub time_stamp: f64,
}

impl Completed {
    /// Completion event without status information.
    #[must_use]
    pub fn new(request_id: impl Into<RequestId>) -> Self {
        Self {
            request_id: request_id.into(),
            status_code: None,
            status_line: None,
            tab_id: None,
            time_stamp: 0.0,
        }
    }

    /// Completion event carrying a status.
    #[must_use]
    pub fn with_status(mut self, status_code: u16, status_line: &str) -> Self {
        self.status_code = Some(status_code);
        self.status_line = Some(status_line.to_string());
        self
    }
}

/// Fired when a request fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOccurred {
    /// Host request id
    pub request_id: RequestId,
    /// Host error description, e.g. `net::ERR_BLOCKED_BY_CLIENT`
    pub error: String,
    /// Initiating tab
    #[serde(default)]
    pub tab_id: Option<TabId>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub time_stamp: f64,
}

impl ErrorOccurred {
    /// Error event.
    #[must_use]
    pub fn new(request_id: impl Into<RequestId>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            error: error.into(),
            tab_id: None,
            time_stamp: 0.0,
        }
    }
}

/// Any of the four lifecycle events, as recorded in replay sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// See [`RequestStarted`]
    RequestStarted(RequestStarted),
    /// See [`ResponseStarted`]
    ResponseStarted(ResponseStarted),
    /// See [`Completed`]
    Completed(Completed),
    /// See [`ErrorOccurred`]
    ErrorOccurred(ErrorOccurred),
}

impl LifecycleEvent {
    /// Request id the event refers to.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::RequestStarted(e) => &e.request_id,
            Self::ResponseStarted(e) => &e.request_id,
            Self::Completed(e) => &e.request_id,
            Self::ErrorOccurred(e) => &e.request_id,
        }
    }

    /// Dispatch the event to the matching store callback.
    pub fn apply_to<S: CaptureStore + ?Sized>(self, store: &S) {
        match self {
            Self::RequestStarted(e) => store.on_request_start(e),
            Self::ResponseStarted(e) => store.on_response_started(e),
            Self::Completed(e) => store.on_completed(e),
            Self::ErrorOccurred(e) => store.on_error_occurred(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_host_payload() {
        let json = r#"{
            "requestId": "9812",
            "url": "https://c.amazon-adsystem.com/e/dtb/bid",
            "method": "POST",
            "type": "xmlhttprequest",
            "timeStamp": 1700000000000.5,
            "tabId": 4,
            "requestBody": {"raw": [{"bytes": [123, 125]}]}
        }"#;

        let event: RequestStarted = serde_json::from_str(json).expect("parse request start");
        assert_eq!(event.request_id.as_str(), "9812");
        assert_eq!(event.resource_type, "xmlhttprequest");
        assert_eq!(event.tab_id, TabId::new(4));
        assert!(event.request_headers.is_empty());
        let body = event.request_body.expect("body present");
        assert_eq!(body.raw.expect("raw chunks")[0].bytes, Some(vec![123, 125]));
    }

    #[test]
    fn test_tagged_lifecycle_event() {
        let json = r#"{"event": "errorOccurred", "requestId": "7", "error": "net::ERR_FAILED"}"#;
        let event: LifecycleEvent = serde_json::from_str(json).expect("parse tagged event");
        assert_eq!(event.request_id().as_str(), "7");
        assert!(matches!(event, LifecycleEvent::ErrorOccurred(ref e) if e.error == "net::ERR_FAILED"));
    }

    #[test]
    fn test_completed_without_status() {
        let event: Completed =
            serde_json::from_str(r#"{"requestId": "3"}"#).expect("parse completion");
        assert!(event.status_code.is_none());
        assert!(event.status_line.is_none());
    }
}
