//! HTTP client for the SeiMoney agent endpoint.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::{AgentError, AttachmentError};
use crate::wallet::ThreadId;

/// Path of the chat endpoint, relative to the configured API base URL
pub const CHAT_PATH: &str = "agent/chat";

/// A file picked by the user, read fully into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read `path` once. The MIME type is guessed from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let read_err = |source| AttachmentError::Read {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        if !metadata.is_file() {
            return Err(AttachmentError::NotAFile(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self::new(file_name, mime, bytes))
    }
}

/// One message to the agent. Consumed by the send.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub thread_id: ThreadId,
    pub input: String,
    /// Pre-serialized JSON
    pub payload: Option<String>,
    pub file: Option<Attachment>,
}

impl AgentRequest {
    pub fn new(thread_id: ThreadId, input: impl Into<String>) -> Self {
        Self {
            thread_id,
            input: input.into(),
            payload: None,
            file: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_file(mut self, file: Option<Attachment>) -> Self {
        self.file = file;
        self
    }
}

/// Anything that can answer an `AgentRequest`
#[async_trait]
pub trait AgentBackend: Send + Sync + 'static {
    async fn send(&self, request: AgentRequest) -> Result<String, AgentError>;
}

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, CHAT_PATH)
    }

    async fn post(&self, request: AgentRequest) -> Result<String, AgentError> {
        let url = self.endpoint();
        debug!(
            %url,
            thread_id = %request.thread_id,
            has_payload = request.payload.is_some(),
            has_file = request.file.is_some(),
            "sending message to agent"
        );

        let mut form = Form::new()
            .text("threadId", request.thread_id.to_string())
            .text("input", request.input);

        if let Some(payload) = request.payload {
            form = form.text("payload", payload);
        }

        if let Some(file) = request.file {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)
                .map_err(|e| {
                    AgentError::InvalidRequest(format!("attachment type {:?}: {}", file.mime, e))
                })?;
            form = form.part("file", part);
        }

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The status is the error; a body that fails to arrive doesn't change it
            let body = match response.bytes().await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    debug!(error = %e, "could not read error body");
                    String::new()
                }
            };
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = response.bytes().await?;

        body_to_text(&content_type, &bytes)
    }
}

#[async_trait]
impl AgentBackend for AgentClient {
    async fn send(&self, request: AgentRequest) -> Result<String, AgentError> {
        match self.post(request).await {
            Ok(text) => {
                info!(bytes = text.len(), "agent replied");
                Ok(text)
            }
            Err(err) => {
                error!(error = %err, "error communicating with agent");
                Err(err)
            }
        }
    }
}

/// Turn a 200 body into reply text. JSON strings are unwrapped, any other JSON
/// value is re-serialized.
fn body_to_text(content_type: &str, bytes: &[u8]) -> Result<String, AgentError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AgentError::MalformedBody(format!("body is not UTF-8: {}", e)))?;

    if !content_type.contains("json") {
        return Ok(text.to_string());
    }

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(value) => Ok(value.to_string()),
        Err(e) => Err(AgentError::MalformedBody(format!("invalid JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_body() {
        let text = body_to_text("text/html; charset=utf-8", b"<p>hello</p>").unwrap();
        assert_eq!(text, "<p>hello</p>");
    }

    #[test]
    fn test_json_string_body_is_unwrapped() {
        let text = body_to_text("application/json", br#""just a string""#).unwrap();
        assert_eq!(text, "just a string");
    }

    #[test]
    fn test_json_object_body_is_stringified() {
        let text = body_to_text("application/json", br#"{ "reply": "ok" }"#).unwrap();
        assert_eq!(text, r#"{"reply":"ok"}"#);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = body_to_text("application/json", b"{not json").unwrap_err();
        assert!(matches!(err, AgentError::MalformedBody(_)));
    }

    #[test]
    fn test_non_utf8_is_malformed() {
        let err = body_to_text("text/plain", &[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, AgentError::MalformedBody(_)));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = AgentClient::new("https://api.seimoney.link/");
        assert_eq!(client.endpoint(), "https://api.seimoney.link/agent/chat");
    }

    #[tokio::test]
    async fn test_bad_attachment_type_is_not_a_transport_error() {
        // Unroutable: the request must fail before anything is sent
        let client = AgentClient::new("http://127.0.0.1:1");
        let address = crate::wallet::WalletAddress::parse(
            "0x1111111111111111111111111111111111111111",
        )
        .unwrap();
        let request = AgentRequest::new(ThreadId::from(&address), "hi").with_file(Some(
            Attachment::new("a.bin", "not a mime type", b"x".to_vec()),
        ));

        let err = client.send(request).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)), "{err:?}");
    }
}
