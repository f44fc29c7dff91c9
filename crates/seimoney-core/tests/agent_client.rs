use pretty_assertions::assert_eq;
use seimoney_core::{
    AgentBackend, AgentClient, AgentError, AgentRequest, Attachment, AttachmentError,
    Conversation, NoticeKind, SendError, SendOutcome, ThreadId, WalletAddress, WalletSession,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDR: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

fn thread_id() -> ThreadId {
    ThreadId::from(&WalletAddress::parse(ADDR).unwrap())
}

async fn agent_replying(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

async fn received_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    String::from_utf8_lossy(&requests[0].body).into_owned()
}

#[tokio::test]
async fn sends_all_multipart_fields() {
    let server = agent_replying(
        ResponseTemplate::new(200).set_body_raw("<p>hello</p>", "text/html; charset=utf-8"),
    )
    .await;

    let session = WalletSession::connected(WalletAddress::parse(ADDR).unwrap());
    let request = AgentRequest::new(session.thread_id().unwrap(), "create a payment link")
        .with_payload(session.payload().unwrap().to_json())
        .with_file(Some(Attachment::new(
            "invoice.pdf",
            "application/pdf",
            b"%PDF-1.4 fake".to_vec(),
        )));

    let client = AgentClient::new(&server.uri());
    let reply = client.send(request).await.unwrap();
    assert_eq!(reply, "<p>hello</p>");

    let requests = server.received_requests().await.unwrap_or_default();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"), "{}", content_type);

    let body = received_body(&server).await;
    assert!(body.contains(r#"name="threadId""#));
    assert!(body.contains(ADDR));
    assert!(body.contains(r#"name="input""#));
    assert!(body.contains("create a payment link"));
    assert!(body.contains(r#"name="payload""#));
    assert!(body.contains("This is the wallet address of the connected user"));
    assert!(body.contains(r#"name="file"; filename="invoice.pdf""#));
    assert!(body.contains("%PDF-1.4 fake"));
}

#[tokio::test]
async fn omits_optional_fields() {
    let server = agent_replying(ResponseTemplate::new(200).set_body_string("ok")).await;

    let client = AgentClient::new(&server.uri());
    client.send(AgentRequest::new(thread_id(), "hi")).await.unwrap();

    let body = received_body(&server).await;
    assert!(body.contains(r#"name="threadId""#));
    assert!(!body.contains(r#"name="payload""#));
    assert!(!body.contains(r#"name="file""#));
}

#[tokio::test]
async fn json_body_is_stringified() {
    let server = agent_replying(
        ResponseTemplate::new(200).set_body_json(json!({ "reply": "done", "ok": true })),
    )
    .await;

    let client = AgentClient::new(&server.uri());
    let reply = client.send(AgentRequest::new(thread_id(), "hi")).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(value, json!({ "reply": "done", "ok": true }));
}

#[tokio::test]
async fn non_200_is_a_status_error() {
    let server = agent_replying(ResponseTemplate::new(503).set_body_string("overloaded")).await;

    let client = AgentClient::new(&server.uri());
    let err = client.send(AgentRequest::new(thread_id(), "hi")).await.unwrap_err();

    match err {
        AgentError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn other_success_codes_are_errors_too() {
    let server = agent_replying(ResponseTemplate::new(201).set_body_string("created")).await;

    let client = AgentClient::new(&server.uri());
    let err = client.send(AgentRequest::new(thread_id(), "hi")).await.unwrap_err();
    assert!(matches!(err, AgentError::Status { status: 201, .. }));
}

#[tokio::test]
async fn unreachable_agent_is_a_transport_error() {
    let client = AgentClient::new("http://127.0.0.1:1");
    let err = client.send(AgentRequest::new(thread_id(), "hi")).await.unwrap_err();
    assert!(matches!(err, AgentError::Transport(_)));
}

#[tokio::test]
async fn conversation_round_trip_sets_preview() {
    let server = agent_replying(ResponseTemplate::new(200).set_body_raw(
        r#"<p>Your link is <a href="https://seimoney.link/pay/0xabc">here</a>: https://seimoney.link/pay/0xabc</p>"#,
        "text/html",
    ))
    .await;

    let conversation = Conversation::new(AgentClient::new(&server.uri()));
    let outcome = conversation
        .send_message(AgentRequest::new(thread_id(), "make me a link"))
        .await
        .unwrap();

    assert_eq!(outcome, SendOutcome::Replied { preview_updated: true });
    assert_eq!(conversation.preview().as_deref(), Some("https://seimoney.link/pay/0xabc"));
    assert_eq!(conversation.messages().len(), 2);
    assert!(!conversation.is_thinking());
}

#[tokio::test]
async fn conversation_surfaces_server_failure() {
    let server = agent_replying(ResponseTemplate::new(500)).await;

    let conversation = Conversation::new(AgentClient::new(&server.uri()));
    let err = conversation
        .send_message(AgentRequest::new(thread_id(), "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, SendError::Agent(AgentError::Status { status: 500, .. })));
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(conversation.notice().map(|n| n.kind), Some(NoticeKind::Status));
    assert!(!conversation.is_thinking());
}

#[tokio::test]
async fn attachment_reads_file_and_guesses_mime() {
    let dir = tempfile::TempDir::new().unwrap();
    let file_path = dir.path().join("receipt.pdf");
    std::fs::write(&file_path, b"pdf bytes").unwrap();

    let attachment = Attachment::from_path(&file_path).await.unwrap();
    assert_eq!(attachment.file_name, "receipt.pdf");
    assert_eq!(attachment.mime, "application/pdf");
    assert_eq!(attachment.bytes, b"pdf bytes".to_vec());
}

#[tokio::test]
async fn attachment_rejects_directories_and_missing_files() {
    let dir = tempfile::TempDir::new().unwrap();

    let err = Attachment::from_path(dir.path()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::NotAFile(_)));

    let err = Attachment::from_path(&dir.path().join("missing.txt")).await.unwrap_err();
    assert!(matches!(err, AttachmentError::Read { .. }));
}
