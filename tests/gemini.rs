// tests/gemini.rs

use securenexus::llm::gemini::{GeminiClient, DEFAULT_MODEL};
use securenexus::llm::{analyze_code, check_phishing, LlmError};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn reply(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

async fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key".into(), None).unwrap().with_endpoint(server.uri())
}

#[tokio::test]
async fn code_analysis_posts_the_code_in_the_prompt() {
    assert_eq!(DEFAULT_MODEL, "gemini-2.0-flash");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("  SQL injection via string concatenation.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let analysis = analyze_code(&client, "query(\"SELECT * FROM t WHERE id=\" + id)").await.unwrap();
    assert_eq!(analysis, "SQL injection via string concatenation.");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("SELECT * FROM t WHERE id="));
}

#[tokio::test]
async fn phishing_check_returns_the_model_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Likely phishing: urgent tone, spoofed link.")))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let verdict = check_phishing(&client, "Your account is locked, click http://bank.example.co now").await.unwrap();
    assert!(verdict.starts_with("Likely phishing"));
}

#[tokio::test]
async fn api_errors_keep_the_remote_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    match analyze_code(&client, "eval(input)").await {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.starts_with("API key not valid"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn blank_input_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    assert!(matches!(check_phishing(&client, "  \n").await, Err(LlmError::EmptyInput)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
