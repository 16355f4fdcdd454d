use serde_json::json;
use tutor_client::{GeminiClient, OllamaClient};
use tutor_config::{ModelSettings, Provider};
use tutor_core::{LanguageModel, Message, ModelRequest, TutorError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(provider: Provider, model_id: &str, endpoint: String) -> ModelSettings {
    ModelSettings {
        provider,
        model_id: model_id.to_string(),
        api_key: Some("test-key".to_string()),
        endpoint: Some(endpoint),
        timeout_secs: 5,
        ..ModelSettings::default()
    }
}

fn request() -> ModelRequest {
    ModelRequest {
        system: Some("You are a data science tutor.".to_string()),
        messages: vec![
            Message::user("What is a histogram?"),
            Message::assistant("A bar chart of binned counts."),
            Message::user("How many bins should I use?"),
        ],
        temperature: 0.4,
        max_tokens: 256,
    }
}

#[tokio::test]
async fn gemini_sends_history_and_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "You are a data science tutor." }] },
            "contents": [
                { "role": "user", "parts": [{ "text": "What is a histogram?" }] },
                { "role": "model", "parts": [{ "text": "A bar chart of binned counts." }] },
                { "role": "user", "parts": [{ "text": "How many bins should I use?" }] }
            ],
            "generationConfig": { "maxOutputTokens": 256 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Try the " }, { "text": "Freedman-Diaconis rule." }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 42, "candidatesTokenCount": 7, "totalTokenCount": 49 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&settings(Provider::Gemini, "gemini-1.5-flash", server.uri())).unwrap();
    let reply = client.generate(request()).await.unwrap();

    assert_eq!(reply.text, "Try the Freedman-Diaconis rule.");
    let usage = reply.usage.unwrap();
    assert_eq!(usage.input_tokens, 42);
    assert_eq!(usage.output_tokens, 7);
    assert_eq!(usage.total_tokens, 49);
}

#[tokio::test]
async fn gemini_http_error_becomes_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&settings(Provider::Gemini, "gemini-1.5-flash", server.uri())).unwrap();
    let err = client.generate(request()).await.unwrap_err();

    match err {
        TutorError::Provider { provider, message } => {
            assert_eq!(provider, "gemini");
            assert!(message.contains("429"));
            assert!(message.contains("quota exhausted"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn gemini_without_candidates_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&settings(Provider::Gemini, "gemini-1.5-flash", server.uri())).unwrap();
    assert!(client.generate(request()).await.is_err());
}

#[tokio::test]
async fn gemini_api_key_stays_out_of_the_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Use a box plot." }] } }]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&settings(Provider::Gemini, "gemini-1.5-flash", server.uri())).unwrap();
    client.generate(request()).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].url.query().is_none());
    assert!(!received[0].url.as_str().contains("test-key"));
}

#[tokio::test]
async fn gemini_connection_error_does_not_reveal_api_key() {
    let mut settings = settings(
        Provider::Gemini,
        "gemini-1.5-flash",
        "http://127.0.0.1:9".to_string(),
    );
    settings.api_key = Some("SUPER-SECRET-KEY".to_string());

    let client = GeminiClient::new(&settings).unwrap();
    let err = client.generate(request()).await.unwrap_err();

    assert!(matches!(err, TutorError::Provider { .. }));
    assert!(!err.to_string().contains("SUPER-SECRET-KEY"));
    assert!(!err.to_string().contains("127.0.0.1"));
}

#[test]
fn gemini_requires_api_key() {
    let mut settings = settings(Provider::Gemini, "gemini-1.5-flash", "http://localhost".into());
    settings.api_key = None;
    assert!(GeminiClient::new(&settings).is_err());
}

#[tokio::test]
async fn ollama_prepends_system_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2:1b",
            "stream": false,
            "messages": [
                { "role": "system", "content": "You are a data science tutor." },
                { "role": "user", "content": "What is a histogram?" },
                { "role": "assistant", "content": "A bar chart of binned counts." },
                { "role": "user", "content": "How many bins should I use?" }
            ],
            "options": { "num_predict": 256 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:1b",
            "message": { "role": "assistant", "content": "Start with Sturges' rule." },
            "done": true,
            "prompt_eval_count": 30,
            "eval_count": 6
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&settings(Provider::Ollama, "llama3.2:1b", server.uri())).unwrap();
    let reply = client.generate(request()).await.unwrap();

    assert_eq!(reply.text, "Start with Sturges' rule.");
    assert_eq!(reply.usage.unwrap().total_tokens, 36);
    assert_eq!(client.provider(), "ollama");
}

#[tokio::test]
async fn ollama_empty_reply_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "   " },
            "done": true
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&settings(Provider::Ollama, "llama3.2:1b", server.uri())).unwrap();
    assert!(client.generate(request()).await.is_err());
}

#[tokio::test]
async fn default_stream_delivers_single_chunk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "Bins are buckets." },
            "done": true
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&settings(Provider::Ollama, "llama3.2:1b", server.uri())).unwrap();
    let mut chunks: Vec<String> = Vec::new();
    let reply = client
        .generate_stream(request(), &mut |c: &str| chunks.push(c.to_string()))
        .await
        .unwrap();

    assert_eq!(chunks, vec!["Bins are buckets.".to_string()]);
    assert!(reply.usage.is_none());
}
