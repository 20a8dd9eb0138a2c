//! Client for the external text-generation service that adds a witty line
//! to every scored guess.
//!
//! The game only depends on the [`FeedbackService`] trait. [`FeedbackClient`]
//! is the production implementation with two HTTP backends (Gemini
//! `generateContent` and an Ollama-style `/api/generate`) plus a disabled
//! backend that never touches the network.

use crate::debug_log;
use crate::game_state::Outcome;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// One scored guess, as sent to the commentary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub guess: u32,
    pub target: u32,
    pub attempts: u32,
    pub outcome: Outcome,
}

#[derive(thiserror::Error, Debug)]
pub enum FeedbackError {
    #[error("Request to feedback service failed (error: {0})")]
    Request(#[from] reqwest::Error),
    #[error("Feedback service returned an empty reply")]
    EmptyReply,
    #[error("No API key configured for the {0} backend")]
    MissingApiKey(&'static str),
    #[error("Feedback service is disabled")]
    Disabled,
}

/// Produces commentary for a scored guess. Callers treat every error alike.
#[allow(async_fn_in_trait)]
pub trait FeedbackService {
    async fn witty_feedback(&self, request: &FeedbackRequest) -> Result<String, FeedbackError>;
}

#[must_use]
pub fn build_prompt(request: &FeedbackRequest) -> String {
    let FeedbackRequest {
        guess,
        target,
        attempts,
        outcome,
    } = *request;
    let situation = match outcome {
        Outcome::High => format!("Their guess of {guess} was too high."),
        Outcome::Low => format!("Their guess of {guess} was too low."),
        Outcome::Correct => format!("They guessed {guess}, which is exactly right!"),
    };
    format!(
        "You are the playful host of a number guessing game. The player is trying to find \
         a secret number between 1 and 100. The secret number is {target}. {situation} \
         This was attempt number {attempts}.\n\
         Reply with one short, witty sentence reacting to the guess. \
         Never reveal the secret number unless the guess was correct."
    )
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Full endpoint URL, e.g. `http://127.0.0.1:11434/api/generate`.
    pub endpoint: String,
    pub model: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        }
    }
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|part| part.text).collect();
        non_empty(text)
    }
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The concrete commentary backends selectable from the command line.
pub enum FeedbackClient {
    Gemini { http: Client, config: GeminiConfig },
    Ollama { http: Client, config: OllamaConfig },
    Disabled,
}

impl FeedbackClient {
    pub fn gemini(config: GeminiConfig, timeout: Duration) -> Result<Self, FeedbackError> {
        Ok(Self::Gemini {
            http: http_client(timeout)?,
            config,
        })
    }

    pub fn ollama(config: OllamaConfig, timeout: Duration) -> Result<Self, FeedbackError> {
        Ok(Self::Ollama {
            http: http_client(timeout)?,
            config,
        })
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::Disabled
    }

    async fn query_gemini(
        http: &Client,
        config: &GeminiConfig,
        prompt: String,
    ) -> Result<String, FeedbackError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(FeedbackError::MissingApiKey("gemini"))?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        debug_log!("query_gemini() - POST {}", url);

        let response = http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await?
            .error_for_status()?
            .json::<GeminiResponse>()
            .await?;

        response.into_text().ok_or(FeedbackError::EmptyReply)
    }

    async fn query_ollama(
        http: &Client,
        config: &OllamaConfig,
        prompt: String,
    ) -> Result<String, FeedbackError> {
        debug_log!("query_ollama() - POST {}", config.endpoint);
        let request = OllamaRequest {
            model: config.model.clone(),
            prompt,
            stream: false,
        };

        let response = http
            .post(&config.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaResponse>()
            .await?;

        non_empty(response.response).ok_or(FeedbackError::EmptyReply)
    }
}

fn http_client(timeout: Duration) -> Result<Client, FeedbackError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

impl FeedbackService for FeedbackClient {
    async fn witty_feedback(&self, request: &FeedbackRequest) -> Result<String, FeedbackError> {
        let prompt = build_prompt(request);
        match self {
            Self::Gemini { http, config } => Self::query_gemini(http, config, prompt).await,
            Self::Ollama { http, config } => Self::query_ollama(http, config, prompt).await,
            Self::Disabled => Err(FeedbackError::Disabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Reads one HTTP request (head plus `content-length` body) as text.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serves a single canned response and hands back the raw request it saw.
    async fn spawn_one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}"), handle)
    }

    /// Accepts one connection and never answers it.
    async fn spawn_silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let _ = read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        format!("http://{addr}")
    }

    fn local_http(timeout: Duration) -> Client {
        Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("http client")
    }

    fn local_gemini(endpoint: String) -> FeedbackClient {
        FeedbackClient::Gemini {
            http: local_http(Duration::from_secs(5)),
            config: GeminiConfig {
                endpoint,
                model: "test-model".to_string(),
                api_key: Some("secret-key".to_string()),
            },
        }
    }

    fn local_ollama(endpoint: String) -> FeedbackClient {
        FeedbackClient::Ollama {
            http: local_http(Duration::from_secs(5)),
            config: OllamaConfig {
                endpoint: format!("{endpoint}/api/generate"),
                model: "test-model".to_string(),
            },
        }
    }

    fn request(guess: u32, outcome: Outcome) -> FeedbackRequest {
        FeedbackRequest {
            guess,
            target: 42,
            attempts: 3,
            outcome,
        }
    }

    #[test]
    fn test_prompt_describes_the_guess() {
        let prompt = build_prompt(&request(77, Outcome::High));
        assert!(prompt.contains("77 was too high"));
        assert!(prompt.contains("attempt number 3"));
        assert!(prompt.contains("between 1 and 100"));

        let prompt = build_prompt(&request(10, Outcome::Low));
        assert!(prompt.contains("10 was too low"));

        let prompt = build_prompt(&request(42, Outcome::Correct));
        assert!(prompt.contains("exactly right"));
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = serde_json::to_value(GeminiRequest::from_prompt("hello".to_string())).unwrap();
        assert_eq!(body, json!({ "contents": [{ "parts": [{ "text": "hello" }] }] }));
    }

    #[test]
    fn test_gemini_response_text_joins_parts() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "Too hot " }, { "text": "to handle!\n" }], "role": "model" } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_text(), Some("Too hot to handle!".to_string()));
    }

    #[test]
    fn test_gemini_response_without_text_is_empty() {
        let response: GeminiResponse = serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert_eq!(response.into_text(), None);

        let response: GeminiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(response.into_text(), None);

        let response: GeminiResponse =
            serde_json::from_str(r#"{ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }"#)
                .unwrap();
        assert_eq!(response.into_text(), None);
    }

    #[test]
    fn test_ollama_request_shape() {
        let body = serde_json::to_value(OllamaRequest {
            model: "llama3.2".to_string(),
            prompt: "hi".to_string(),
            stream: false,
        })
        .unwrap();
        assert_eq!(body, json!({ "model": "llama3.2", "prompt": "hi", "stream": false }));
    }

    #[test]
    fn test_ollama_response_parses() {
        let response: OllamaResponse =
            serde_json::from_str(r#"{ "model": "llama3.2", "response": " Close! ", "done": true }"#)
                .unwrap();
        assert_eq!(non_empty(response.response), Some("Close!".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_backend_fails() {
        let client = FeedbackClient::disabled();
        let result = client.witty_feedback(&request(5, Outcome::Low)).await;
        assert!(matches!(result, Err(FeedbackError::Disabled)));
    }

    #[tokio::test]
    async fn test_gemini_without_key_fails_before_sending() {
        let client = FeedbackClient::gemini(
            GeminiConfig {
                endpoint: "http://127.0.0.1:9".to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                api_key: None,
            },
            Duration::from_secs(1),
        )
        .unwrap();
        let result = client.witty_feedback(&request(5, Outcome::Low)).await;
        assert!(matches!(result, Err(FeedbackError::MissingApiKey("gemini"))));
    }

    #[tokio::test]
    async fn test_gemini_success_returns_text() {
        let body = r#"{ "candidates": [{ "content": { "parts": [{ "text": "Way too high!" }] } }] }"#;
        let (endpoint, server) = spawn_one_shot_server("200 OK", body).await;
        let client = local_gemini(endpoint);

        let reply = client.witty_feedback(&request(90, Outcome::High)).await.unwrap();
        assert_eq!(reply, "Way too high!");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /models/test-model:generateContent HTTP/1.1"));
        assert!(raw.to_lowercase().contains("x-goog-api-key: secret-key"));
        assert!(raw.contains("90 was too high"));
    }

    #[tokio::test]
    async fn test_gemini_server_error_is_request_error() {
        let (endpoint, server) =
            spawn_one_shot_server("500 Internal Server Error", r#"{ "error": "boom" }"#).await;
        let client = local_gemini(endpoint);

        let result = client.witty_feedback(&request(90, Outcome::High)).await;
        match result {
            Err(FeedbackError::Request(e)) => {
                assert_eq!(e.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("Expected request error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_gemini_blank_reply_is_empty_reply() {
        let body = r#"{ "candidates": [{ "content": { "parts": [{ "text": "   " }] } }] }"#;
        let (endpoint, server) = spawn_one_shot_server("200 OK", body).await;
        let client = local_gemini(endpoint);

        let result = client.witty_feedback(&request(90, Outcome::High)).await;
        assert!(matches!(result, Err(FeedbackError::EmptyReply)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ollama_success_returns_text() {
        let (endpoint, server) =
            spawn_one_shot_server("200 OK", r#"{ "response": " Colder... ", "done": true }"#).await;
        let client = local_ollama(endpoint);

        let reply = client.witty_feedback(&request(3, Outcome::Low)).await.unwrap();
        assert_eq!(reply, "Colder...");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/generate HTTP/1.1"));
        assert!(raw.contains(r#""model":"test-model""#));
        assert!(raw.contains(r#""stream":false"#));
    }

    #[tokio::test]
    async fn test_ollama_server_error_is_request_error() {
        let (endpoint, server) =
            spawn_one_shot_server("500 Internal Server Error", r#"{ "error": "boom" }"#).await;
        let client = local_ollama(endpoint);

        let result = client.witty_feedback(&request(3, Outcome::Low)).await;
        assert!(matches!(result, Err(FeedbackError::Request(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ollama_blank_reply_is_empty_reply() {
        let (endpoint, server) = spawn_one_shot_server("200 OK", r#"{ "response": "" }"#).await;
        let client = local_ollama(endpoint);

        let result = client.witty_feedback(&request(3, Outcome::Low)).await;
        assert!(matches!(result, Err(FeedbackError::EmptyReply)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let endpoint = spawn_silent_server().await;
        let client = FeedbackClient::Ollama {
            http: local_http(Duration::from_millis(200)),
            config: OllamaConfig {
                endpoint: format!("{endpoint}/api/generate"),
                model: "test-model".to_string(),
            },
        };

        let result = client.witty_feedback(&request(3, Outcome::Low)).await;
        match result {
            Err(FeedbackError::Request(e)) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {other:?}"),
        }
    }
}
