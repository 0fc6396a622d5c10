//! Chat-completion client used by the expense parser.
//!
//! [`LanguageModel`] is the seam the parser talks to; [`OpenAiClient`] is the
//! production implementation over the OpenAI chat-completions HTTP API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// The user turn of a completion: free text, or an image with an
/// instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserContent {
    Text(String),
    Image { instruction: String, url: String },
}

/// A single-turn JSON-mode completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: UserContent,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("the model returned no content")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw text content of the first completion choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn builder() -> OpenAiClientBuilder {
        OpenAiClientBuilder::default()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn chat_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let user = match &request.user {
            UserContent::Text(text) => MessageContent::Text(text),
            UserContent::Image { instruction, url } => MessageContent::Parts(vec![
                ContentPart::Text { text: instruction },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ]),
        };
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.system),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LlmError::MissingApiKey);
        };

        let resp = self
            .http
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(&self.chat_request(request))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let body = resp.json::<ChatResponse>().await?;
            return first_choice(body);
        }

        let message = match resp.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => "language model error".to_string(),
        };
        Err(LlmError::Server { status, message })
    }
}

fn first_choice(body: ChatResponse) -> Result<String, LlmError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[derive(Default)]
pub struct OpenAiClientBuilder {
    http: Option<Client>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl OpenAiClientBuilder {
    pub fn http(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Blank keys are treated as missing.
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn build(self) -> OpenAiClient {
        OpenAiClient {
            http: self.http.unwrap_or_default(),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
