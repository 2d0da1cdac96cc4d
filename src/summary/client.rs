//! Chat-completion client used to summarize the aggregate

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::Result;
use crate::config::OpenAiConfig;
use crate::error::RouteError;
use crate::http::{join_url, send_json};

const SERVICE: &str = "OpenAI API";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct SummarizationClient {
    client: ClientWithMiddleware,
    endpoint: String,
    api_key: String,
    model: String,
}

impl SummarizationClient {
    pub fn new(client: ClientWithMiddleware, config: &OpenAiConfig) -> Self {
        Self {
            client,
            endpoint: join_url(&config.base_url, "/chat/completions"),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
        }
    }

    /// Send the prompt as the user turn and return the first choice's text
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    pub async fn summarize(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(SERVICE, request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RouteError::upstream(SERVICE, "completion contained no message"))?;

        info!("Received summary of {} chars", text.len());
        Ok(text)
    }
}
