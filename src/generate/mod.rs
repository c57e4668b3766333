use std::io::{BufRead, BufReader};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The generation collaborator. The engine itself never needs it; only the
/// question-answering flow calls out here.
pub trait LanguageGenerator {
    /// One-shot completion.
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Streaming completion: a finite, non-restartable sequence of chunks.
    fn stream_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<String>>>>;
}

/// OpenAI-compatible chat-completions client. `base_url` may point at any
/// compatible endpoint.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request(&self, system_prompt: &str, user_prompt: &str, stream: bool) -> Result<reqwest::blocking::Response> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": stream,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        debug!("Calling generator model {}", self.model);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| Error::Generator(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(Error::Generator(format!("generator returned {status}: {text}")));
        }

        Ok(resp)
    }
}

impl LanguageGenerator for OpenAiGenerator {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let resp = self.request(system_prompt, user_prompt, false)?;

        let completion: ChatCompletion = resp
            .json()
            .map_err(|e| Error::Generator(format!("bad completion payload: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| Error::Generator("completion had no choices".to_string()))
    }

    fn stream_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<String>>>> {
        let resp = self.request(system_prompt, user_prompt, true)?;
        let lines = BufReader::new(resp).lines();

        // SSE framing: "data: {json}" lines, ending with "data: [DONE]".
        let chunks = lines.filter_map(|line| match line {
            Err(e) => Some(Err(Error::Generator(format!("stream read failed: {e}")))),
            Ok(line) => {
                let data = line.strip_prefix("data: ")?.trim();
                if data.is_empty() || data == "[DONE]" {
                    return None;
                }
                match serde_json::from_str::<ChatChunk>(data) {
                    Err(e) => Some(Err(Error::Generator(format!("bad stream chunk: {e}")))),
                    Ok(chunk) => chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta)
                        .and_then(|d| d.content)
                        .filter(|c| !c.is_empty())
                        .map(Ok),
                }
            }
        });

        Ok(Box::new(chunks))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}
