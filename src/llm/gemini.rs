use super::{AnswerStream, ChatMessage, LlmError, TextGenerator};
use anyhow::Context as _;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    /// Read the credential from the environment. `GEMINI_BASE_URL` is only
    /// useful for pointing the client at a proxy.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?;
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(GeminiConfig {
            api_key,
            base_url,
            model: DEFAULT_MODEL.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn to_contents(turns: &[ChatMessage]) -> Vec<Content> {
    turns
        .iter()
        .map(|m| Content {
            role: Some(m.role.as_str().to_string()),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect()
}

fn system_content(instruction: &str) -> Content {
    Content {
        role: None,
        parts: vec![Part {
            text: instruction.to_string(),
        }],
    }
}

/// Concatenated text of the first candidate, if the response carries any.
fn response_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract the text fragment from one SSE `data:` payload.
fn fragment_from_event(data: &str) -> Option<String> {
    let event: GenerateResponse = serde_json::from_str(data).ok()?;
    response_text(&event)
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        GeminiClient { config }
    }

    fn endpoint(&self, method: &str, query: &str) -> String {
        format!(
            "{}/models/{}:{}?{}key={}",
            self.config.base_url, self.config.model, method, query, self.config.api_key
        )
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_json(&self, prompt: &str, schema: Value) -> Result<String, LlmError> {
        let client = Client::new();
        let body = GenerateRequest {
            contents: to_contents(&[ChatMessage::user(prompt)]),
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
        };

        let resp = client
            .post(self.endpoint("generateContent", ""))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }

        let data: GenerateResponse = resp.json().await?;
        response_text(&data).ok_or_else(|| LlmError::Parse("response missing text content".into()))
    }

    async fn stream_answer(
        &self,
        system_instruction: &str,
        turns: Vec<ChatMessage>,
    ) -> Result<AnswerStream, LlmError> {
        let client = Client::new();
        let body = GenerateRequest {
            contents: to_contents(&turns),
            system_instruction: Some(system_content(system_instruction)),
            generation_config: None,
        };

        let resp = client
            .post(self.endpoint("streamGenerateContent", "alt=sse&"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }

        let (tx, stream) = AnswerStream::channel();
        tokio::spawn(async move {
            let mut byte_stream = resp.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        // Consumer may already be gone; nothing else to do.
                        let _ = tx.send(Err(LlmError::Http(e))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer = buffer[pos + 1..].to_string();

                    if let Some(data) = line.strip_prefix("data: ") {
                        if let Some(text) = fragment_from_event(data) {
                            if tx.send(Ok(text)).await.is_err() {
                                // Consumer dropped the stream; stop reading.
                                return;
                            }
                        }
                    }
                }
            }
            // Sender drops here and the stream reports exhaustion.
        });

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_from_event_extracts_candidate_text() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]}}]}"#;
        assert_eq!(fragment_from_event(data).unwrap(), "Hello");
    }

    #[test]
    fn fragment_from_event_skips_empty_events() {
        assert!(fragment_from_event(r#"{"candidates":[]}"#).is_none());
        assert!(fragment_from_event("not json").is_none());
    }

    #[test]
    fn request_serializes_vendor_field_names() {
        let body = GenerateRequest {
            contents: to_contents(&[ChatMessage::user("q")]),
            system_instruction: Some(system_content("sys")),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({"type": "OBJECT"}),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "q");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }
}
