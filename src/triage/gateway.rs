use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chats::transcript::{Message, Role, TRANSCRIPT_CAP},
    config::ChatConfig,
    AppError, AppResult,
};

pub const TRIAGE_PREAMBLE: &str = "You are a medical chatbot. Provide accurate diagnoses and solutions based on the symptoms provided. If the symptoms provided by the user are too serious or life-threatening, please start your response with Emergency.";

/// The message list sent for one turn: the transcript behind a `system`
/// preamble, then `incoming`, trimmed to `TRANSCRIPT_CAP` without ever
/// dropping the leading `system` entry.
pub fn build_window(transcript: Vec<Message>, incoming: Message) -> Vec<Message> {
    let mut window = transcript;
    if window.first().is_none_or(|m| m.role != Role::System) {
        window.insert(0, Message::new(Role::System, TRIAGE_PREAMBLE));
    }
    window.push(incoming);

    while window.len() > TRANSCRIPT_CAP {
        let earliest = usize::from(window[0].role == Role::System);
        window.remove(earliest);
    }
    window
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: Role,
    content: &'a str,
}

/// Parts are kept loose; only string `text` fields contribute to the reply.
#[derive(Debug, Deserialize)]
struct PartsMessage {
    content: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TextMessage {
    text: String,
}

/// Reply shapes the chat endpoint has been seen to return, tried top to bottom.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyShape {
    Message { message: String },
    Content { content: String },
    Parts { message: PartsMessage },
    Text { message: TextMessage },
}

impl ReplyShape {
    fn into_text(self) -> String {
        match self {
            ReplyShape::Message { message } => message,
            ReplyShape::Content { content } => content,
            ReplyShape::Parts { message } => message
                .content
                .into_iter()
                .filter_map(|part| match part {
                    Value::Object(mut fields) => match fields.remove("text") {
                        Some(Value::String(text)) => Some(text),
                        _ => None,
                    },
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
            ReplyShape::Text { message } => message.text,
        }
    }
}

/// Pulls the reply text out of a completion payload. Unknown shapes fall
/// back to the serialized payload instead of failing.
pub fn extract_reply(payload: Value) -> String {
    let reply = match ReplyShape::deserialize(&payload) {
        Ok(shape) => shape.into_text(),
        Err(_) => {
            tracing::warn!("unrecognized completion payload, replying with it verbatim");
            payload.to_string()
        }
    };
    reply.trim().to_owned()
}

#[derive(Debug, Clone)]
pub struct LanguageModel {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl LanguageModel {
    pub fn new(http_client: reqwest::Client, config: &ChatConfig) -> Self {
        LanguageModel {
            http_client,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub async fn complete(&self, messages: &[Message]) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatRequestMessage { role: m.role, content: &m.msg })
                .collect(),
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "requesting completion");
        let body = self.http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("language model request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("language model rejected the request: {e}")))?
            .text()
            .await?;

        Ok(match serde_json::from_str::<Value>(&body) {
            Ok(payload) => extract_reply(payload),
            Err(_) => body.trim().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn user(msg: &str) -> Message {
        Message::new(Role::User, msg)
    }

    #[test]
    fn test_window_synthesizes_preamble() {
        let window = build_window(vec![], user("I have a cough"));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0], Message::new(Role::System, TRIAGE_PREAMBLE));
        assert_eq!(window[1], user("I have a cough"));
    }

    #[test]
    fn test_window_keeps_existing_system_message() {
        let transcript = vec![Message::new(Role::System, "custom"), user("a")];
        let window = build_window(transcript, user("b"));
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].msg, "custom");
    }

    #[test]
    fn test_window_never_drops_preamble() {
        let transcript: Vec<_> = (0..10).map(|i| user(&format!("m{i}"))).collect();
        let window = build_window(transcript, user("new"));

        assert_eq!(window.len(), TRANSCRIPT_CAP);
        assert_eq!(window[0].role, Role::System);
        assert_eq!(window[1].msg, "m2");
        assert_eq!(window.last().unwrap().msg, "new");
    }

    #[test]
    fn test_extract_top_level_message() {
        assert_eq!(extract_reply(json!({ "message": "  Rest and fluids. " })), "Rest and fluids.");
    }

    #[test]
    fn test_extract_top_level_content() {
        assert_eq!(extract_reply(json!({ "content": "Take ibuprofen" })), "Take ibuprofen");
    }

    #[test]
    fn test_extract_content_parts() {
        let payload = json!({
            "id": "abc",
            "message": {
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Emergency:" },
                    { "type": "tool" },
                    { "type": "text", "text": "call 911 " }
                ]
            }
        });
        assert_eq!(extract_reply(payload), "Emergency: call 911");
    }

    #[test]
    fn test_extract_content_parts_skips_odd_shapes() {
        let payload = json!({
            "message": {
                "content": [
                    { "type": "text", "text": "Rest." },
                    { "type": "citation", "text": { "start": 0 } },
                    "stray",
                    { "type": "text", "text": null }
                ]
            }
        });
        assert_eq!(extract_reply(payload), "Rest.");
    }

    #[test]
    fn test_extract_message_text() {
        assert_eq!(extract_reply(json!({ "message": { "text": "hello" } })), "hello");
    }

    #[test]
    fn test_extract_falls_back_to_payload() {
        let payload = json!({ "unexpected": 1 });
        assert_eq!(extract_reply(payload), r#"{"unexpected":1}"#);
    }

    fn model(server: &mockito::Server) -> LanguageModel {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        LanguageModel::new(http_client, &ChatConfig {
            url: format!("{}/v2/chat", server.url()),
            model: "test-model".to_owned(),
            api_key: "secret".to_owned(),
        })
    }

    #[tokio::test]
    async fn test_complete_sends_role_content_pairs() {
        let mut server = mockito::Server::new_async().await;
        let handler = server
            .mock("POST", "/v2/chat")
            .match_header("Authorization", "Bearer secret")
            .match_body(mockito::Matcher::Json(json!({
                "model": "test-model",
                "messages": [
                    { "role": "system", "content": TRIAGE_PREAMBLE },
                    { "role": "user", "content": "sore throat" }
                ]
            })))
            .with_status(200)
            .with_body(r#"{"message":{"content":[{"type":"text","text":"Gargle salt water."}]}}"#)
            .create_async()
            .await;

        let window = build_window(vec![], user("sore throat"));
        let reply = model(&server).complete(&window).await.unwrap();

        assert_eq!(reply, "Gargle salt water.");
        handler.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_surfaces_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/chat")
            .with_status(500)
            .create_async()
            .await;

        let err = model(&server).complete(&[user("hi")]).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_complete_non_json_body_degrades_to_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/chat")
            .with_status(200)
            .with_body(" plain words ")
            .create_async()
            .await;

        let reply = model(&server).complete(&[user("hi")]).await.unwrap();
        assert_eq!(reply, "plain words");
    }
}
