use serde::Serialize;

use crate::bots::model::BotType;
use crate::chat::message::{Message, Role};

/// One conversation entry as sent to the endpoint. Image references are
/// never part of the outbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body accepted by the chat function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub system_prompt: String,
    pub model: String,
    pub bot_type: BotType,
}

impl ChatRequest {
    /// Build a request from the conversation so far, which already ends with
    /// the new user utterance.
    #[must_use]
    pub fn from_log(
        log: &[Message],
        system_prompt: impl Into<String>,
        model: impl Into<String>,
        bot_type: BotType,
    ) -> Self {
        Self {
            messages: log.iter().map(WireMessage::from).collect(),
            system_prompt: system_prompt.into(),
            model: model.into(),
            bot_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let log = vec![
            Message::user("draw a cat"),
            Message::assistant_with_image("here", Some("https://img/x.png".into())),
            Message::user("again"),
        ];
        let request = ChatRequest::from_log(
            &log,
            "You are a helpful assistant.",
            "google/gemini-2.5-flash",
            BotType::ImageGeneration,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    {"role": "user", "content": "draw a cat"},
                    {"role": "assistant", "content": "here"},
                    {"role": "user", "content": "again"}
                ],
                "systemPrompt": "You are a helpful assistant.",
                "model": "google/gemini-2.5-flash",
                "botType": "image_generation"
            })
        );
    }
}
