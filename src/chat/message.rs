use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_url: None,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_image(content, None)
    }

    #[must_use]
    pub fn assistant_with_image(content: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image_url,
        }
    }
}

/// Ordered message log.
///
/// At most one assistant message is in progress at a time, and when present
/// it is the last element.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
    in_progress: bool,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn has_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.in_progress = false;
        self.messages.push(Message::user(content));
    }

    /// Append a complete assistant message.
    pub fn push_assistant(&mut self, message: Message) {
        self.in_progress = false;
        self.messages.push(message);
    }

    /// Fold a delta into the in-progress assistant message, creating it on
    /// the first delta of a cycle.
    pub fn append_delta(&mut self, delta: &str) {
        if self.in_progress {
            if let Some(last) = self.messages.last_mut() {
                last.content.push_str(delta);
                return;
            }
        }
        self.messages.push(Message::assistant(delta));
        self.in_progress = true;
    }

    /// Seal the in-progress message, if any.
    pub fn finish_stream(&mut self) {
        self.in_progress = false;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.in_progress = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deltas_extend_one_message() {
        let mut log = ConversationLog::new();
        log.push_user("hi");
        log.append_delta("He");
        log.append_delta("llo");
        log.finish_stream();
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[1], Message::assistant("Hello"));
        assert!(!log.has_in_progress());
    }

    #[test]
    fn test_new_cycle_starts_new_assistant_message() {
        let mut log = ConversationLog::new();
        log.push_user("one");
        log.append_delta("first");
        log.finish_stream();
        log.push_user("two");
        log.append_delta("second");
        let contents: Vec<&str> = log.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "first", "two", "second"]);
    }

    #[test]
    fn test_sealed_assistant_is_not_extended() {
        let mut log = ConversationLog::new();
        log.push_user("draw");
        log.push_assistant(Message::assistant_with_image("pic", Some("X".into())));
        log.append_delta("new");
        assert_eq!(log.len(), 3);
        assert_eq!(log.messages()[1].content, "pic");
    }

    #[test]
    fn test_clear_resets_progress() {
        let mut log = ConversationLog::new();
        log.append_delta("partial");
        log.clear();
        assert!(log.is_empty());
        assert!(!log.has_in_progress());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::user("x")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "x"}));
    }
}
