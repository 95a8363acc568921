use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of bot, which also decides how the endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BotType {
    #[default]
    Chatbot,
    VoiceAgent,
    TaskAutomation,
    ImageGeneration,
}

/// How a bot's reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One complete JSON document.
    SingleShot,
    /// Newline-delimited `data:` frames.
    Incremental,
}

impl BotType {
    pub const ALL: [BotType; 4] = [
        BotType::Chatbot,
        BotType::VoiceAgent,
        BotType::TaskAutomation,
        BotType::ImageGeneration,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BotType::Chatbot => "chatbot",
            BotType::VoiceAgent => "voice_agent",
            BotType::TaskAutomation => "task_automation",
            BotType::ImageGeneration => "image_generation",
        }
    }

    #[must_use]
    pub fn response_mode(self) -> ResponseMode {
        match self {
            BotType::ImageGeneration => ResponseMode::SingleShot,
            BotType::Chatbot | BotType::VoiceAgent | BotType::TaskAutomation => {
                ResponseMode::Incremental
            }
        }
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BotType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown bot type '{s}'. Must be one of: chatbot, voice_agent, task_automation, image_generation"
                )
            })
    }
}

/// A user-defined bot as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub bot_type: BotType,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub model: String,
    pub personality: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    /// The bot's own system prompt, or `default` when it has none.
    #[must_use]
    pub fn system_prompt_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => default,
        }
    }

    /// Case-insensitive match on name or description.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&query))
    }
}

/// Fields accepted when creating a bot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBot {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub bot_type: BotType,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub bot_type: Option<BotType>,
    pub system_prompt: Option<Option<String>>,
    pub model: Option<String>,
    pub personality: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub settings: Option<serde_json::Map<String, serde_json::Value>>,
}

impl BotUpdate {
    pub(crate) fn apply(self, bot: &mut Bot) {
        if let Some(name) = self.name {
            bot.name = name;
        }
        if let Some(description) = self.description {
            bot.description = description;
        }
        if let Some(bot_type) = self.bot_type {
            bot.bot_type = bot_type;
        }
        if let Some(system_prompt) = self.system_prompt {
            bot.system_prompt = system_prompt;
        }
        if let Some(model) = self.model {
            bot.model = model;
        }
        if let Some(personality) = self.personality {
            bot.personality = personality;
        }
        if let Some(avatar_url) = self.avatar_url {
            bot.avatar_url = avatar_url;
        }
        if let Some(is_active) = self.is_active {
            bot.is_active = is_active;
        }
        if let Some(settings) = self.settings {
            bot.settings = settings;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bot() -> Bot {
        let now = Utc::now();
        Bot {
            id: Uuid::from_u128(1),
            user_id: "u1".to_string(),
            name: "Support Desk".to_string(),
            description: Some("Answers Billing questions".to_string()),
            bot_type: BotType::Chatbot,
            system_prompt: None,
            model: "google/gemini-2.5-flash".to_string(),
            personality: "friendly".to_string(),
            avatar_url: None,
            is_active: true,
            settings: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bot_type_serde() {
        let json = serde_json::to_string(&BotType::ImageGeneration).unwrap();
        assert_eq!(json, "\"image_generation\"");
        let kind: BotType = serde_json::from_str("\"voice_agent\"").unwrap();
        assert_eq!(kind, BotType::VoiceAgent);
    }

    #[test]
    fn test_bot_type_from_str_round_trips_display() {
        for kind in BotType::ALL {
            assert_eq!(kind.to_string().parse::<BotType>().unwrap(), kind);
        }
        assert!("robot".parse::<BotType>().is_err());
    }

    #[test]
    fn test_response_mode() {
        assert_eq!(
            BotType::ImageGeneration.response_mode(),
            ResponseMode::SingleShot
        );
        assert_eq!(BotType::Chatbot.response_mode(), ResponseMode::Incremental);
        assert_eq!(
            BotType::TaskAutomation.response_mode(),
            ResponseMode::Incremental
        );
    }

    #[test]
    fn test_system_prompt_fallback() {
        let mut bot = sample_bot();
        assert_eq!(bot.system_prompt_or("default"), "default");
        bot.system_prompt = Some("  ".to_string());
        assert_eq!(bot.system_prompt_or("default"), "default");
        bot.system_prompt = Some("Be terse.".to_string());
        assert_eq!(bot.system_prompt_or("default"), "Be terse.");
    }

    #[test]
    fn test_matches_search_name_or_description() {
        let bot = sample_bot();
        assert!(bot.matches_search("support"));
        assert!(bot.matches_search("billing"));
        assert!(!bot.matches_search("images"));
    }

    #[test]
    fn test_bot_json_uses_type_key() {
        let json = serde_json::to_value(sample_bot()).unwrap();
        assert_eq!(json["type"], "chatbot");
        assert!(json.get("bot_type").is_none());
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut bot = sample_bot();
        BotUpdate {
            is_active: Some(false),
            description: Some(None),
            ..BotUpdate::default()
        }
        .apply(&mut bot);
        assert!(!bot.is_active);
        assert!(bot.description.is_none());
        assert_eq!(bot.name, "Support Desk");
    }
}
