use super::model::BotType;

/// Starting point offered when creating a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub bot_type: BotType,
    pub system_prompt: &'static str,
    pub personality: &'static str,
}

pub const BOT_TEMPLATES: &[BotTemplate] = &[
    BotTemplate {
        id: "customer-support",
        name: "Customer Support",
        description: "A friendly bot that helps customers with questions",
        bot_type: BotType::Chatbot,
        system_prompt: "You are a helpful customer support assistant. Be friendly, professional, and help resolve customer issues efficiently.",
        personality: "friendly",
    },
    BotTemplate {
        id: "code-assistant",
        name: "Code Assistant",
        description: "A bot that helps with programming questions",
        bot_type: BotType::Chatbot,
        system_prompt: "You are an expert programming assistant. Help users with code, debugging, and technical explanations. Use code examples when helpful.",
        personality: "technical",
    },
    BotTemplate {
        id: "voice-concierge",
        name: "Voice Concierge",
        description: "A voice-enabled assistant for real-time conversations",
        bot_type: BotType::VoiceAgent,
        system_prompt: "You are a voice concierge assistant. Speak naturally and help users with their requests in a conversational manner.",
        personality: "professional",
    },
    BotTemplate {
        id: "task-automator",
        name: "Task Automator",
        description: "Automates repetitive tasks and workflows",
        bot_type: BotType::TaskAutomation,
        system_prompt: "You are a task automation assistant. Help users define and execute automated workflows efficiently.",
        personality: "efficient",
    },
    BotTemplate {
        id: "image-creator",
        name: "Image Creator",
        description: "Creates and edits images based on descriptions",
        bot_type: BotType::ImageGeneration,
        system_prompt: "You are a creative image generation assistant. Create vivid, detailed images based on user descriptions.",
        personality: "creative",
    },
];

/// Model identifier and display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
}

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_PERSONALITY: &str = "friendly";

pub const MODELS: &[ModelOption] = &[
    ModelOption {
        id: "google/gemini-2.5-flash",
        label: "Gemini 2.5 Flash (Fast)",
    },
    ModelOption {
        id: "google/gemini-2.5-pro",
        label: "Gemini 2.5 Pro (Powerful)",
    },
    ModelOption {
        id: "openai/gpt-5-mini",
        label: "GPT-5 Mini",
    },
    ModelOption {
        id: "openai/gpt-5",
        label: "GPT-5 (Most Capable)",
    },
];

#[must_use]
pub fn find_template(id: &str) -> Option<&'static BotTemplate> {
    BOT_TEMPLATES.iter().find(|template| template.id == id)
}

#[must_use]
pub fn is_known_model(id: &str) -> bool {
    MODELS.iter().any(|model| model.id == id)
}
