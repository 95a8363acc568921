pub mod model;
pub mod registry;
pub mod templates;

pub use model::{Bot, BotType, BotUpdate, NewBot, ResponseMode};
pub use registry::BotRegistry;
pub use templates::{find_template, BotTemplate, BOT_TEMPLATES, DEFAULT_MODEL, MODELS};
