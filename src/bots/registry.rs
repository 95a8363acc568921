use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::model::{Bot, BotType, BotUpdate, NewBot};
use super::templates::{BotTemplate, DEFAULT_MODEL, DEFAULT_PERSONALITY};
use crate::error::StoreError;
use crate::storage::{load_json, save_json, KvStore};
use crate::util::random_uuid;

pub const BOTS_KEY: &str = "bots";

/// Bot collection persisted as one JSON document.
pub struct BotRegistry<S> {
    store: S,
    bots: RwLock<Vec<Bot>>,
}

impl<S: KvStore> BotRegistry<S> {
    /// Load the collection from `store`. Unreadable data starts empty.
    pub fn open(store: S) -> Self {
        let bots: Vec<Bot> = load_json(&store, BOTS_KEY, Vec::new());
        tracing::debug!(count = bots.len(), "loaded bots");
        Self {
            store,
            bots: RwLock::new(bots),
        }
    }

    /// All bots, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<Bot> {
        let mut bots = self.bots.read().clone();
        bots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bots
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Bot> {
        self.bots.read().iter().find(|bot| bot.id == id).cloned()
    }

    /// Look a bot up by id, or by case-insensitive name.
    #[must_use]
    pub fn find(&self, name_or_id: &str) -> Option<Bot> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            return self.get(id);
        }
        let needle = name_or_id.trim().to_lowercase();
        self.list()
            .into_iter()
            .find(|bot| bot.name.to_lowercase() == needle)
    }

    /// Bots matching a name/description search and an optional type.
    #[must_use]
    pub fn filter(&self, search: &str, bot_type: Option<BotType>) -> Vec<Bot> {
        self.list()
            .into_iter()
            .filter(|bot| bot.matches_search(search))
            .filter(|bot| bot_type.map_or(true, |kind| bot.bot_type == kind))
            .collect()
    }

    /// Create a bot owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] when `owner` is empty and
    /// [`StoreError::Invalid`] when the name is blank.
    pub fn create(&self, owner: &str, new_bot: NewBot) -> Result<Bot, StoreError> {
        if owner.trim().is_empty() {
            return Err(StoreError::Unauthenticated);
        }
        let name = new_bot.name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("bot name cannot be empty".into()));
        }

        let now = Utc::now();
        let bot = Bot {
            id: random_uuid(),
            user_id: owner.to_string(),
            name: name.to_string(),
            description: new_bot.description,
            bot_type: new_bot.bot_type,
            system_prompt: new_bot.system_prompt,
            model: new_bot.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            personality: new_bot
                .personality
                .unwrap_or_else(|| DEFAULT_PERSONALITY.to_string()),
            avatar_url: None,
            is_active: true,
            settings: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        };

        let mut bots = self.bots.write();
        bots.push(bot.clone());
        save_json(&self.store, BOTS_KEY, &*bots);
        tracing::info!(bot_id = %bot.id, bot_type = %bot.bot_type, "bot created");
        Ok(bot)
    }

    /// Create a bot from a template, optionally renaming it.
    ///
    /// # Errors
    ///
    /// Same as [`BotRegistry::create`].
    pub fn create_from_template(
        &self,
        owner: &str,
        template: &BotTemplate,
        name: Option<&str>,
        model: Option<&str>,
    ) -> Result<Bot, StoreError> {
        self.create(
            owner,
            NewBot {
                name: name.unwrap_or(template.name).to_string(),
                description: Some(template.description.to_string()),
                bot_type: template.bot_type,
                system_prompt: Some(template.system_prompt.to_string()),
                model: model.map(str::to_string),
                personality: Some(template.personality.to_string()),
            },
        )
    }

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::Invalid`] when the update blanks the name.
    pub fn update(&self, id: Uuid, update: BotUpdate) -> Result<Bot, StoreError> {
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(StoreError::Invalid("bot name cannot be empty".into()));
        }
        let mut bots = self.bots.write();
        let bot = bots
            .iter_mut()
            .find(|bot| bot.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("bot {id}")))?;
        update.apply(bot);
        bot.updated_at = Utc::now();
        let updated = bot.clone();
        save_json(&self.store, BOTS_KEY, &*bots);
        tracing::info!(bot_id = %id, "bot updated");
        Ok(updated)
    }

    /// Flip `is_active`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn toggle_active(&self, id: Uuid) -> Result<Bot, StoreError> {
        let current = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("bot {id}")))?;
        self.update(
            id,
            BotUpdate {
                is_active: Some(!current.is_active),
                ..BotUpdate::default()
            },
        )
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut bots = self.bots.write();
        let before = bots.len();
        bots.retain(|bot| bot.id != id);
        if bots.len() == before {
            return Err(StoreError::NotFound(format!("bot {id}")));
        }
        save_json(&self.store, BOTS_KEY, &*bots);
        tracing::info!(bot_id = %id, "bot deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::templates::find_template;
    use crate::storage::MemoryKvStore;

    fn registry() -> BotRegistry<MemoryKvStore> {
        BotRegistry::open(MemoryKvStore::new())
    }

    fn new_bot(name: &str) -> NewBot {
        NewBot {
            name: name.to_string(),
            ..NewBot::default()
        }
    }

    #[test]
    fn test_create_applies_defaults() {
        let registry = registry();
        let bot = registry.create("user-1", new_bot("  Helper  ")).unwrap();
        assert_eq!(bot.name, "Helper");
        assert_eq!(bot.model, DEFAULT_MODEL);
        assert_eq!(bot.personality, "friendly");
        assert!(bot.is_active);
        assert_eq!(bot.user_id, "user-1");
        assert_eq!(bot.created_at, bot.updated_at);
    }

    #[test]
    fn test_create_requires_owner_and_name() {
        let registry = registry();
        assert!(matches!(
            registry.create("", new_bot("x")),
            Err(StoreError::Unauthenticated)
        ));
        assert!(matches!(
            registry.create("u", new_bot("   ")),
            Err(StoreError::Invalid(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_list_is_newest_first() {
        let registry = registry();
        let first = registry.create("u", new_bot("first")).unwrap();
        let second = registry.create("u", new_bot("second")).unwrap();
        // Force distinct timestamps regardless of clock resolution.
        registry
            .bots
            .write()
            .iter_mut()
            .find(|bot| bot.id == first.id)
            .unwrap()
            .created_at -= chrono::Duration::seconds(10);
        let names: Vec<String> = registry.list().into_iter().map(|bot| bot.name).collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(registry.get(second.id).unwrap().name, "second");
    }

    #[test]
    fn test_find_by_id_or_name() {
        let registry = registry();
        let bot = registry.create("u", new_bot("Code Helper")).unwrap();
        assert_eq!(registry.find(&bot.id.to_string()).unwrap().id, bot.id);
        assert_eq!(registry.find("code helper").unwrap().id, bot.id);
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn test_template_creation() {
        let registry = registry();
        let template = find_template("image-creator").unwrap();
        let bot = registry
            .create_from_template("u", template, None, Some("openai/gpt-5"))
            .unwrap();
        assert_eq!(bot.name, "Image Creator");
        assert_eq!(bot.bot_type, BotType::ImageGeneration);
        assert_eq!(bot.personality, "creative");
        assert_eq!(bot.model, "openai/gpt-5");
        assert!(bot.system_prompt.unwrap().contains("image generation"));
    }

    #[test]
    fn test_update_toggle_delete() {
        let registry = registry();
        let bot = registry.create("u", new_bot("bot")).unwrap();

        let toggled = registry.toggle_active(bot.id).unwrap();
        assert!(!toggled.is_active);
        assert!(toggled.updated_at >= bot.updated_at);

        let renamed = registry
            .update(
                bot.id,
                BotUpdate {
                    name: Some("renamed".into()),
                    ..BotUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "renamed");
        assert!(!renamed.is_active);

        registry.delete(bot.id).unwrap();
        assert!(matches!(
            registry.delete(bot.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            registry.toggle_active(bot.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_filter_by_search_and_type() {
        let registry = registry();
        registry
            .create_from_template("u", find_template("customer-support").unwrap(), None, None)
            .unwrap();
        registry
            .create_from_template("u", find_template("code-assistant").unwrap(), None, None)
            .unwrap();
        registry
            .create_from_template("u", find_template("voice-concierge").unwrap(), None, None)
            .unwrap();

        assert_eq!(registry.filter("", None).len(), 3);
        assert_eq!(registry.filter("", Some(BotType::Chatbot)).len(), 2);
        assert_eq!(registry.filter("PROGRAMMING", None).len(), 1);
        assert!(registry
            .filter("programming", Some(BotType::VoiceAgent))
            .is_empty());
    }

    #[test]
    fn test_changes_persist_across_reopen() {
        let store = MemoryKvStore::new();
        let id = {
            let registry = BotRegistry::open(&store);
            registry.create("u", new_bot("kept")).unwrap().id
        };
        let reopened = BotRegistry::open(&store);
        assert_eq!(reopened.get(id).unwrap().name, "kept");
    }
}
