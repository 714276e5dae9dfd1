//! Typed per-bot context handed to every handler invocation.
//!
//! Built by the worker on each start from the bot's configuration and its live outbound [`Bot`],
//! then customised once by the personality's `setup` hook before handlers are registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, warn};

use crate::bot::{Bot, SendOptions};

#[derive(Clone)]
pub struct BotContext {
    pub bot_name: String,
    pub admin_ids: Vec<i64>,
    /// Chat that receives forwarded user content (e.g. questions). Falls back to `admin_ids`.
    pub admin_chat_id: Option<i64>,
    /// `BOT_<NAME>_<KEY>` entries that are not token or admin ids, keys lower-cased.
    pub extra: BTreeMap<String, String>,
    bot: Arc<dyn Bot>,
}

impl BotContext {
    pub fn new(
        bot_name: impl Into<String>,
        admin_ids: Vec<i64>,
        extra: BTreeMap<String, String>,
        bot: Arc<dyn Bot>,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            admin_ids,
            admin_chat_id: None,
            extra,
            bot,
        }
    }

    /// Outbound handle of this bot.
    pub fn bot(&self) -> &Arc<dyn Bot> {
        &self.bot
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Extra configuration value by lower-case key.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Where forwarded user content goes: the admin chat if configured, else every admin.
    pub fn forward_targets(&self) -> Vec<i64> {
        match self.admin_chat_id {
            Some(chat_id) => vec![chat_id],
            None => self.admin_ids.clone(),
        }
    }

    /// Best-effort notification to every admin id. Failures are logged and swallowed.
    /// Returns how many notifications were delivered.
    pub async fn notify_admins(&self, text: &str) -> usize {
        self.deliver(&self.admin_ids, text).await
    }

    /// Best-effort delivery to [`forward_targets`](Self::forward_targets).
    pub async fn forward(&self, text: &str, options: &SendOptions) -> usize {
        let mut delivered = 0;
        let targets = self.forward_targets();
        if targets.is_empty() {
            warn!(bot = %self.bot_name, "No admin chat or admin ids configured; nothing forwarded");
        }
        for chat_id in targets {
            match self.bot.send(chat_id, text, options).await {
                Ok(_) => delivered += 1,
                Err(e) => error!(bot = %self.bot_name, chat_id, error = %e, "Failed to forward to admin"),
            }
        }
        delivered
    }

    async fn deliver(&self, targets: &[i64], text: &str) -> usize {
        let mut delivered = 0;
        for &admin_id in targets {
            match self.bot.send(admin_id, text, &SendOptions::plain()).await {
                Ok(_) => delivered += 1,
                Err(e) => error!(bot = %self.bot_name, admin_id, error = %e, "Failed to notify admin"),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for BotContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotContext")
            .field("bot_name", &self.bot_name)
            .field("admin_ids", &self.admin_ids)
            .field("admin_chat_id", &self.admin_chat_id)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}
