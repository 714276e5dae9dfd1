//! Test doubles for the application: a recording bot, a local connector, and a harness that runs a
//! personality's handler chain directly against temp-file stores.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bot_runtime::{BotPersonality, Connection, TransportConnector, TransportError};
use chrono::Utc;
use dbot_core::{
    Bot, BotContext, Chat, DbotError, HandlerResponse, Message, SendOptions, UpdateKind, User,
};
use handler_chain::HandlerChain;
use telegram_bot::AppStores;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const ADMIN_ID: i64 = 999;
/// Sends to this chat fail, as if the user blocked the bot.
pub const BLOCKED_CHAT: i64 = 13;

/// One recorded outbound call. `edited` holds the message id for edits.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub chat_id: i64,
    pub edited: Option<String>,
    pub text: String,
    pub options: SendOptions,
}

impl Outbound {
    pub fn callbacks(&self) -> Vec<String> {
        self.options
            .keyboard
            .iter()
            .flat_map(|kb| kb.rows.iter().flatten())
            .map(|b| b.callback_data.clone())
            .collect()
    }
}

pub struct MockBot {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl MockBot {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send(&self, chat_id: i64, text: &str, options: &SendOptions) -> dbot_core::Result<String> {
        if chat_id == BLOCKED_CHAT {
            return Err(DbotError::Bot("Forbidden: bot was blocked by the user".into()));
        }
        let _ = self.tx.send(Outbound {
            chat_id,
            edited: None,
            text: text.to_string(),
            options: options.clone(),
        });
        Ok("100".to_string())
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: &str,
        text: &str,
        options: &SendOptions,
    ) -> dbot_core::Result<()> {
        let _ = self.tx.send(Outbound {
            chat_id,
            edited: Some(message_id.to_string()),
            text: text.to_string(),
            options: options.clone(),
        });
        Ok(())
    }
}

/// Drains everything sent so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

fn user(id: i64) -> User {
    User {
        id,
        username: Some(format!("user{}", id)),
        first_name: Some(format!("Reader{}", id)),
        last_name: None,
    }
}

/// Private-chat text or command from `user_id`.
pub fn text(user_id: i64, content: &str) -> Message {
    Message {
        id: "1".to_string(),
        user: user(user_id),
        chat: Chat {
            id: user_id,
            chat_type: "private".to_string(),
        },
        content: content.to_string(),
        kind: Message::kind_of_text(content),
        created_at: Utc::now(),
    }
}

/// Button press on message 55 in `user_id`'s private chat.
pub fn callback(user_id: i64, data: &str) -> Message {
    Message {
        id: "55".to_string(),
        kind: UpdateKind::Callback,
        ..text(user_id, data)
    }
}

/// A personality's chain wired to a recording bot and fresh temp-file stores.
pub struct Harness {
    pub ctx: BotContext,
    pub chain: HandlerChain,
    pub stores: AppStores,
    pub sent: mpsc::UnboundedReceiver<Outbound>,
    _dir: TempDir,
}

impl Harness {
    /// Opens the stores, then builds the context the way a worker does: `setup` first, then handlers.
    pub async fn new<F>(
        name: &str,
        extra: &[(&str, &str)],
        personality: F,
    ) -> dbot_core::Result<Self>
    where
        F: FnOnce(&AppStores) -> Arc<dyn BotPersonality>,
    {
        let dir = tempfile::tempdir()?;
        let stores = AppStores::open(dir.path().join("notes.json"), dir.path().join("questions.json"))
            .await
            .map_err(DbotError::storage)?;
        let personality = personality(&stores);
        let (bot, sent) = MockBot::new();
        let extra: BTreeMap<String, String> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut ctx = BotContext::new(name, vec![ADMIN_ID], extra, bot);
        personality.setup(&mut ctx).await?;
        let chain = HandlerChain::from_handlers(personality.get_handlers(&ctx));
        Ok(Self {
            ctx,
            chain,
            stores,
            sent,
            _dir: dir,
        })
    }

    pub async fn handle(&self, message: Message) -> HandlerResponse {
        self.chain
            .handle(&self.ctx, &message)
            .await
            .expect("handler chain failed")
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        drain(&mut self.sent)
    }
}

type Sink = Arc<Mutex<Option<mpsc::Sender<Message>>>>;

/// Accepts every token except those starting with `0:`, which are rejected. The first
/// `reject_first` attempts are rejected regardless of token.
pub struct LocalConnector {
    pub bot: Arc<MockBot>,
    sinks: Arc<Mutex<BTreeMap<String, Sink>>>,
    reject_first: AtomicUsize,
}

impl LocalConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        Self::rejecting_first(0)
    }

    pub fn rejecting_first(n: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (bot, rx) = MockBot::new();
        (
            Arc::new(Self {
                bot,
                sinks: Arc::new(Mutex::new(BTreeMap::new())),
                reject_first: AtomicUsize::new(n),
            }),
            rx,
        )
    }

    /// Pushes `message` into the stream of the bot holding `token`.
    pub async fn inject(&self, token: &str, message: Message) -> bool {
        let sender = self
            .sinks
            .lock()
            .unwrap()
            .get(token)
            .and_then(|sink| sink.lock().unwrap().clone());
        match sender {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl TransportConnector for LocalConnector {
    async fn connect(&self, credential: &str) -> Result<Box<dyn Connection>, TransportError> {
        let scripted = self
            .reject_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted || credential.starts_with("0:") {
            return Err(TransportError::Rejected("Unauthorized".to_string()));
        }
        let sink: Sink = Arc::new(Mutex::new(None));
        self.sinks
            .lock()
            .unwrap()
            .insert(credential.to_string(), sink.clone());
        Ok(Box::new(LocalConnection {
            bot: self.bot.clone(),
            sink,
        }))
    }
}

struct LocalConnection {
    bot: Arc<MockBot>,
    sink: Sink,
}

#[async_trait]
impl Connection for LocalConnection {
    fn bot(&self) -> Arc<dyn Bot> {
        self.bot.clone()
    }

    async fn open(&mut self, sink: mpsc::Sender<Message>) -> Result<(), TransportError> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.lock().unwrap().take();
        Ok(())
    }
}

/// Waits up to one second for the next outbound call.
pub async fn next_outbound(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Option<Outbound> {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .flatten()
}
