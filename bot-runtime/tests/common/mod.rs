//! Test doubles for the runtime: a scripted transport, a recording bot and a small personality.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bot_runtime::{
    BotPersonality, BotWorker, Connection, RetryPolicy, TransportConnector, TransportError,
    WorkerConfig,
};
use chrono::Utc;
use dbot_core::{
    Bot, BotContext, Chat, DbotError, Handler, HandlerError, HandlerResponse, Message,
    SendOptions, User,
};
use tokio::sync::mpsc;

/// What the next `connect` call does.
#[derive(Debug, Clone, Copy)]
pub enum ConnectPlan {
    Succeed,
    Timeout,
    Reject,
    /// Never answers; the worker's per-attempt timeout has to fire.
    Hang,
}

/// One recorded outbound message.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub chat_id: i64,
    pub text: String,
}

/// Records every send on an unbounded channel. Chat id 13 always fails.
pub struct MockBot {
    sent_tx: mpsc::UnboundedSender<SentRecord>,
}

#[async_trait]
impl Bot for MockBot {
    async fn send(&self, chat_id: i64, text: &str, _options: &SendOptions) -> dbot_core::Result<String> {
        if chat_id == 13 {
            return Err(DbotError::Bot("Forbidden: bot was blocked by the user".into()));
        }
        let _ = self.sent_tx.send(SentRecord {
            chat_id,
            text: text.to_string(),
        });
        Ok("1".to_string())
    }

    async fn edit(&self, _: i64, _: &str, _: &str, _: &SendOptions) -> dbot_core::Result<()> {
        Ok(())
    }
}

type Sink = Arc<Mutex<Option<mpsc::Sender<Message>>>>;

/// Scripted connector. Plans are consumed per connect attempt; once exhausted every attempt succeeds.
pub struct MockTransport {
    plans: Mutex<VecDeque<ConnectPlan>>,
    connects: AtomicUsize,
    bot: Arc<MockBot>,
    sink: Sink,
}

impl MockTransport {
    pub fn new(plans: Vec<ConnectPlan>) -> (Arc<Self>, mpsc::UnboundedReceiver<SentRecord>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            plans: Mutex::new(plans.into()),
            connects: AtomicUsize::new(0),
            bot: Arc::new(MockBot { sent_tx }),
            sink: Arc::new(Mutex::new(None)),
        });
        (transport, sent_rx)
    }

    pub fn connect_attempts(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Delivers an inbound update. False when no stream is open.
    pub async fn inject(&self, message: Message) -> bool {
        let sink = self.sink.lock().unwrap().clone();
        match sink {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        }
    }

    /// Simulates the polling task dying: the inbound stream ends.
    pub fn kill_stream(&self) {
        self.sink.lock().unwrap().take();
    }
}

#[async_trait]
impl TransportConnector for MockTransport {
    async fn connect(&self, _credential: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectPlan::Succeed);
        match plan {
            ConnectPlan::Succeed => Ok(Box::new(MockConnection {
                bot: self.bot.clone(),
                sink: self.sink.clone(),
            })),
            ConnectPlan::Timeout => Err(TransportError::Timeout(Duration::from_millis(1))),
            ConnectPlan::Reject => Err(TransportError::Rejected("401 Unauthorized".into())),
            ConnectPlan::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Other("hang finished".into()))
            }
        }
    }
}

struct MockConnection {
    bot: Arc<MockBot>,
    sink: Sink,
}

#[async_trait]
impl Connection for MockConnection {
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

/// Replies `echo: <text>` to text, fails on `/fail`, panics on a bare `/boom`, stops on other
/// commands.
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, _ctx: &BotContext, message: &Message) -> dbot_core::Result<HandlerResponse> {
        if message.is_command_named("fail") {
            return Err(HandlerError::State("database exploded".into()).into());
        }
        if message.is_command_named("boom") {
            let parts: Vec<&str> = message.content.split_whitespace().collect();
            return Ok(HandlerResponse::Reply(parts[1].to_string()));
        }
        if message.is_command() {
            return Ok(HandlerResponse::Stop);
        }
        Ok(HandlerResponse::Reply(format!("echo: {}", message.content)))
    }
}

pub struct EchoPersonality {
    pub fail_setup: bool,
}

#[async_trait]
impl BotPersonality for EchoPersonality {
    async fn setup(&self, ctx: &mut BotContext) -> dbot_core::Result<()> {
        if self.fail_setup {
            return Err(DbotError::Config("admin_chat_id is not a number".into()));
        }
        ctx.admin_chat_id = ctx.extra("admin_chat_id").and_then(|v| v.parse().ok());
        Ok(())
    }

    fn get_handlers(&self, _ctx: &BotContext) -> Vec<Arc<dyn Handler>> {
        vec![Arc::new(EchoHandler)]
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        connect_timeout: Duration::from_millis(100),
    }
}

pub fn worker_config(name: &str, admin_ids: Vec<i64>) -> WorkerConfig {
    WorkerConfig {
        name: name.to_string(),
        credential: "12345:secret".to_string(),
        admin_ids,
        extra: BTreeMap::new(),
    }
}

pub fn echo_worker(name: &str, transport: Arc<MockTransport>) -> BotWorker {
    BotWorker::new(
        worker_config(name, vec![999]),
        Arc::new(EchoPersonality { fail_setup: false }),
        transport,
        fast_retry(),
    )
}

pub fn message(user_id: i64, content: &str) -> Message {
    Message {
        id: "1".to_string(),
        user: User {
            id: user_id,
            username: Some("tester".to_string()),
            first_name: Some("Test".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: user_id,
            chat_type: "private".to_string(),
        },
        content: content.to_string(),
        kind: Message::kind_of_text(content),
        created_at: Utc::now(),
    }
}

/// Polls `check` every 10ms for up to 2s.
pub async fn wait_until<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Next recorded send within 2s.
pub async fn next_sent(rx: &mut mpsc::UnboundedReceiver<SentRecord>) -> SentRecord {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a send")
        .expect("bot dropped")
}
