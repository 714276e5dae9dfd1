//! One bot instance: lifecycle state machine, connect with retry, dispatch loop and error boundary.
//!
//! ```text
//! Stopped -> Starting -> Running -> Stopping -> Stopped
//!               |
//!               +-> Stopped (start failed)
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dbot_core::{Bot, BotContext, HandlerResponse, Message, SendOptions, UpdateKind};
use futures::FutureExt;
use handler_chain::HandlerChain;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, RuntimeError};
use crate::metrics::{Counters, MeteredBot, WorkerMetrics};
use crate::personality::BotPersonality;
use crate::retry::{connect_with_retry, RetryPolicy};
use crate::transport::{Connection, TransportConnector};

/// Inbound updates buffered between the transport and the dispatch loop.
const UPDATE_BUFFER: usize = 256;
/// How long `stop` waits for the dispatch loop to drain before aborting it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Error text forwarded to admins is cut to this many characters.
const ADMIN_ERROR_PREVIEW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum WorkerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// State shared with the dispatch task so it can report a dead stream.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Moves `from -> to` only if the current state is `from`.
    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Static configuration of one bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub name: String,
    pub credential: String,
    pub admin_ids: Vec<i64>,
    pub extra: BTreeMap<String, String>,
}

pub struct BotWorker {
    config: WorkerConfig,
    personality: Arc<dyn BotPersonality>,
    connector: Arc<dyn TransportConnector>,
    retry: RetryPolicy,
    state: Arc<StateCell>,
    counters: Arc<Counters>,
    start_time: Option<DateTime<Utc>>,
    connection: Option<Box<dyn Connection>>,
    bot: Option<Arc<dyn Bot>>,
    dispatch: Option<JoinHandle<()>>,
}

impl BotWorker {
    pub fn new(
        config: WorkerConfig,
        personality: Arc<dyn BotPersonality>,
        connector: Arc<dyn TransportConnector>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            personality,
            connector,
            retry,
            state: Arc::new(StateCell::new(WorkerState::Stopped)),
            counters: Arc::new(Counters::default()),
            start_time: None,
            connection: None,
            bot: None,
            dispatch: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Connects (with retry), runs the personality's setup, builds the handler chain and starts
    /// dispatching. A no-op with a warning when already running.
    #[instrument(skip(self), fields(bot = %self.config.name))]
    pub async fn start(&mut self) -> Result<()> {
        match self.state() {
            WorkerState::Stopped => {}
            WorkerState::Running => {
                warn!(bot = %self.config.name, "Bot already running");
                return Ok(());
            }
            other => {
                warn!(bot = %self.config.name, state = ?other, "Bot is in transition; start ignored");
                return Ok(());
            }
        }

        self.release().await;
        self.state.set(WorkerState::Starting);
        info!(bot = %self.config.name, "Starting bot");

        match self.launch().await {
            Ok(()) => {
                info!(bot = %self.config.name, "Bot running");
                Ok(())
            }
            Err(e) => {
                self.state.set(WorkerState::Stopped);
                error!(bot = %self.config.name, error = %e, "Bot failed to start");
                Err(e)
            }
        }
    }

    async fn launch(&mut self) -> Result<()> {
        let name = self.config.name.clone();
        let mut connection = connect_with_retry(
            self.connector.as_ref(),
            &self.config.credential,
            &self.retry,
            &name,
        )
        .await
        .map_err(|source| RuntimeError::StartFailed {
            name: name.clone(),
            source,
        })?;

        let bot: Arc<dyn Bot> = Arc::new(MeteredBot::new(connection.bot(), self.counters.clone()));
        let mut ctx = BotContext::new(
            name.clone(),
            self.config.admin_ids.clone(),
            self.config.extra.clone(),
            bot.clone(),
        );

        if let Err(e) = self.personality.setup(&mut ctx).await {
            close_quietly(&name, connection.as_mut()).await;
            return Err(RuntimeError::Setup {
                name,
                message: e.to_string(),
            });
        }

        let chain = HandlerChain::from_handlers(self.personality.get_handlers(&ctx));
        debug!(bot = %name, handlers = chain.len(), "Handlers registered");

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        if let Err(source) = connection.open(tx).await {
            close_quietly(&name, connection.as_mut()).await;
            return Err(RuntimeError::StartFailed { name, source });
        }

        self.state.set(WorkerState::Running);
        self.start_time = Some(Utc::now());
        self.bot = Some(bot);
        self.connection = Some(connection);
        self.dispatch = Some(tokio::spawn(dispatch_loop(
            Arc::new(ctx),
            Arc::new(chain),
            rx,
            self.counters.clone(),
            self.state.clone(),
        )));
        Ok(())
    }

    /// Closes the stream and the transport. A no-op with a warning when already stopped.
    #[instrument(skip(self), fields(bot = %self.config.name))]
    pub async fn stop(&mut self) {
        if self.state() == WorkerState::Stopped {
            warn!(bot = %self.config.name, "Bot not running");
            return;
        }
        self.state.set(WorkerState::Stopping);
        info!(bot = %self.config.name, "Stopping bot");

        self.release().await;
        self.start_time = None;
        self.state.set(WorkerState::Stopped);
        info!(bot = %self.config.name, "Bot stopped");
    }

    /// Tears down whatever a previous run left behind: connection, dispatch task, outbound handle.
    async fn release(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            close_quietly(&self.config.name, connection.as_mut()).await;
        }
        if let Some(mut handle) = self.dispatch.take() {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut handle).await.is_err() {
                warn!(bot = %self.config.name, "Dispatch loop did not drain in time; aborting");
                handle.abort();
            }
        }
        self.bot = None;
    }

    /// Sends a message through this bot. `Ok(false)` when the transport refused it.
    pub async fn send(&self, chat_id: i64, text: &str, options: &SendOptions) -> Result<bool> {
        let bot = match (&self.bot, self.is_running()) {
            (Some(bot), true) => bot,
            _ => return Err(RuntimeError::NotRunning(self.config.name.clone())),
        };
        match bot.send(chat_id, text, options).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(bot = %self.config.name, chat_id, error = %e, "Send failed");
                Ok(false)
            }
        }
    }

    pub fn metrics(&self) -> WorkerMetrics {
        let state = self.state();
        let start_time = self.start_time.filter(|_| state == WorkerState::Running);
        WorkerMetrics {
            name: self.config.name.clone(),
            state,
            is_running: state == WorkerState::Running,
            messages_processed: self.counters.messages_processed(),
            commands_processed: self.counters.commands_processed(),
            errors: self.counters.errors(),
            start_time,
            uptime_secs: start_time.map(|t| (Utc::now() - t).num_seconds()),
        }
    }
}

async fn close_quietly(name: &str, connection: &mut dyn Connection) {
    if let Err(e) = connection.close().await {
        warn!(bot = %name, error = %e, "Error while closing connection");
    }
}

/// Receives updates until the transport drops its sender. Each update runs on its own task.
async fn dispatch_loop(
    ctx: Arc<BotContext>,
    chain: Arc<HandlerChain>,
    mut rx: mpsc::Receiver<Message>,
    counters: Arc<Counters>,
    state: Arc<StateCell>,
) {
    while let Some(message) = rx.recv().await {
        let ctx = ctx.clone();
        let chain = chain.clone();
        let counters = counters.clone();
        tokio::spawn(async move {
            process_update(&ctx, &chain, &counters, message).await;
        });
    }

    if state.transition(WorkerState::Running, WorkerState::Stopped) {
        warn!(bot = %ctx.bot_name, "Inbound stream ended; bot marked stopped");
    } else {
        debug!(bot = %ctx.bot_name, "Dispatch loop finished");
    }
}

/// Runs the chain for one update. Handler errors and panics stop here: counted, logged, reported
/// to admins.
async fn process_update(
    ctx: &BotContext,
    chain: &HandlerChain,
    counters: &Counters,
    message: Message,
) {
    if message.kind == UpdateKind::Command {
        counters.record_command();
    }
    debug!(
        bot = %ctx.bot_name,
        user_id = message.user.id,
        chat_id = message.chat.id,
        kind = ?message.kind,
        "Received update"
    );

    let outcome = match AssertUnwindSafe(chain.handle(ctx, &message))
        .catch_unwind()
        .await
    {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(panic) => Err(format!("handler panicked: {}", panic_message(panic.as_ref()))),
    };

    match outcome {
        Ok(HandlerResponse::Reply(text)) => {
            if let Err(e) = ctx
                .bot()
                .send(message.chat.id, &text, &SendOptions::plain())
                .await
            {
                counters.record_error();
                error!(bot = %ctx.bot_name, chat_id = message.chat.id, error = %e, "Failed to send reply");
            }
        }
        Ok(_) => {}
        Err(e) => {
            counters.record_error();
            error!(
                bot = %ctx.bot_name,
                user_id = message.user.id,
                error = %e,
                "Handler failed"
            );
            let preview: String = e.chars().take(ADMIN_ERROR_PREVIEW).collect();
            ctx.notify_admins(&format!("⚠️ Error in {}: {}", ctx.bot_name, preview))
                .await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
