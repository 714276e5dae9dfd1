//! teloxide-backed [`TransportConnector`]: validates the token with `get_me`, then long-polls
//! through a teloxide Dispatcher and forwards messages and callback queries as core messages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bot_runtime::{Connection, TransportConnector, TransportError};
use dbot_core::{Bot as CoreBot, Message as CoreMessage, ToCoreMessage};
use teloxide::dispatching::{ShutdownToken, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::{ApiError, RequestError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{TelegramCallbackWrapper, TelegramMessageWrapper};
use crate::bot_adapter::TelegramBotAdapter;

/// How long `close` waits for the dispatcher to finish in-flight updates.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Maps a teloxide request error to the retry classification.
pub fn classify(err: RequestError) -> TransportError {
    match err {
        RequestError::Api(ApiError::InvalidToken) => {
            TransportError::Rejected("Telegram rejected the bot token".to_string())
        }
        RequestError::Api(e) => TransportError::Rejected(e.to_string()),
        RequestError::Network(e) if e.is_timeout() => TransportError::Timeout(Duration::ZERO),
        other => TransportError::Other(other.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelegramConnector {
    api_url: Option<reqwest::Url>,
}

impl TelegramConnector {
    pub fn new(api_url: Option<reqwest::Url>) -> Self {
        Self { api_url }
    }
}

#[async_trait]
impl TransportConnector for TelegramConnector {
    #[instrument(skip_all)]
    async fn connect(&self, credential: &str) -> Result<Box<dyn Connection>, TransportError> {
        let mut bot = teloxide::Bot::new(credential);
        if let Some(url) = &self.api_url {
            bot = bot.set_api_url(url.clone());
        }
        let me = bot.get_me().await.map_err(classify)?;
        info!(
            username = ?me.user.username,
            bot_id = me.user.id.0,
            "Telegram token accepted"
        );
        Ok(Box::new(TelegramConnection {
            bot,
            polling: None,
        }))
    }
}

struct Polling {
    token: ShutdownToken,
    handle: JoinHandle<()>,
}

pub struct TelegramConnection {
    bot: teloxide::Bot,
    polling: Option<Polling>,
}

#[async_trait]
impl Connection for TelegramConnection {
    fn bot(&self) -> Arc<dyn CoreBot> {
        Arc::new(TelegramBotAdapter::new(self.bot.clone()))
    }

    async fn open(&mut self, sink: mpsc::Sender<CoreMessage>) -> Result<(), TransportError> {
        if self.polling.is_some() {
            return Err(TransportError::Other("connection already open".to_string()));
        }
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), update_handler())
            .dependencies(dptree::deps![sink])
            .build();
        let token = dispatcher.shutdown_token();
        let handle = tokio::spawn(async move {
            dispatcher.dispatch().await;
            debug!("Dispatcher exited");
        });
        self.polling = Some(Polling { token, handle });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(Polling { token, mut handle }) = self.polling.take() else {
            return Ok(());
        };
        match token.shutdown() {
            Ok(done) => {
                if tokio::time::timeout(SHUTDOWN_GRACE, done).await.is_err() {
                    warn!("Dispatcher shutdown timed out");
                }
            }
            Err(_) => debug!("Dispatcher was idle at shutdown"),
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
        Ok(())
    }
}

fn update_handler() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_message(
    msg: teloxide::types::Message,
    sink: mpsc::Sender<CoreMessage>,
) -> ResponseResult<()> {
    if msg.text().is_none() {
        debug!(chat_id = msg.chat.id.0, "Ignoring non-text message");
        return Ok(());
    }
    forward(&sink, TelegramMessageWrapper(&msg).to_core()).await;
    Ok(())
}

async fn on_callback(
    bot: teloxide::Bot,
    q: CallbackQuery,
    sink: mpsc::Sender<CoreMessage>,
) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }
    if q.data.is_none() {
        return Ok(());
    }
    forward(&sink, TelegramCallbackWrapper(&q).to_core()).await;
    Ok(())
}

async fn forward(sink: &mpsc::Sender<CoreMessage>, message: CoreMessage) {
    if sink.send(message).await.is_err() {
        warn!("Worker no longer receiving; update dropped");
    }
}
