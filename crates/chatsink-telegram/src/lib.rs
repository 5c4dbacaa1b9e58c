//! Telegram adapter (teloxide).
//!
//! Implements the `chatsink-core` Provider port over Telegram long polling:
//! one `Bot` + `Dispatcher` per configured account.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use chatsink_core::{
    canonical::CanonicalUpdate,
    config::PlatformKind,
    errors::Error,
    provider::{stream_name, Provider},
    sink::UpdateSink,
    Result,
};

/// Telegram provider for one bot account.
pub struct TelegramProvider {
    stream: String,
    bot: Bot,
    sink: Arc<dyn UpdateSink>,
    /// Set by `stop()`; checked by `start()` under the same lock as the
    /// dispatcher token, so a stop that lands before the dispatcher exists
    /// still takes effect.
    stop_requested: CancellationToken,
    shutdown: Mutex<Option<ShutdownToken>>,
}

struct HandlerCtx {
    stream: String,
    sink: Arc<dyn UpdateSink>,
    /// Fatal handler errors (publish failures) are forwarded here and
    /// surfaced as the `start()` error.
    fatal: mpsc::Sender<Error>,
}

impl std::fmt::Debug for TelegramProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramProvider")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl TelegramProvider {
    /// `TELEGRAM_API_URL` points the bot at a self-hosted Bot API server.
    pub fn new(stream_key: &str, token: &str, sink: Arc<dyn UpdateSink>) -> Result<Self> {
        let mut bot = Bot::new(token);

        if let Some(api_url) = std::env::var("TELEGRAM_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            let url = api_url
                .parse()
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL {api_url:?}: {e}")))?;
            info!(%api_url, "using custom telegram api server");
            bot = bot.set_api_url(url);
        }

        Ok(Self {
            stream: stream_name(stream_key),
            bot,
            sink,
            stop_requested: CancellationToken::new(),
            shutdown: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Provider for TelegramProvider {
    fn platform(&self) -> PlatformKind {
        PlatformKind::Telegram
    }

    fn stream(&self) -> &str {
        &self.stream
    }

    async fn start(&self) -> Result<()> {
        info!(stream = %self.stream, "starting telegram provider");

        let (fatal_tx, mut fatal_rx) = mpsc::channel::<Error>(1);
        let ctx = Arc::new(HandlerCtx {
            stream: self.stream.clone(),
            sink: Arc::clone(&self.sink),
            fatal: fatal_tx,
        });

        let handler = Update::filter_message().endpoint(handle_message);
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![ctx])
            .build();

        {
            let mut guard = self.shutdown.lock().await;
            if self.stop_requested.is_cancelled() {
                return Ok(());
            }
            *guard = Some(dispatcher.shutdown_token());
        }

        let outcome = tokio::select! {
            _ = dispatcher.dispatch() => Ok(()),
            fatal = fatal_rx.recv() => Err(fatal
                .unwrap_or_else(|| Error::Platform("handler error channel closed".to_string()))),
        };

        // The dispatcher is gone either way; a later stop() must be a no-op.
        self.shutdown.lock().await.take();

        outcome
    }

    async fn stop(&self) -> Result<()> {
        self.stop_requested.cancel();
        let token = self.shutdown.lock().await.take();
        let Some(token) = token else {
            return Ok(());
        };

        info!(stream = %self.stream, "stopping telegram provider");
        if let Ok(done) = token.shutdown() {
            done.await;
        }
        Ok(())
    }
}

async fn handle_message(msg: Message, ctx: Arc<HandlerCtx>) -> ResponseResult<()> {
    let (user, text) = match (msg.from(), msg.text()) {
        (Some(user), Some(text)) => (user, text),
        _ => {
            warn!(stream = %ctx.stream, "dropping message with missing sender or text");
            return Ok(());
        }
    };

    let update = canonicalize(user.id.0, text, msg.date);
    match ctx.sink.publish(&ctx.stream, &update).await {
        Ok(()) => {
            info!(stream = %ctx.stream, user_id = %update.user_id, "published update");
        }
        Err(e) => {
            error!(stream = %ctx.stream, error = %e, "publish failed; shutting provider down");
            let _ = ctx.fatal.try_send(e);
        }
    }
    Ok(())
}

fn canonicalize(user_id: u64, text: &str, sent_at: DateTime<Utc>) -> CanonicalUpdate {
    CanonicalUpdate::new(format!("tg_{user_id}"), text, sent_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_user_id_carries_platform_prefix() {
        let sent_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let update = canonicalize(42, "hi", sent_at);

        assert_eq!(update.user_id, "tg_42");
        assert_eq!(update.text, "hi");
        assert_eq!(
            update.to_json().unwrap(),
            r#"{"user_id":"tg_42","text":"hi","sent_at":"2024-01-01T00:00:00Z"}"#
        );
    }
}
