//! Chain-of-responsibility message routing.

use async_trait::async_trait;
use tracing::debug;

use super::WxError;
use super::message::{Message, Reply};

/// One link in the dispatch chain.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Reply to `message`, or `Ok(None)` to pass it down the chain.
    async fn handle(&self, message: &Message) -> Result<Option<Reply>, WxError>;
}

/// Runs handlers in registration order; the first reply wins.
#[derive(Default)]
pub struct MessageDispatcher {
    handlers: Vec<Box<dyn MessageHandler>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl MessageHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.register(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route `message`. Falls back to [`Reply::Empty`] when nothing matches.
    pub async fn dispatch(&self, message: &Message) -> Result<Reply, WxError> {
        for handler in &self.handlers {
            if let Some(reply) = handler.handle(message).await? {
                debug!(handler = handler.name(), from = message.source(), "message handled");
                return Ok(reply);
            }
        }
        debug!(from = message.source(), msg_type = %message.msg_type, "no handler matched");
        Ok(Reply::Empty)
    }
}

/// Whitespace-separated words of a text message whose first word,
/// lowercased, is `command`. `None` for other messages.
pub fn command_args<'a>(message: &'a Message, command: &str) -> Option<Vec<&'a str>> {
    let words: Vec<&str> = message.text()?.split_whitespace().collect();
    let first = words.first()?;
    first.eq_ignore_ascii_case(command).then_some(words)
}
