//! WeChat official-account integration.
//!
//! Inbound XML messages are verified ([`signature`]), parsed ([`message`])
//! and routed through an ordered chain of handlers ([`dispatcher`]). The
//! first handler that produces a reply wins; when none does the dispatcher
//! answers with an empty reply.

pub mod client;
pub mod dispatcher;
pub mod handlers;
pub mod ip;
pub mod message;
pub mod signature;

use thiserror::Error;

use crate::store::StoreError;

pub use dispatcher::{MessageDispatcher, MessageHandler};
pub use message::{Message, Reply};

/// Messaging errors.
#[derive(Debug, Error)]
pub enum WxError {
    /// The platform API failed or returned an error code.
    #[error("Messaging backend error: {0}")]
    Backend(String),

    #[error("Malformed message: {0}")]
    Parse(String),

    #[error("IP table error: {0}")]
    IpTable(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
