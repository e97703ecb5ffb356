//! # chat1
//!
//! Chat protocol bindings: the common conversation types plus the
//! `chat.1.blocking` and `chat.1.NotifyChat` protocols.

pub mod blocking;
pub mod common;
pub mod notify;

pub use blocking::BlockConversationsArg;
pub use blocking::BlockingClient;
pub use blocking::BlockingInterface;
pub use blocking::blocking_protocol;
pub use common::*;
pub use notify::NotifyChatClient;
pub use notify::NotifyChatInterface;
pub use notify::notify_chat_protocol;
