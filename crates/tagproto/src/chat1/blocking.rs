//! # chat.1.blocking
//!
//! Lets a user hide conversations in whole TLFs and later show them again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tagrpc::CallContext;
use tagrpc::Client;
use tagrpc::Protocol;
use tagrpc::Status;

use crate::gregor1;

pub const PROTOCOL: &str = "chat.1.blocking";

tagpack::wire_record! {
    pub struct BlockConversationsArg {
        pub uid: gregor1::Uid = "uid",
        pub tlf_ids_blocked: Vec<String> = "tlfIDsBlocked",
        pub tlf_ids_unblocked: Vec<String> = "tlfIDsUnblocked",
    }
}

/// Server side of `chat.1.blocking`.
#[async_trait]
pub trait BlockingInterface: Send + Sync + 'static {
    async fn block_conversations(&self, ctx: CallContext, arg: BlockConversationsArg) -> Result<(), Status>;
}

/// Builds the `chat.1.blocking` method table around `handler`.
pub fn blocking_protocol<H: BlockingInterface>(handler: Arc<H>) -> tagrpc::Result<Protocol> {
    Protocol::builder(PROTOCOL)
        .call("blockConversations", move |ctx: CallContext, arg: BlockConversationsArg| {
            let handler = handler.clone();
            async move { handler.block_conversations(ctx, arg).await }
        })
        .build()
}

#[derive(Clone)]
pub struct BlockingClient {
    pub cli: Client,
}

impl BlockingClient {
    pub fn new(cli: Client) -> Self {
        Self { cli }
    }

    pub async fn block_conversations(&self, arg: &BlockConversationsArg) -> tagrpc::Result<()> {
        self.cli
            .call("chat.1.blocking.blockConversations", arg, Duration::ZERO)
            .await
    }

    /// Like [`Self::block_conversations`], giving up as soon as `cancel` resolves.
    pub async fn block_conversations_cancellable<C>(
        &self,
        arg: &BlockConversationsArg,
        cancel: C,
    ) -> tagrpc::Result<()>
    where
        C: Future<Output = ()>,
    {
        self.cli
            .call_cancellable("chat.1.blocking.blockConversations", arg, Duration::ZERO, cancel)
            .await
    }
}
