//! Runs a chat service and a frontend as two peers over an in-memory
//! connection. The frontend blocks a conversation; the service answers and
//! pushes a `NewChatActivity` notification back.
//!
//! Set `RUST_LOG=debug` to see the dispatch traffic.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use tagproto::chat1::notify::*;
use tagproto::chat1::*;
use tagproto::gregor1;
use tagproto::keybase1;
use tagrpc::CallContext;
use tagrpc::Dispatcher;
use tagrpc::Status;
use tagrun::DuplexChannelTransport;
use tagrun::Peer;
use tagrun::PeerConfig;

/// The service side: records blocked TLFs and tells the frontend about it.
struct ChatService {
    /// Set once the service's own peer exists.
    frontend: OnceLock<NotifyChatClient>,
}

#[async_trait]
impl BlockingInterface for ChatService {
    async fn block_conversations(&self, ctx: CallContext, arg: BlockConversationsArg) -> Result<(), Status> {
        info!(
            peer = ctx.peer().unwrap_or("?"),
            blocked = ?arg.tlf_ids_blocked,
            unblocked = ?arg.tlf_ids_unblocked,
            "Updating block list"
        );
        let activity = NewChatActivityArg {
            uid: keybase1::Uid("3b2a1c".into()),
            activity: ChatActivity::SetStatus(SetStatusInfo {
                conv_id: ConversationId::from(vec![0x01, 0x02, 0x03, 0x04]),
                status: ConversationStatus::Blocked,
            }),
            source: ChatActivitySource::Local,
        };
        let frontend = self
            .frontend
            .get()
            .ok_or_else(|| Status::generic("service is not connected yet"))?;
        frontend.new_chat_activity(&activity).await?;
        Ok(())
    }
}

/// The frontend side: forwards every activity to `main`.
struct Frontend {
    activities: mpsc::UnboundedSender<NewChatActivityArg>,
}

#[async_trait]
impl NotifyChatInterface for Frontend {
    async fn new_chat_activity(&self, _ctx: CallContext, arg: NewChatActivityArg) -> Result<(), Status> {
        self.activities
            .send(arg)
            .map_err(|_| Status::generic("frontend shut down"))
    }

    async fn chat_inbox_stale(&self, _ctx: CallContext, arg: ChatInboxStaleArg) -> Result<(), Status> {
        info!(uid = arg.uid.as_str(), "Inbox stale");
        Ok(())
    }

    async fn chat_threads_stale(&self, _ctx: CallContext, arg: ChatThreadsStaleArg) -> Result<(), Status> {
        info!(updates = arg.updates.len(), "Threads stale");
        Ok(())
    }

    async fn chat_typing_update(&self, _ctx: CallContext, arg: ChatTypingUpdateArg) -> Result<(), Status> {
        info!(convs = arg.typing_updates.len(), "Typing update");
        Ok(())
    }

    async fn chat_inbox_sync_started(&self, _ctx: CallContext, _arg: ChatInboxSyncStartedArg) -> Result<(), Status> {
        Ok(())
    }

    async fn chat_inbox_synced(&self, _ctx: CallContext, arg: ChatInboxSyncedArg) -> Result<(), Status> {
        info!(sync = ?arg.sync_res.discriminant(), "Inbox synced");
        Ok(())
    }

    async fn chat_left_conversation(&self, _ctx: CallContext, arg: ChatLeftConversationArg) -> Result<(), Status> {
        info!(conv = %arg.conv_id.to_hex(), "Left conversation");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tagrun::telemetry::try_init()?;

    let (frontend_end, service_end) = DuplexChannelTransport::pair();
    let (activities, mut received) = mpsc::unbounded_channel();

    let frontend_dispatcher = Dispatcher::builder()
        .register_with(notify_chat_protocol(Arc::new(Frontend { activities })))
        .build()?;
    let frontend = Peer::new(
        PeerConfig::from_env("frontend")?,
        Box::new(frontend_end),
        Arc::new(frontend_dispatcher),
    );

    let chat = Arc::new(ChatService {
        frontend: OnceLock::new(),
    });
    let service_dispatcher = Dispatcher::builder()
        .register_with(blocking_protocol(chat.clone()))
        .build()?;
    let service = Peer::new(
        PeerConfig::from_env("service")?,
        Box::new(service_end),
        Arc::new(service_dispatcher),
    );
    let _ = chat.frontend.set(NotifyChatClient::new(service.client()));

    let blocking = BlockingClient::new(frontend.client());
    let arg = BlockConversationsArg {
        uid: gregor1::Uid::from(vec![0xaa, 0xbb, 0xcc]),
        tlf_ids_blocked: vec!["a1b2".into()],
        tlf_ids_unblocked: vec![],
    };
    blocking.block_conversations(&arg).await?;
    info!("blockConversations returned");

    let activity = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("frontend stopped before any activity arrived"))?;
    info!(
        kind = ?activity.activity.discriminant()?,
        conv = ?activity.activity.conv_id().map(ConversationId::to_hex),
        "Frontend saw activity"
    );

    frontend.close();
    Ok(())
}
