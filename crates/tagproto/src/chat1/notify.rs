//! # chat.1.NotifyChat
//!
//! Notifications the chat service pushes to its frontends. Every method is
//! fire-and-forget: the sender never learns whether a handler ran or failed.
//!
//! `ChatActivity` binds the activity kinds frontends act on. Activities of
//! other kinds still decode, as `ChatActivity::Unknown`, so a newer service
//! does not break older listeners.

use std::sync::Arc;

use async_trait::async_trait;
use tagrpc::CallContext;
use tagrpc::Client;
use tagrpc::Protocol;
use tagrpc::Status;

use super::common::ConversationId;
use super::common::ConversationMemberStatus;
use super::common::ConversationStatus;
use super::common::Expunge;
use super::common::MessageId;
use super::common::OutboxRecord;
use super::common::SyncInboxResType;
use super::common::UnverifiedInboxUiItem;
use crate::keybase1;

pub const PROTOCOL: &str = "chat.1.NotifyChat";

// ============================================================================
//  ENUMS
// ============================================================================

tagpack::wire_enum! {
    pub enum ChatActivitySource {
        Local = 0 => "LOCAL",
        Remote = 1 => "REMOTE",
    }
}

tagpack::wire_enum! {
    pub enum ChatActivityType {
        Reserved = 0 => "RESERVED",
        IncomingMessage = 1 => "INCOMING_MESSAGE",
        ReadMessage = 2 => "READ_MESSAGE",
        NewConversation = 3 => "NEW_CONVERSATION",
        SetStatus = 4 => "SET_STATUS",
        FailedMessage = 5 => "FAILED_MESSAGE",
        MembersUpdate = 6 => "MEMBERS_UPDATE",
        SetAppNotificationSettings = 7 => "SET_APP_NOTIFICATION_SETTINGS",
        Teamtype = 8 => "TEAMTYPE",
        Expunge = 9 => "EXPUNGE",
        EphemeralPurge = 10 => "EPHEMERAL_PURGE",
        ReactionUpdate = 11 => "REACTION_UPDATE",
        MessagesUpdated = 12 => "MESSAGES_UPDATED",
    }
}

tagpack::wire_enum! {
    pub enum StaleUpdateType {
        Clear = 0 => "CLEAR",
        NewActivity = 1 => "NEWACTIVITY",
    }
}

// ============================================================================
//  ACTIVITY PAYLOADS
// ============================================================================

tagpack::wire_record! {
    pub struct IncomingMessage {
        pub conv_id: ConversationId = "convID",
        pub display_desktop_notification: bool = "displayDesktopNotification",
        pub desktop_notification_snippet: String = "desktopNotificationSnippet",
    }
}

tagpack::wire_record! {
    pub struct ReadMessageInfo {
        pub conv_id: ConversationId = "convID",
        pub msg_id: MessageId = "msgID",
    }
}

tagpack::wire_record! {
    pub struct NewConversationInfo {
        pub conv_id: ConversationId = "convID",
    }
}

tagpack::wire_record! {
    pub struct SetStatusInfo {
        pub conv_id: ConversationId = "convID",
        pub status: ConversationStatus = "status",
    }
}

tagpack::wire_record! {
    pub struct FailedMessageInfo {
        pub outbox_records: Vec<OutboxRecord> = "outboxRecords",
        pub is_ephemeral_purge: bool = "isEphemeralPurge",
    }
}

tagpack::wire_record! {
    pub struct MemberInfo {
        pub member: String = "member",
        pub status: ConversationMemberStatus = "status",
    }
}

tagpack::wire_record! {
    pub struct MembersUpdateInfo {
        pub conv_id: ConversationId = "convID",
        pub members: Vec<MemberInfo> = "members",
    }
}

tagpack::wire_record! {
    pub struct ExpungeInfo {
        pub conv_id: ConversationId = "convID",
        pub expunge: Expunge = "expunge",
    }
}

tagpack::wire_variant! {
    pub enum ChatActivity: ChatActivityType = "activityType" {
        IncomingMessage(IncomingMessage) = "incomingMessage",
        ReadMessage(ReadMessageInfo) = "readMessage",
        NewConversation(NewConversationInfo) = "newConversation",
        SetStatus(SetStatusInfo) = "setStatus",
        FailedMessage(FailedMessageInfo) = "failedMessage",
        MembersUpdate(MembersUpdateInfo) = "membersUpdate",
        Expunge(ExpungeInfo) = "expunge",
    }
}

impl ChatActivity {
    /// The conversation the activity is about, when it names exactly one.
    pub fn conv_id(&self) -> Option<&ConversationId> {
        match self {
            Self::IncomingMessage(info) => Some(&info.conv_id),
            Self::ReadMessage(info) => Some(&info.conv_id),
            Self::NewConversation(info) => Some(&info.conv_id),
            Self::SetStatus(info) => Some(&info.conv_id),
            Self::MembersUpdate(info) => Some(&info.conv_id),
            Self::Expunge(info) => Some(&info.conv_id),
            Self::FailedMessage(_) | Self::Unknown(_) => None,
        }
    }
}

// ============================================================================
//  SYNC RESULTS
// ============================================================================

tagpack::wire_record! {
    pub struct ChatSyncIncrementalConv {
        pub conv: UnverifiedInboxUiItem = "conv",
        pub should_unbox: bool = "shouldUnbox",
    }
}

tagpack::wire_record! {
    #[derive(Default)]
    pub struct ChatSyncIncrementalInfo {
        pub items: Vec<ChatSyncIncrementalConv> = "items",
        pub removals: Vec<String> = "removals",
    }
}

tagpack::wire_variant! {
    pub enum ChatSyncResult: SyncInboxResType = "syncType" {
        Current,
        Incremental(ChatSyncIncrementalInfo) = "incremental",
        Clear,
    }
}

// ============================================================================
//  TYPING AND STALENESS
// ============================================================================

tagpack::wire_record! {
    pub struct TyperInfo {
        pub uid: keybase1::Uid = "uid",
        pub username: String = "username",
        pub device_id: keybase1::DeviceId = "deviceID",
        pub device_name: String = "deviceName",
        pub device_type: String = "deviceType",
    }
}

tagpack::wire_record! {
    pub struct ConvTypingUpdate {
        pub conv_id: ConversationId = "convID",
        pub typers: Vec<TyperInfo> = "typers",
    }
}

tagpack::wire_record! {
    pub struct ConversationStaleUpdate {
        pub conv_id: ConversationId = "convID",
        pub update_type: StaleUpdateType = "updateType",
    }
}

// ============================================================================
//  ARGUMENTS
// ============================================================================

tagpack::wire_record! {
    pub struct NewChatActivityArg {
        pub uid: keybase1::Uid = "uid",
        pub activity: ChatActivity = "activity",
        pub source: ChatActivitySource = "source",
    }
}

tagpack::wire_record! {
    pub struct ChatInboxStaleArg {
        pub uid: keybase1::Uid = "uid",
    }
}

tagpack::wire_record! {
    pub struct ChatThreadsStaleArg {
        pub uid: keybase1::Uid = "uid",
        pub updates: Vec<ConversationStaleUpdate> = "updates",
    }
}

tagpack::wire_record! {
    pub struct ChatTypingUpdateArg {
        pub typing_updates: Vec<ConvTypingUpdate> = "typingUpdates",
    }
}

tagpack::wire_record! {
    pub struct ChatInboxSyncStartedArg {
        pub uid: keybase1::Uid = "uid",
    }
}

tagpack::wire_record! {
    pub struct ChatInboxSyncedArg {
        pub uid: keybase1::Uid = "uid",
        pub sync_res: ChatSyncResult = "syncRes",
    }
}

tagpack::wire_record! {
    pub struct ChatLeftConversationArg {
        pub uid: keybase1::Uid = "uid",
        pub conv_id: ConversationId = "convID",
    }
}

// ============================================================================
//  PROTOCOL
// ============================================================================

/// Server side of `chat.1.NotifyChat`.
#[async_trait]
pub trait NotifyChatInterface: Send + Sync + 'static {
    async fn new_chat_activity(&self, ctx: CallContext, arg: NewChatActivityArg) -> Result<(), Status>;
    async fn chat_inbox_stale(&self, ctx: CallContext, arg: ChatInboxStaleArg) -> Result<(), Status>;
    async fn chat_threads_stale(&self, ctx: CallContext, arg: ChatThreadsStaleArg) -> Result<(), Status>;
    async fn chat_typing_update(&self, ctx: CallContext, arg: ChatTypingUpdateArg) -> Result<(), Status>;
    async fn chat_inbox_sync_started(&self, ctx: CallContext, arg: ChatInboxSyncStartedArg) -> Result<(), Status>;
    async fn chat_inbox_synced(&self, ctx: CallContext, arg: ChatInboxSyncedArg) -> Result<(), Status>;
    async fn chat_left_conversation(&self, ctx: CallContext, arg: ChatLeftConversationArg) -> Result<(), Status>;
}

/// Registers one notify method that forwards to a `NotifyChatInterface` method.
macro_rules! forward {
    ($builder:expr, $handler:expr, $method:literal, $arg:ty, $func:ident) => {{
        let handler = $handler.clone();
        $builder.notify($method, move |ctx: CallContext, arg: $arg| {
            let handler = handler.clone();
            async move { handler.$func(ctx, arg).await }
        })
    }};
}

/// Builds the `chat.1.NotifyChat` method table around `handler`.
pub fn notify_chat_protocol<H: NotifyChatInterface>(handler: Arc<H>) -> tagrpc::Result<Protocol> {
    let builder = Protocol::builder(PROTOCOL);
    let builder = forward!(builder, handler, "NewChatActivity", NewChatActivityArg, new_chat_activity);
    let builder = forward!(builder, handler, "ChatInboxStale", ChatInboxStaleArg, chat_inbox_stale);
    let builder = forward!(builder, handler, "ChatThreadsStale", ChatThreadsStaleArg, chat_threads_stale);
    let builder = forward!(builder, handler, "ChatTypingUpdate", ChatTypingUpdateArg, chat_typing_update);
    let builder = forward!(builder, handler, "ChatInboxSyncStarted", ChatInboxSyncStartedArg, chat_inbox_sync_started);
    let builder = forward!(builder, handler, "ChatInboxSynced", ChatInboxSyncedArg, chat_inbox_synced);
    let builder = forward!(builder, handler, "ChatLeftConversation", ChatLeftConversationArg, chat_left_conversation);
    builder.build()
}

/// Sends `chat.1.NotifyChat` notifications. No method waits for the receiver.
#[derive(Clone)]
pub struct NotifyChatClient {
    pub cli: Client,
}

impl NotifyChatClient {
    pub fn new(cli: Client) -> Self {
        Self { cli }
    }

    pub async fn new_chat_activity(&self, arg: &NewChatActivityArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.NewChatActivity", arg).await
    }

    pub async fn chat_inbox_stale(&self, arg: &ChatInboxStaleArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatInboxStale", arg).await
    }

    pub async fn chat_threads_stale(&self, arg: &ChatThreadsStaleArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatThreadsStale", arg).await
    }

    pub async fn chat_typing_update(&self, arg: &ChatTypingUpdateArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatTypingUpdate", arg).await
    }

    pub async fn chat_inbox_sync_started(&self, arg: &ChatInboxSyncStartedArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatInboxSyncStarted", arg).await
    }

    pub async fn chat_inbox_synced(&self, arg: &ChatInboxSyncedArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatInboxSynced", arg).await
    }

    pub async fn chat_left_conversation(&self, arg: &ChatLeftConversationArg) -> tagrpc::Result<()> {
        self.cli.notify("chat.1.NotifyChat.ChatLeftConversation", arg).await
    }
}
