//! Common `chat1` types.

use tagpack::Bytes;

use crate::keybase1;

tagpack::wire_newtype! {
    #[derive(Eq, Hash)]
    pub struct ConversationId(pub Bytes);
}

tagpack::wire_newtype! {
    #[derive(Eq, Hash)]
    pub struct TlfId(pub Bytes);
}

tagpack::wire_newtype! {
    #[derive(Eq, Hash)]
    pub struct OutboxId(pub Bytes);
}

tagpack::wire_newtype! {
    #[derive(Copy, Eq, Hash, PartialOrd, Ord)]
    pub struct MessageId(pub u32);
}

impl ConversationId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0.0
    }

    /// Lowercase hex, the form conversation ids take in logs and UI items.
    pub fn to_hex(&self) -> String {
        self.as_bytes().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl From<Vec<u8>> for ConversationId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes(bytes))
    }
}

tagpack::wire_enum! {
    pub enum ConversationStatus {
        Unfiled = 0 => "UNFILED",
        Favorite = 1 => "FAVORITE",
        Ignored = 2 => "IGNORED",
        Blocked = 3 => "BLOCKED",
        Muted = 4 => "MUTED",
        Reported = 5 => "REPORTED",
    }
}

tagpack::wire_enum! {
    pub enum ConversationMemberStatus {
        Active = 0 => "ACTIVE",
        Removed = 1 => "REMOVED",
        Left = 2 => "LEFT",
        Preview = 3 => "PREVIEW",
        Reset = 4 => "RESET",
        NeverJoined = 5 => "NEVER_JOINED",
    }
}

tagpack::wire_enum! {
    pub enum TeamType {
        None = 0 => "NONE",
        Simple = 1 => "SIMPLE",
        Complex = 2 => "COMPLEX",
    }
}

tagpack::wire_enum! {
    pub enum SyncInboxResType {
        Current = 0 => "CURRENT",
        Incremental = 1 => "INCREMENTAL",
        Clear = 2 => "CLEAR",
    }
}

tagpack::wire_record! {
    #[derive(Eq)]
    pub struct Expunge {
        pub upto: MessageId = "upto",
        pub basis: MessageId = "basis",
    }
}

tagpack::wire_record! {
    /// A message that has not been sent yet.
    pub struct OutboxRecord {
        pub outbox_id: OutboxId = "outboxID",
        pub conv_id: ConversationId = "convID",
        pub ctime: keybase1::Time = "ctime",
    }
}

tagpack::wire_record! {
    pub struct UnverifiedInboxUiItem {
        pub conv_id: String = "convID",
        pub tlf_id: String = "tlfID",
        pub name: String = "name",
        pub is_public: bool = "isPublic",
        pub status: ConversationStatus = "status",
        pub member_status: ConversationMemberStatus = "memberStatus",
        pub team_type: TeamType = "teamType",
    }
}
