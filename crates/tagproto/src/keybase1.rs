//! Common `keybase1` types.

tagpack::wire_newtype! {
    /// A user id, hex encoded.
    #[derive(Eq, Hash)]
    pub struct Uid(pub String);
}

impl Uid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

tagpack::wire_newtype! {
    #[derive(Eq, Hash)]
    pub struct DeviceId(pub String);
}

tagpack::wire_newtype! {
    #[derive(Eq, Hash)]
    pub struct TeamId(pub String);
}

tagpack::wire_newtype! {
    /// Milliseconds since the unix epoch.
    #[derive(Copy, Eq, Hash, PartialOrd, Ord)]
    pub struct Time(pub i64);
}

tagpack::wire_record! {
    #[derive(Default, Eq)]
    pub struct StringKvPair {
        pub key: String = "key",
        pub value: String = "value",
    }
}

tagpack::wire_enum! {
    pub enum TeamApplication {
        Kbfs = 1 => "KBFS",
        Chat = 2 => "CHAT",
        Saltpack = 3 => "SALTPACK",
        GitMetadata = 4 => "GIT_METADATA",
        SeitanInviteToken = 5 => "SEITAN_INVITE_TOKEN",
        StellarRelay = 6 => "STELLAR_RELAY",
        Kvstore = 7 => "KVSTORE",
    }
}
