//! Common `gregor1` types.

use tagpack::Bytes;

tagpack::wire_newtype! {
    /// A user id in its raw binary form.
    #[derive(Eq, Hash)]
    pub struct Uid(pub Bytes);
}

impl From<Vec<u8>> for Uid {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes(bytes))
    }
}
