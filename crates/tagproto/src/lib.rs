//! # Tagproto
//!
//! Protocol bindings in the shape the IDL compiler emits them: plain wire
//! types, one async interface per protocol for servers, a function that turns
//! an implementation into a registrable [`tagrpc::Protocol`] and a client stub
//! that calls the same methods over any [`tagrpc::GenericClient`].
//!
//! Only the types the bound protocols reach are included. Records carry the
//! fields this crate reads; keys a peer sends beyond those are ignored on
//! decode.

pub mod chat1;
pub mod gregor1;
pub mod keybase1;
