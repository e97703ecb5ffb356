//! # Message Frames
//!
//! The msgpack-rpc envelope. Every message is a msgpack array led by its type:
//!
//! ```text
//! [0, seqid, method, params]        request
//! [1, seqid, error, result]         response (error is nil on success)
//! [2, method, params]               notification
//! [3, seqid, method]                cancel an in-flight request
//! ```
//!
//! ## Invariants
//! - **Panic Safety**: all decoding paths return `Result`, never panicking on
//!   unknown data.
//! - **Forward Compatibility**: trailing array elements beyond the ones a type
//!   defines are ignored.

use tagpack::Value;

use crate::error::Error;
use crate::error::Result;

pub type SeqId = u32;

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;
const NOTIFY: u64 = 2;
const CANCEL: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        seqid: SeqId,
        method: String,
        params: Value,
    },
    Response {
        seqid: SeqId,
        error: Option<Value>,
        result: Value,
    },
    Notify {
        method: String,
        params: Value,
    },
    Cancel {
        seqid: SeqId,
        method: String,
    },
}

impl Message {
    pub fn to_value(&self) -> Value {
        let items = match self {
            Self::Request {
                seqid,
                method,
                params,
            } => vec![
                Value::from(REQUEST),
                Value::from(*seqid),
                Value::from(method.as_str()),
                params.clone(),
            ],
            Self::Response {
                seqid,
                error,
                result,
            } => vec![
                Value::from(RESPONSE),
                Value::from(*seqid),
                error.clone().unwrap_or(Value::Nil),
                result.clone(),
            ],
            Self::Notify { method, params } => vec![
                Value::from(NOTIFY),
                Value::from(method.as_str()),
                params.clone(),
            ],
            Self::Cancel { seqid, method } => vec![
                Value::from(CANCEL),
                Value::from(*seqid),
                Value::from(method.as_str()),
            ],
        };
        Value::Array(items)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(Error::Malformed("message is not an array".into()));
        };
        let mut items = items.into_iter();
        let kind = items
            .next()
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::Malformed("missing message type".into()))?;

        match kind {
            REQUEST => Ok(Self::Request {
                seqid: seqid(items.next())?,
                method: method(items.next())?,
                params: items.next().unwrap_or(Value::Nil),
            }),
            RESPONSE => {
                let seqid = seqid(items.next())?;
                let error = items.next().filter(|e| !e.is_nil());
                let result = items.next().unwrap_or(Value::Nil);
                Ok(Self::Response {
                    seqid,
                    error,
                    result,
                })
            }
            NOTIFY => Ok(Self::Notify {
                method: method(items.next())?,
                params: items.next().unwrap_or(Value::Nil),
            }),
            CANCEL => Ok(Self::Cancel {
                seqid: seqid(items.next())?,
                method: method(items.next())?,
            }),
            other => Err(Error::Malformed(format!("unknown message type {}", other))),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(tagpack::codec::value_to_vec(&self.to_value())?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = tagpack::codec::value_from_slice(bytes)
            .map_err(|e| Error::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Method name, for messages that carry one.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Notify { method, .. } | Self::Cancel { method, .. } => {
                Some(method)
            }
            Self::Response { .. } => None,
        }
    }
}

fn seqid(value: Option<Value>) -> Result<SeqId> {
    value
        .and_then(|v| v.as_u64())
        .and_then(|v| SeqId::try_from(v).ok())
        .ok_or_else(|| Error::Malformed("missing or invalid seqid".into()))
}

fn method(value: Option<Value>) -> Result<String> {
    match value {
        Some(Value::String(s)) => s
            .into_str()
            .ok_or_else(|| Error::Malformed("method name is not utf-8".into())),
        _ => Err(Error::Malformed("missing method name".into())),
    }
}
