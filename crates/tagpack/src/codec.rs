//! Byte-level msgpack encoding of [`Wire`] values.

use rmpv::Value;

use crate::error::Error;
use crate::error::Result;
use crate::wire::Wire;

pub fn value_to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value).map_err(|e| Error::Codec(e.to_string()))?;
    Ok(buf)
}

/// Reads exactly one value; trailing bytes are an error.
pub fn value_from_slice(mut bytes: &[u8]) -> Result<Value> {
    let value = rmpv::decode::read_value(&mut bytes).map_err(|e| Error::Codec(e.to_string()))?;
    if !bytes.is_empty() {
        return Err(Error::Codec(format!("{} trailing bytes after value", bytes.len())));
    }
    Ok(value)
}

pub fn to_vec<T: Wire>(value: &T) -> Result<Vec<u8>> {
    value_to_vec(&value.to_wire())
}

pub fn from_slice<T: Wire>(bytes: &[u8]) -> Result<T> {
    T::from_wire(value_from_slice(bytes)?)
}
