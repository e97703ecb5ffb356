//! # Deep Copy
//!
//! [`DeepCopy`] produces a value that shares no storage with its source:
//! owned collections get fresh backing buffers, absent optionals stay absent,
//! nested records and variants are copied recursively.
//!
//! Shared handles (`Rc`, `Arc`) have no impl, so a record that
//! derives its copy through the generator macros cannot alias another value.

use std::collections::HashMap;
use std::hash::Hash;

use rmpv::Value;

use crate::wire::Bytes;

pub trait DeepCopy {
    fn deep_copy(&self) -> Self;
}

macro_rules! for_each_plain {
    ($m:ident) => {
        $m!(bool);
        $m!(u8);
        $m!(u16);
        $m!(u32);
        $m!(u64);
        $m!(usize);
        $m!(i8);
        $m!(i16);
        $m!(i32);
        $m!(i64);
        $m!(f32);
        $m!(f64);
        $m!(());
    };
}

macro_rules! copy_plain {
    ($ty:ty) => {
        impl DeepCopy for $ty {
            #[inline]
            fn deep_copy(&self) -> Self {
                *self
            }
        }
    };
}

for_each_plain!(copy_plain);

impl DeepCopy for String {
    fn deep_copy(&self) -> Self {
        self.as_str().to_owned()
    }
}

impl DeepCopy for Bytes {
    fn deep_copy(&self) -> Self {
        Bytes(self.0.as_slice().to_vec())
    }
}

impl DeepCopy for Value {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

impl<T: DeepCopy> DeepCopy for Option<T> {
    fn deep_copy(&self) -> Self {
        self.as_ref().map(DeepCopy::deep_copy)
    }
}

impl<T: DeepCopy> DeepCopy for Box<T> {
    fn deep_copy(&self) -> Self {
        Box::new((**self).deep_copy())
    }
}

impl<T: DeepCopy> DeepCopy for Vec<T> {
    fn deep_copy(&self) -> Self {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.iter().map(DeepCopy::deep_copy));
        out
    }
}

impl<K, V> DeepCopy for HashMap<K, V>
where
    K: DeepCopy + Eq + Hash,
    V: DeepCopy,
{
    fn deep_copy(&self) -> Self {
        self.iter()
            .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
            .collect()
    }
}
