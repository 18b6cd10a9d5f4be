//! Routing keys.
//!
//! A routing key is whatever the calling collaborator extracted from the
//! request (commonly a stringified entity id). The router only needs its
//! canonical bytes. Integer ids are rendered in decimal so that `1001_u64`
//! and `"1001"` land on the same shard.

use std::borrow::Cow;

/// A value that can be routed to a shard.
pub trait RoutingKey {
    /// Returns the canonical bytes hashed onto the ring.
    fn routing_bytes(&self) -> Cow<'_, [u8]>;
}

impl RoutingKey for str {
    fn routing_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl RoutingKey for String {
    fn routing_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl RoutingKey for [u8] {
    fn routing_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl RoutingKey for Vec<u8> {
    fn routing_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl<T: RoutingKey + ?Sized> RoutingKey for &T {
    fn routing_bytes(&self) -> Cow<'_, [u8]> {
        (**self).routing_bytes()
    }
}

macro_rules! impl_integer_key {
    ($($ty:ty),*) => {
        $(
            impl RoutingKey for $ty {
                fn routing_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_string().into_bytes())
                }
            }
        )*
    };
}

impl_integer_key!(u16, u32, u64, u128, usize, i16, i32, i64, i128, isize);
