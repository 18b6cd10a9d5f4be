//! Strongly-typed shard indices.
//!
//! Following `TigerStyle`: explicit types prevent bugs from mixing up a
//! database index with a table index. Both render zero-padded, which is the
//! form the data-access layer uses to build physical resource names.

use std::fmt;

/// Macro to generate strongly-typed index wrappers.
///
/// Each index type wraps a u32 and provides:
/// - Type safety (can't pass a `TbIndex` where a `DbIndex` is expected)
/// - Zero-padded `Display` at a fixed width
/// - Zero-cost abstraction (same as raw u32)
macro_rules! define_index {
    ($name:ident, $prefix:expr, $width:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Width of the zero-padded rendering.
            pub const WIDTH: usize = $width;

            /// Creates a new index from a raw u32 value.
            #[inline]
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Returns the raw u32 value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }

            /// Returns the zero-padded rendering used for physical names.
            #[must_use]
            pub fn padded(self) -> String {
                self.to_string()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:0width$}", self.0, width = Self::WIDTH)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for u32 {
            fn from(index: $name) -> Self {
                index.get()
            }
        }
    };
}

define_index!(DbIndex, "db", 2, "Index of a physical database, rendered with 2 digits.");
define_index!(TbIndex, "tb", 3, "Index of a physical table within a database, rendered with 3 digits.");
