//! Strongly typed identifier wrappers.
//!
//! Two families live here:
//!
//! - **Dense indices** (`NodeId`, `EdgeId`, `SegmentIdx`) — `Copy` integer
//!   wrappers assigned by the graph builder and used to index SoA `Vec`s.
//! - **External keys** (`StationId`, `TripId`, `SegmentId`) — string ids that
//!   come from the input data.  Backed by `Arc<str>` so cloning one into an
//!   accumulator or report is a refcount bump, not an allocation.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID", equal to the inner type's `MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

/// Generate a cheap-to-clone string key backed by `Arc<str>`.
///
/// `Hash`/`Eq` delegate to the underlying `str`, so maps keyed by the wrapper
/// can be queried with a plain `&str` through `Borrow<str>`.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }
    };
}

typed_id! {
    /// Index of a network node (a merged segment endpoint).
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed arc in the CSR graph.  An undirected segment
    /// owns two arcs; a one-way segment owns one.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Dense index of a network segment, in insertion order.  Maps 1:1 to a
    /// [`SegmentId`] through the graph's segment table.
    pub struct SegmentIdx(u32);
}

string_id! {
    /// Stable identifier of a network segment, the unit of aggregation.
    pub struct SegmentId;
}

string_id! {
    /// Identifier of a docking station.
    pub struct StationId;
}

string_id! {
    /// Identifier of a single trip record.
    pub struct TripId;
}
