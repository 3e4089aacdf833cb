//! Strongly typed identifier wrappers.
//!
//! Integer IDs are `Copy + Ord + Hash` so they can be used as map keys and
//! sorted collection elements without ceremony.  `VehicleId` ordering is
//! significant: the coordinator breaks proposal ties by lowest vehicle id.
//!
//! `TaskId` is the one string-backed ID.  Tasks are minted by the coordinator
//! and travel over the wire, so they carry a short random token rather than
//! a dense index.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
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

typed_id! {
    /// Roster identifier of a vehicle.  Appears verbatim in bus topics
    /// (`vehicle/{id}/...`) and in every protocol message.
    pub struct VehicleId(u32);
}

typed_id! {
    /// Dense index of a graph node inside a built `NetworkGraph`.
    /// Only meaningful for the graph that produced it; names cross process
    /// boundaries, indices never do.
    pub struct NodeIdx(u32);
}

typed_id! {
    /// Index of a directed edge in CSR order.
    pub struct EdgeIdx(u32);
}

// ── TaskId ────────────────────────────────────────────────────────────────────

/// Identifier of one negotiation round's task.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TaskId(String);

impl TaskId {
    /// Length of the random token minted by [`TaskId::fresh`].
    pub const TOKEN_LEN: usize = 8;

    /// Mint a new task id: the first eight hex digits of a v4 UUID.
    pub fn fresh() -> Self {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(Self::TOKEN_LEN);
        TaskId(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_owned())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
