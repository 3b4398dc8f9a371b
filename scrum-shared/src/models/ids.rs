/// Typed identifiers for persisted entities
///
/// Every identifier wraps the BIGINT identity the store assigns on insert.
/// Keeping them as distinct types means a `TaskId` can never be handed to
/// an operation that expects a `UserId`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store identity
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store identity
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// User identifier
    UserId
);

entity_id!(
    /// Project identifier
    ProjectId
);

entity_id!(
    /// Task identifier
    TaskId
);

/// Collects raw identities for binding as a BIGINT[] parameter
pub(crate) fn raw_ids<I, T>(ids: I) -> Vec<i64>
where
    I: IntoIterator<Item = T>,
    T: Into<i64>,
{
    ids.into_iter().map(Into::into).collect()
}
