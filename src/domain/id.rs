//! Identifier newtypes.
//!
//! Engine-generated identifiers are UUID v4 strings. User identifiers come
//! from the surrounding account system and are taken verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident) => {
        string_id!($(#[$meta])* $name);

        impl $name {
            /// Fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }
    };
}

generated_id!(
    /// Identifier of a monitored model.
    ModelId
);
generated_id!(
    /// Identifier of a drift market.
    MarketId
);
generated_id!(
    /// Identifier of a (market, user) position.
    PositionId
);
generated_id!(
    /// Identifier of a monitoring receipt.
    ReceiptId
);
generated_id!(
    /// Identifier of an audit transaction or bet record.
    EntryId
);
string_id!(
    /// Identifier of a user account, owned by the caller's account system.
    UserId
);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(MarketId::generate(), MarketId::generate());
        assert_ne!(ReceiptId::generate(), ReceiptId::generate());
    }

    #[test]
    fn user_id_keeps_external_value() {
        let user = UserId::new("user-42");
        assert_eq!(user.as_str(), "user-42");
        assert_eq!(user.to_string(), "user-42");
        assert_eq!(UserId::from("user-42"), user);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = MarketId::from("m-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m-1\"");
    }
}
