//! # Identifier Types
//!
//! Strongly-typed identifiers for domain entities.
//!
//! Engine-issued identifiers ([`OfferId`], [`TransactionId`], [`EventId`]) are
//! UUID v4 based. Identifiers owned by external collaborators ([`UserId`],
//! [`PropertyId`]) are opaque strings.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::value_objects::ids::{OfferId, UserId};
//!
//! let offer_id = OfferId::new_v4();
//! let buyer = UserId::new("buyer-1");
//!
//! assert_ne!(offer_id, OfferId::new_v4());
//! assert_eq!(buyer.as_str(), "buyer-1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[inline]
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generates a new random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            #[inline]
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
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

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of an [`Offer`](crate::domain::entities::Offer).
    OfferId
);

uuid_id!(
    /// Unique identifier of a [`Transaction`](crate::domain::entities::Transaction).
    TransactionId
);

uuid_id!(
    /// Unique identifier of a domain event.
    EventId
);

string_id!(
    /// Identifier of a user (buyer or seller), issued by the identity provider.
    UserId
);

string_id!(
    /// Identifier of a listed property, issued by the listing service.
    PropertyId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(OfferId::new_v4(), OfferId::new_v4());
        assert_ne!(TransactionId::new_v4(), TransactionId::new_v4());
    }

    #[test]
    fn uuid_id_parses_from_display() {
        let id = OfferId::new_v4();
        let parsed: OfferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn uuid_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<OfferId>().is_err());
    }

    #[test]
    fn string_id_display() {
        let id = UserId::new("seller-7");
        assert_eq!(id.to_string(), "seller-7");
        assert_eq!(PropertyId::from("prop-1").as_str(), "prop-1");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = PropertyId::new("prop-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"prop-42\"");

        let uuid = Uuid::new_v4();
        let offer_id = OfferId::new(uuid);
        assert_eq!(
            serde_json::to_string(&offer_id).unwrap(),
            format!("\"{uuid}\"")
        );
    }
}
