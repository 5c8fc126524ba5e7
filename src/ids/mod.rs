//! Typed hierarchical resource identifiers
//!
//! Resources are named by `/`-delimited paths such as
//! `/subscriptions/{id}/resourceGroups/{rg}/providers/Microsoft.KeyVault/vaults/{name}`.
//! Each identifier type declares its segment table once via
//! [`ResourceId::segments`]; [`parse`] and [`render`] both walk that table so
//! the two directions can't drift apart.
//!
//! # Parsing modes
//!
//! - strict ([`ResourceId::parse`]) - for user input, literals must match exactly
//! - lenient ([`ResourceId::parse_insensitively`]) - for values returned by the
//!   API, literals match case-insensitively while user values keep their casing
//!
//! # Example
//!
//! ```
//! use arm_core::ids::{KeyVaultId, ResourceId};
//!
//! let id = KeyVaultId::parse(
//!     "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1",
//! ).unwrap();
//! assert_eq!(id.vault_name(), "kv1");
//! ```

use std::fmt;

/// Implements `Display`, `FromStr` and serde support in terms of the segment table
macro_rules! resource_id_impls {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::ids::render(self))
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::ids::ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as $crate::ids::ResourceId>::parse(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        // Serialized identifiers come back from the API, so accept any casing of the literals
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                <$ty as $crate::ids::ResourceId>::parse_insensitively(&raw)
                    .map_err(serde::de::Error::custom)
            }
        }
    };
}

mod keyvault;
mod network;
mod parser;
mod segment;
mod storage;
mod subscription;
mod widget;

pub use keyvault::{DeletedVaultId, KeyVaultId};
pub use network::{SubnetId, VirtualNetworkId};
pub use parser::{parse, parse_segments, render, validate, ParseError, ParseErrorKind, Parsed, Validation};
pub use segment::{expected_shape, Segment, SegmentKind};
pub use storage::StorageAccountId;
pub use subscription::{ResourceGroupId, SubscriptionId};
pub use widget::WidgetId;

/// A resource identifier type with a fixed segment shape
pub trait ResourceId:
    Sized + Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static
{
    /// Human readable name of the identifier type, used in messages
    const DESCRIPTION: &'static str;

    /// The segment table, in path order
    fn segments() -> &'static [Segment];

    /// Build the identifier from the values captured by the parser
    fn from_parsed(parsed: &Parsed) -> Result<Self, ParseErrorKind>;

    /// Values of the value segments, in path order
    fn values(&self) -> Vec<&str>;

    /// Parse user input; literals must match exactly
    fn parse(input: &str) -> Result<Self, ParseError> {
        parse(input, false)
    }

    /// Parse system-sourced input; literals match regardless of case
    fn parse_insensitively(input: &str) -> Result<Self, ParseError> {
        parse(input, true)
    }

    /// Canonical path form
    fn id(&self) -> String {
        render(self)
    }

    /// e.g. `Key Vault (subscriptionId: "..", resourceGroupName: "..", vaultName: "..")`
    fn describe(&self) -> String {
        let parts: Vec<String> = Self::segments()
            .iter()
            .filter(|s| s.is_value())
            .zip(self.values())
            .map(|(segment, value)| format!("{}: {:?}", segment.name, value))
            .collect();
        format!("{} ({})", Self::DESCRIPTION, parts.join(", "))
    }
}

/// An identifier owned by a resource group, under a provider resource type.
///
/// Types implementing this can be cached and listed by resource type.
pub trait ScopedResource: ResourceId {
    /// Provider resource type, e.g. `Microsoft.KeyVault/vaults`
    const RESOURCE_TYPE: &'static str;

    fn subscription_id(&self) -> &str;

    fn resource_group_name(&self) -> &str;

    fn resource_group_id(&self) -> ResourceGroupId {
        ResourceGroupId::new(self.subscription_id(), self.resource_group_name())
    }
}
