// ── Attribute kinds ──
//
// The closed set of value shapes the canonical attribute model supports.
// Every native field class of every backend generation maps onto exactly
// one of these; anything unrecognized lands on `Unsupported`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The closed tag identifying which decode/encode rule and native shape
/// an attribute uses. Fixed at attribute construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum AttributeKind {
    /// True/false, possibly option-set-backed with display labels.
    Boolean,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Exact decimal, kept textually exact.
    Decimal,
    /// Double-precision float.
    Float,
    /// Currency value, kept textually exact.
    Money,
    /// UTC timestamp.
    DateTime,
    /// Single-line text.
    Text,
    /// Multi-line text.
    Memo,
    /// Single-valued option set (numeric code + display label).
    OptionSet,
    /// Reference to one record of a known type.
    Lookup,
    /// Owner reference (user or team).
    Owner,
    /// Reference that may target more than one entity type.
    Customer,
    /// Ordered reference list; only the first element is significant.
    PartyList,
    /// Reference to an entity type by name rather than by record.
    EntityName,
    /// Primary-key identifier.
    Key,
    /// Fallback for native classes this model does not recognize.
    Unsupported,
}

impl AttributeKind {
    /// Whether this kind carries a record reference (shares the
    /// [`Reference`](super::value::Reference) value shape).
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Lookup | Self::Owner | Self::Customer)
    }

    /// Whether this kind is backed by an option set.
    pub fn is_option_set(self) -> bool {
        matches!(self, Self::OptionSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_and_parse_round_trip() {
        for kind in [
            AttributeKind::Boolean,
            AttributeKind::OptionSet,
            AttributeKind::PartyList,
            AttributeKind::Unsupported,
        ] {
            let text = kind.to_string();
            assert_eq!(AttributeKind::from_str(&text), Ok(kind));
        }
    }

    #[test]
    fn reference_family() {
        assert!(AttributeKind::Lookup.is_reference());
        assert!(AttributeKind::Owner.is_reference());
        assert!(AttributeKind::Customer.is_reference());
        assert!(!AttributeKind::PartyList.is_reference());
    }
}
