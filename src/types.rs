/// Core domain types for prefab entries, attribute values, and pip sizes.
use std::fmt;

use rust_decimal::Decimal;

/// Document-local identifier of an entry (the `&anchor` of a block).
/// Opaque: compared for equality only, never ordered or parsed as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(
    /// Anchor text without the leading `&`.
    pub String,
);

impl EntryId {
    /// Build an id from anchor text.
    pub fn new(anchor: impl Into<String>) -> Self {
        return Self(anchor.into());
    }
}

impl fmt::Display for EntryId {
    /// Write the anchor text as-is.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// A plain value with its lexical class preserved. Numbers stay as text so
/// the resolver can convert them exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Decimal literal such as `0.5`, `-1.25` or `1e-05`.
    Decimal(String),
    /// Integer literal such as `14` or `-3`.
    Integer(String),
    /// Empty value, `~` or `null`.
    Null,
    /// Anything else, including quoted numbers.
    Text(String),
}

impl Scalar {
    /// Raw text of the scalar. `Null` reads as the empty string.
    pub fn as_text(&self) -> &str {
        return match self {
            Scalar::Decimal(text) | Scalar::Integer(text) | Scalar::Text(text) => text,
            Scalar::Null => "",
        };
    }
}

/// Pointer to another entry, not yet dereferenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Set when the reference points into another asset file.
    pub asset_guid: Option<String>,
    /// The `fileID` of the referenced entry.
    pub target: EntryId,
}

impl Reference {
    /// Whether the target lives in the same document.
    pub const fn is_local(&self) -> bool {
        return self.asset_guid.is_none();
    }
}

/// An attribute value inside an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Ordered key/value pairs, block or flow style.
    Mapping(Vec<(String, Value)>),
    /// `{fileID: N}` style pointer.
    Reference(Reference),
    /// Plain or quoted scalar.
    Scalar(Scalar),
    /// Block or flow sequence.
    Sequence(Vec<Value>),
}

impl Value {
    /// Look up a key when this value is a mapping. First key wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let Value::Mapping(pairs) = self else {
            return None;
        };
        return pairs.iter().find(|(k, _)| return k == key).map(|(_, v)| return v);
    }

    /// Scalar payload, if this is a scalar.
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        return match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        };
    }

    /// Reference payload, if this is a reference.
    pub const fn as_reference(&self) -> Option<&Reference> {
        return match self {
            Value::Reference(reference) => Some(reference),
            _ => None,
        };
    }

    /// Items, if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        return match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        };
    }
}

/// Effective radar pip footprint of a marker: its local scale times its
/// parent's local scale, on the x and z axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipSize {
    /// Width factor.
    pub x: Decimal,
    /// Depth factor.
    pub z: Decimal,
}

impl fmt::Display for PipSize {
    /// Render as `x z` with the digits exactly as computed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{} {}", self.x, self.z);
    }
}
