//! Entities observed in a snapshot and their scalar attributes.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Well-known attribute names shared by the sources and the rule tables.
pub mod attr {
    /// Human readable title of the entity.
    pub const TITLE: &str = "title";
    /// Link to the entity on the provider's site.
    pub const LINK: &str = "link";
    /// Link to a thumbnail image.
    pub const IMAGE: &str = "image";
    /// Current price.
    pub const PRICE: &str = "price";
    /// Number of bids placed so far.
    pub const BIDS: &str = "bids";
    /// Raw "time left" text as displayed by the provider.
    pub const TIME_LEFT: &str = "time_left";
    /// Whether a buy-it-now option is offered.
    pub const BUY_IT_NOW: &str = "buy_it_now";
    /// Whether the entity ends within 24 hours.
    pub const ENDS_WITHIN_24H: &str = "ends_within_24h";
    /// Whether the entity ends within 1 hour.
    pub const ENDS_WITHIN_1H: &str = "ends_within_1h";
    /// Whether the provider shows the entity as concluded.
    pub const ENDED: &str = "ended";
    /// Start time of a bookable slot.
    pub const START_TIME: &str = "start_time";
}

/// The stable identity of an entity, unique within a snapshot and across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Creates a key from anything string-like.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for EntityKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// A single observable attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A boolean flag.
    Bool(bool),
    /// An integer count.
    Int(i64),
    /// A decimal amount.
    Float(f64),
    /// Free text.
    Text(String),
}

impl Scalar {
    /// Returns the value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x:.2}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// Attribute name to value, ordered so that serialized documents are stable.
pub type Attributes = BTreeMap<String, Scalar>;

/// One observed item from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identity of the entity.
    pub key: EntityKey,
    /// Source specific attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Entity {
    /// Creates an entity with no attributes.
    pub fn new(key: impl Into<EntityKey>) -> Self {
        Self { key: key.into(), attributes: Attributes::new() }
    }

    /// Adds or replaces an attribute, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Returns an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.attributes.get(name)
    }

    /// Returns true when the named attribute is a `true` boolean.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Scalar::as_bool).unwrap_or(false)
    }

    /// Returns the title attribute, if present.
    pub fn title(&self) -> Option<&str> {
        self.get(attr::TITLE).and_then(Scalar::as_text)
    }
}
