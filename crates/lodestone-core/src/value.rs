use crate::path::DocumentPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, fmt};

///
/// Value
///
/// Tagged document value.
///
/// This is the single dynamic value representation used across the
/// provider: filter operands, cursor boundaries, aggregation results,
/// and raw document fields all flow through `Value`.
///
/// `Enum` is a provider-side token; the store never sees it. The
/// resolver rewrites enum operands to their `Text` form before a plan
/// reaches the store, and the deserializer restores the token when a
/// property is declared enum-typed.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    GeoPoint(GeoPoint),
    Reference(DocumentPath),
    Enum(String),
    List(Vec<Self>),
    Map(BTreeMap<String, Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_reference(&self) -> Option<&DocumentPath> {
        match self {
            Self::Reference(path) => Some(path),
            _ => None,
        }
    }

    /// Rank used to order values of different kinds.
    ///
    /// Cross-kind comparisons are total so the store's single-field
    /// ordering and cursor seeks behave deterministically on mixed data.
    #[must_use]
    pub const fn kind_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Double(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Text(_) | Self::Enum(_) => 4,
            Self::Bytes(_) => 5,
            Self::Reference(_) => 6,
            Self::GeoPoint(_) => 7,
            Self::List(_) => 8,
            Self::Map(_) => 9,
        }
    }

    /// Total order over values.
    ///
    /// Same-kind values compare naturally (numerics compare across
    /// int/double); different kinds compare by rank. Doubles use
    /// `total_cmp`, so NaN is ordered rather than poisoning the sort.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            (Self::Double(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a) | Self::Enum(a), Self::Text(b) | Self::Enum(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Reference(a), Self::Reference(b)) => a.to_string().cmp(&b.to_string()),
            (Self::GeoPoint(a), Self::GeoPoint(b)) => a
                .latitude
                .total_cmp(&b.latitude)
                .then(a.longitude.total_cmp(&b.longitude)),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Map(a), Self::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.compare(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// Equality under store comparison semantics (numeric widening).
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::GeoPoint(g) => write!(f, "({}, {})", g.latitude, g.longitude),
            Self::Reference(path) => write!(f, "ref({path})"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<DocumentPath> for Value {
    fn from(v: DocumentPath) -> Self {
        Self::Reference(v)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

///
/// GeoPoint
///
/// Store-native geographic coordinate pair.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_widens_across_int_and_double() {
        assert_eq!(Value::Int(3).compare(&Value::Double(3.0)), Ordering::Equal);
        assert_eq!(Value::Int(3).compare(&Value::Double(3.5)), Ordering::Less);
        assert!(Value::Int(4).same(&Value::Double(4.0)));
    }

    #[test]
    fn cross_kind_comparison_is_total_and_stable() {
        let null = Value::Null;
        let boolean = Value::Bool(true);
        let number = Value::Int(1);
        let text = Value::Text("a".into());

        assert_eq!(null.compare(&boolean), Ordering::Less);
        assert_eq!(boolean.compare(&number), Ordering::Less);
        assert_eq!(number.compare(&text), Ordering::Less);
        assert_eq!(text.compare(&null), Ordering::Greater);
    }

    #[test]
    fn enum_tokens_compare_as_text() {
        let token = Value::Enum("Electronics".into());
        let text = Value::Text("Electronics".into());
        assert!(token.same(&text));
    }

    #[test]
    fn list_comparison_is_elementwise_then_length() {
        let a = Value::from(vec![1i64, 2]);
        let b = Value::from(vec![1i64, 2, 3]);
        assert_eq!(a.compare(&b), Ordering::Less);
    }
}
