//! Identity and field value types.

use std::fmt;

use rkyv::Archive;

/// Identity of a record within its storage scope.
///
/// Records along one inheritance chain share the same identity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Identity(pub u64);

impl Identity {
    /// Raw identity value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Big-endian encoding used in storage keys.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Identity {
    fn from(v: u64) -> Self {
        Identity(v)
    }
}

/// A field value.
///
/// Relation fields hold [`Value::Ref`] / [`Value::Null`] (single-valued) or
/// [`Value::RefList`] (multi-valued). Everything else is opaque to the engine.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "ValueRepr", into = "ValueRepr")]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Reference to a single record.
    Ref(Identity),
    /// References to several records of one type.
    RefList(Vec<Identity>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Falsy values are never used for auto-find lookups.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Ref(_) => true,
            Value::RefList(ids) => !ids.is_empty(),
        }
    }

    /// Try to get as a single reference.
    pub fn as_ref_identity(&self) -> Option<Identity> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Referenced identities, for either reference shape.
    pub fn referenced(&self) -> Vec<Identity> {
        match self {
            Value::Ref(id) => vec![*id],
            Value::RefList(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Check whether this value references `target`.
    pub fn references(&self, target: Identity) -> bool {
        match self {
            Value::Ref(id) => *id == target,
            Value::RefList(ids) => ids.contains(&target),
            _ => false,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Ref(id) => write!(f, "#{id}"),
            Value::RefList(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| format!("#{id}")).collect();
                write!(f, "[{}]", ids.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Identity> for Value {
    fn from(v: Identity) -> Self {
        Value::Ref(v)
    }
}

impl From<Vec<Identity>> for Value {
    fn from(v: Vec<Identity>) -> Self {
        Value::RefList(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// JSON shape of a [`Value`]: scalars are plain JSON, references are tagged
/// objects (`{"ref": 3}`, `{"refs": [1, 2]}`, `{"bytes": [..]}`).
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Ref {
        #[serde(rename = "ref")]
        target: Identity,
    },
    RefList {
        refs: Vec<Identity>,
    },
    Bytes {
        bytes: Vec<u8>,
    },
}

impl From<ValueRepr> for Value {
    fn from(repr: ValueRepr) -> Self {
        match repr {
            ValueRepr::Null => Value::Null,
            ValueRepr::Bool(b) => Value::Bool(b),
            ValueRepr::Int(i) => Value::Int(i),
            ValueRepr::Float(f) => Value::Float(f),
            ValueRepr::String(s) => Value::String(s),
            ValueRepr::Ref { target } => Value::Ref(target),
            ValueRepr::RefList { refs } => Value::RefList(refs),
            ValueRepr::Bytes { bytes } => Value::Bytes(bytes),
        }
    }
}

impl From<Value> for ValueRepr {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ValueRepr::Null,
            Value::Bool(b) => ValueRepr::Bool(b),
            Value::Int(i) => ValueRepr::Int(i),
            Value::Float(f) => ValueRepr::Float(f),
            Value::String(s) => ValueRepr::String(s),
            Value::Ref(target) => ValueRepr::Ref { target },
            Value::RefList(refs) => ValueRepr::RefList { refs },
            Value::Bytes(bytes) => ValueRepr::Bytes { bytes },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shapes() {
        let json = r#"[null, true, 3, 1.5, "x", {"ref": 7}, {"refs": [1, 2]}]"#;
        let values: Vec<Value> = serde_json::from_str(json).unwrap();

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(1.5),
                Value::String("x".into()),
                Value::Ref(Identity(7)),
                Value::RefList(vec![Identity(1), Identity(2)]),
            ]
        );

        let encoded = serde_json::to_string(&Value::Ref(Identity(7))).unwrap();
        assert_eq!(encoded, r#"{"ref":7}"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::String("a".into()).is_truthy());
        assert!(Value::Ref(Identity(0)).is_truthy());
    }

    #[test]
    fn test_references() {
        let list = Value::RefList(vec![Identity(1), Identity(4)]);
        assert!(list.references(Identity(4)));
        assert!(!list.references(Identity(2)));
        assert_eq!(Value::Ref(Identity(9)).referenced(), vec![Identity(9)]);
        assert!(Value::Int(9).referenced().is_empty());
    }
}
