//! AMF0 value tree
//!
//! Decoding produces a tree of [`AmfValue`] nodes. Objects and ECMA arrays
//! keep their key/value entries in wire order, so a decoded `onMetaData`
//! can be re-encoded byte-for-byte.

/// One key/value entry of an object or ECMA array
#[derive(Debug, Clone, PartialEq)]
pub struct AmfProperty {
    pub key: String,
    pub value: AmfValue,
}

impl AmfProperty {
    pub fn new(key: impl Into<String>, value: impl Into<AmfValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// AMF0 value representation
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AmfValue {
    /// Null value (0x05)
    #[default]
    Null,

    /// Undefined value (0x06)
    Undefined,

    /// Boolean value (0x01)
    Boolean(bool),

    /// IEEE 754 double-precision floating point (0x00)
    Number(f64),

    /// UTF-8 string (0x02, or 0x0C when longer than 65535 bytes)
    String(String),

    /// Anonymous object (0x03)
    Object(Vec<AmfProperty>),

    /// Associative array (0x08); the count hint is not retained
    EcmaArray(Vec<AmfProperty>),

    /// Dense array (0x0A)
    StrictArray(Vec<AmfValue>),

    /// Milliseconds since Unix epoch (0x0B)
    Date(f64),
}

impl AmfValue {
    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Key/value entries of an object or ECMA array
    pub fn properties(&self) -> Option<&[AmfProperty]> {
        match self {
            AmfValue::Object(props) | AmfValue::EcmaArray(props) => Some(props),
            _ => None,
        }
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, AmfValue::Null | AmfValue::Undefined)
    }

    /// Get the first property with the given key
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        self.properties()?
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }

    /// Get a string property from an object value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Get a number property from an object value
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_number()
    }

    /// Short name of the variant, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AmfValue::Null => "null",
            AmfValue::Undefined => "undefined",
            AmfValue::Boolean(_) => "boolean",
            AmfValue::Number(_) => "number",
            AmfValue::String(_) => "string",
            AmfValue::Object(_) => "object",
            AmfValue::EcmaArray(_) => "ecma-array",
            AmfValue::StrictArray(_) => "strict-array",
            AmfValue::Date(_) => "date",
        }
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<u32> for AmfValue {
    fn from(v: u32) -> Self {
        AmfValue::Number(v as f64)
    }
}

impl From<String> for AmfValue {
    fn from(v: String) -> Self {
        AmfValue::String(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}
