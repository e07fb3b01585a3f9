//! Value model: text-encoded scalars, key/value pairs and rows
//!
//! Every value crossing this layer is either a text encoding of a scalar or SQL NULL. Typed inputs
//! are canonicalized once, when the [`KeyValue`] is built, so that filters, assignments and bulk rows
//! all bind the same representation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::types::ValueRef;

/// A text-encoded scalar; `None` is SQL NULL
pub type Value = Option<String>;

/// One row, positionally aligned with the table's columns (bulk insert) or the selected columns (query results)
pub type Row = Vec<Value>;

pub type Rows = Vec<Row>;

/// Engine-assigned rowid of an inserted row
pub type PrimaryKey = i64;

pub type PrimaryKeys = Vec<PrimaryKey>;

/// Ordered key/value pairs. Order is kept and decides clause order in the generated SQL.
pub type KeyValues = Vec<KeyValue>;

/// Conversion of typed inputs into their canonical text encoding
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for &str {
    fn into_value(self) -> Value { Some(self.to_owned()) }
}

impl IntoValue for String {
    fn into_value(self) -> Value { Some(self) }
}

impl IntoValue for &String {
    fn into_value(self) -> Value { Some(self.clone()) }
}

impl IntoValue for bool {
    fn into_value(self) -> Value { Some(if self { "1" } else { "0" }.to_owned()) }
}

macro_rules! impl_into_value_display {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value { Some(self.to_string()) }
            }
        )*
    };
}

impl_into_value_display!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Durations encode as whole seconds
impl IntoValue for Duration {
    fn into_value(self) -> Value { Some(self.as_secs().to_string()) }
}

/// Timestamps encode as whole seconds since the Unix epoch, truncated toward zero
impl IntoValue for SystemTime {
    fn into_value(self) -> Value {
        let seconds = match self.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs().to_string(),
            Err(before) => match before.duration().as_secs() {
                0 => "0".to_owned(),
                secs => format!("-{}", secs),
            },
        };
        Some(seconds)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value { self.and_then(IntoValue::into_value) }
}

/// An immutable column name paired with a value
///
/// Used both as a filter (`column = value` / `column IS NULL`) and as an assignment
/// (`column = value` / `column = NULL`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    key: String,
    value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl IntoValue) -> Self { Self { key: key.into(), value: value.into_value() } }

    /// A pair whose value is SQL NULL
    pub fn null(key: impl Into<String>) -> Self { Self { key: key.into(), value: None } }

    pub fn key(&self) -> &str { &self.key }

    pub fn value(&self) -> Option<&str> { self.value.as_deref() }

    pub fn is_null(&self) -> bool { self.value.is_none() }
}

impl<K: Into<String>, V: IntoValue> From<(K, V)> for KeyValue {
    fn from((key, value): (K, V)) -> Self { KeyValue::new(key, value) }
}

/// Build [`KeyValues`] from `key => value` pairs
///
/// ```
/// use sqlite_access::key_values;
///
/// let filters = key_values! { "number" => 3, "string" => "three" };
/// assert_eq!(filters[0].value(), Some("3"));
/// ```
#[macro_export]
macro_rules! key_values {
    () => { $crate::KeyValues::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        vec![$($crate::KeyValue::new($key, $value)),+]
    };
}

/// Parameter to bind for a value: text when present, NULL when absent
pub(crate) fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Some(text) => rusqlite::types::Value::Text(text.clone()),
        None => rusqlite::types::Value::Null,
    }
}

/// Parameters to bind for a whole row, in column order
pub(crate) fn row_params(row: &[Value]) -> Vec<rusqlite::types::Value> { row.iter().map(to_sql).collect() }

/// Decode a column value into its text form, the way SQLite's own text conversion would present it
pub(crate) fn decode(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(format_real(f)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

// SQLite renders integral reals with a trailing ".0"
fn format_real(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}
