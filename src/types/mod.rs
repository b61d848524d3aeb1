//! Scalar values held in relation cells and query literals.
//!
//! Every cell of a loaded relation is a [`Value`]. Cells start life as text
//! (or [`Value::Null`] for empty fields) and are reinterpreted as numbers by
//! the loader's normalization pass when a whole column looks numeric.
//!
//! Comparison follows dataframe semantics rather than SQLite's total order:
//! numbers compare with numbers, text with text, and anything else is
//! *incomparable* ([`Value::compare`] returns `None`).

use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// | Variant   | Meaning                     | Rust Type |
/// |-----------|-----------------------------|-----------|
/// | `Null`    | empty field in the source   | none      |
/// | `Integer` | whole number                | `i64`     |
/// | `Real`    | fractional number           | `f64`     |
/// | `Text`    | anything else               | `String`  |
///
/// # Equality
///
/// `PartialEq` is structural except that Integer and Real values compare
/// numerically, so `Value::Integer(1) == Value::Real(1.0)`. Two `NaN`
/// values are considered equal.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// Returns the value as `f64` for either numeric variant.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Compares two values for filtering.
    ///
    /// Integer and Real compare numerically with each other, Text compares
    /// lexicographically with Text. Every other pairing, including anything
    /// involving `Null` or a `NaN`, is incomparable and yields `None`.
    ///
    /// ```
    /// use std::cmp::Ordering;
    /// use csvql::types::Value;
    ///
    /// assert_eq!(Value::Integer(2).compare(&Value::Real(1.5)), Some(Ordering::Greater));
    /// assert_eq!(Value::Text("b".into()).compare(&Value::Integer(1)), None);
    /// ```
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Integer(i), Value::Real(r)) => (*i as f64).partial_cmp(r),
            (Value::Real(r), Value::Integer(i)) => r.partial_cmp(&(*i as f64)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// A total order used for sorting: numbers, then text, then `Null`.
    ///
    /// Within the numeric group `NaN` sorts after every other number.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Integer(_) | Value::Real(_) => 0,
                Value::Text(_) => 1,
                Value::Null => 2,
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                // Both sides are numeric, so as_real cannot fail.
                compare_f64(a.as_real().unwrap_or(f64::NAN), b.as_real().unwrap_or(f64::NAN))
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Reinterprets text as a number.
    ///
    /// Surrounding whitespace is ignored. Integer syntax is tried first, then
    /// real syntax. Returns `None` when the text is not numeric.
    ///
    /// ```
    /// use csvql::types::Value;
    ///
    /// assert_eq!(Value::coerce_numeric(" 42 "), Some(Value::Integer(42)));
    /// assert_eq!(Value::coerce_numeric("2.5"), Some(Value::Real(2.5)));
    /// assert_eq!(Value::coerce_numeric("Bandung"), None);
    /// ```
    pub fn coerce_numeric(text: &str) -> Option<Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(Value::Integer(i));
        }
        trimmed.parse::<f64>().ok().map(Value::Real)
    }
}

/// Total ordering for `f64` with `NaN` greater than every other value.
fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        _ => Ordering::Less,
    })
}

// ---------------------------------------------------------------------------
// PartialEq
// ---------------------------------------------------------------------------

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(i), Value::Real(r)) | (Value::Real(r), Value::Integer(i)) => {
                *r == (*i as f64)
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Value {
    /// Formats a value for result output.
    ///
    /// `Null` renders as an empty string; a whole-number Real keeps one
    /// decimal place so it stays distinguishable from an Integer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => {
                if r.fract() == 0.0 && r.is_finite() {
                    write!(f, "{:.1}", r)
                } else {
                    write!(f, "{}", r)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// From trait implementations
// ---------------------------------------------------------------------------

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
