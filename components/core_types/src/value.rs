//! Tagged value representation.
//!
//! Every slo value is a small `Copy` enum. Booleans, nil and numbers are
//! stored inline; everything else lives in the heap arena and is referenced
//! through an [`ObjRef`] handle.

use std::fmt;

/// Handle to an object stored in the heap arena.
///
/// A handle is the index of the object's slot. It stays valid for as long
/// as the object is reachable; once the collector frees the slot the index
/// may be reused for a new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    /// Create a handle from an arena slot index
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// The arena slot index this handle points at
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A slo value.
///
/// `Empty` is reserved for hash table bookkeeping (unused slots and
/// tombstones) and is never observable from slo code.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// assert!(Value::Nil.is_falsey());
/// assert!(Value::Number(0.0).is_falsey());
/// assert!(!Value::Number(2.0).is_falsey());
/// assert_eq!(Value::Bool(true).hash_primitive(), Some(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    /// Boolean `true` or `false`
    Bool(bool),
    /// The `nil` value
    #[default]
    Nil,
    /// IEEE-754 double
    Number(f64),
    /// Reference to a heap object
    Obj(ObjRef),
    /// Table slot marker, distinct from `Nil`
    Empty,
}

impl Value {
    /// Returns true for `nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns true for the table marker
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Returns true for booleans
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns true for numbers
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Returns true for heap references
    pub fn is_obj(&self) -> bool {
        matches!(self, Value::Obj(_))
    }

    /// The boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The heap handle, if this is an object reference
    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(r) => Some(*r),
            _ => None,
        }
    }

    /// Truthiness test.
    ///
    /// `nil`, `false` and the number zero are falsey. Every other value,
    /// including empty strings and empty containers, is truthy.
    pub fn is_falsey(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0,
            Value::Obj(_) | Value::Empty => false,
        }
    }

    /// Hash for the inline kinds.
    ///
    /// Returns `None` for object references, whose hash depends on the
    /// object (strings carry a precomputed hash).
    pub fn hash_primitive(&self) -> Option<u32> {
        match self {
            Value::Bool(true) => Some(3),
            Value::Bool(false) => Some(5),
            Value::Nil => Some(7),
            Value::Number(n) => Some(hash_double(*n)),
            Value::Empty => Some(0),
            Value::Obj(_) => None,
        }
    }

    /// Type name for the inline kinds; objects report `"object"`.
    pub fn primitive_type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Obj(_) => "object",
            Value::Empty => "empty",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Obj(r)
    }
}

/// Sum of the two 32-bit halves of `value + 1.0`.
fn hash_double(value: f64) -> u32 {
    let bits = (value + 1.0).to_bits();
    (bits as u32).wrapping_add((bits >> 32) as u32)
}

/// Render a number the way `print` shows it.
///
/// Integral values print without a fractional part; everything else uses
/// the shortest round-tripping representation.
///
/// # Examples
///
/// ```
/// use core_types::format_number;
///
/// assert_eq!(format_number(3.0), "3");
/// assert_eq!(format_number(-0.5), "-0.5");
/// assert_eq!(format_number(f64::NAN), "nan");
/// ```
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        if n == 0.0 && n.is_sign_negative() {
            return "-0".to_string();
        }
        return format!("{}", n as i64);
    }
    let mut buffer = ryu::Buffer::new();
    buffer.format_finite(n).to_string()
}
