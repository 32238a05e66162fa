//! IR Type System
//!
//! Types and constant values of the memory-form IR. Only what the analyses
//! need to tell integers, pointers and arrays apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    /// Void type (no value)
    Void,

    /// Boolean type
    Bool,

    /// Integer types
    I8,
    I16,
    I32,
    I64,

    /// Floating point types
    F32,
    F64,

    /// Pointer type
    Ptr(Box<IrType>),

    /// Array type with known size
    Array(Box<IrType>, usize),
}

impl IrType {
    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64)
    }

    /// Check if this is an array type
    pub fn is_array(&self) -> bool {
        matches!(self, IrType::Array(..))
    }

    /// Element type of an array or pointee of a pointer
    pub fn element(&self) -> Option<&IrType> {
        match self {
            IrType::Array(elem, _) | IrType::Ptr(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "bool"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::Ptr(inner) => write!(f, "*{}", inner),
            IrType::Array(elem, size) => write!(f, "[{}; {}]", elem, size),
        }
    }
}

/// Constant values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrValue {
    /// Null pointer
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer values
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Floating point values
    F32(f32),
    F64(f64),
}

impl IrValue {
    /// Sign-extended integer value, `None` for non-integer constants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            IrValue::I8(v) => Some(*v as i64),
            IrValue::I16(v) => Some(*v as i64),
            IrValue::I32(v) => Some(*v as i64),
            IrValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn ty(&self) -> IrType {
        match self {
            IrValue::Null => IrType::Ptr(Box::new(IrType::Void)),
            IrValue::Bool(_) => IrType::Bool,
            IrValue::I8(_) => IrType::I8,
            IrValue::I16(_) => IrType::I16,
            IrValue::I32(_) => IrType::I32,
            IrValue::I64(_) => IrType::I64,
            IrValue::F32(_) => IrType::F32,
            IrValue::F64(_) => IrType::F64,
        }
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Null => write!(f, "null"),
            IrValue::Bool(b) => write!(f, "{}", b),
            IrValue::I8(v) => write!(f, "{}", v),
            IrValue::I16(v) => write!(f, "{}", v),
            IrValue::I32(v) => write!(f, "{}", v),
            IrValue::I64(v) => write!(f, "{}", v),
            IrValue::F32(v) => write!(f, "{}", v),
            IrValue::F64(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_constants_sign_extend() {
        assert_eq!(IrValue::I8(-3).as_i64(), Some(-3));
        assert_eq!(IrValue::I32(7).as_i64(), Some(7));
        assert_eq!(IrValue::F64(1.5).as_i64(), None);
        assert_eq!(IrValue::Bool(true).as_i64(), None);
    }

    #[test]
    fn test_type_display() {
        let arr = IrType::Array(Box::new(IrType::I32), 10);
        assert_eq!(arr.to_string(), "[i32; 10]");
        assert_eq!(arr.element(), Some(&IrType::I32));
        assert!(IrType::I64.is_integer());
    }
}
