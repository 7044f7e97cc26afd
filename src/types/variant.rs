// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Contains the implementation of `Variant`, limited to the scalar types and arrays that
//! appear in method arguments and event fields.

use std::fmt;

use crate::types::{node_id::NodeId, status_code::StatusCode, DateTime};

/// A `Variant` holds built-in OPC UA data types, including single and multi dimensional
/// arrays of the same.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub enum Variant {
    /// Empty type has no value. It is equivalent to a Null value (part 6 5.1.6)
    #[default]
    Empty,
    /// Boolean
    Boolean(bool),
    /// Signed 32-bit int
    Int32(i32),
    /// Unsigned 32-bit int
    UInt32(u32),
    /// Signed 64-bit int
    Int64(i64),
    /// Unsigned 64-bit int
    UInt64(u64),
    /// Double
    Double(f64),
    /// String
    String(String),
    /// DateTime
    DateTime(Box<DateTime>),
    /// NodeId
    NodeId(Box<NodeId>),
    /// StatusCode
    StatusCode(StatusCode),
    /// Single dimension array of variants
    Array(Vec<Variant>),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "null"),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::Int32(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Int64(v) => write!(f, "{}", v),
            Variant::UInt64(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::String(v) => write!(f, "{}", v),
            Variant::DateTime(v) => write!(f, "{}", v),
            Variant::NodeId(v) => write!(f, "{}", v),
            Variant::StatusCode(v) => write!(f, "{}", v),
            Variant::Array(v) => {
                write!(f, "[")?;
                for (i, value) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Boolean(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::Int32(v)
    }
}

impl From<u32> for Variant {
    fn from(v: u32) -> Self {
        Variant::UInt32(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl<'a> From<&'a str> for Variant {
    fn from(v: &'a str) -> Self {
        Variant::String(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(v)
    }
}

impl From<NodeId> for Variant {
    fn from(v: NodeId) -> Self {
        Variant::NodeId(Box::new(v))
    }
}

impl From<StatusCode> for Variant {
    fn from(v: StatusCode) -> Self {
        Variant::StatusCode(v)
    }
}

impl From<Vec<u32>> for Variant {
    fn from(v: Vec<u32>) -> Self {
        Variant::Array(v.into_iter().map(Variant::UInt32).collect())
    }
}

impl Variant {
    /// Test if the variant holds nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Returns the contents of a `UInt32` array, or `None` if the variant is not an array or
    /// any element is of another type.
    pub fn as_u32_array(&self) -> Option<Vec<u32>> {
        match self {
            Variant::Array(values) => values
                .iter()
                .map(|v| match v {
                    Variant::UInt32(v) => Some(*v),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}
