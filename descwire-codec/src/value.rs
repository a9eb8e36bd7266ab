//! Caller-owned nested array values

use descwire_format::{Decimal, Record, StructRecord, V2Record, WireDecimal};

/// Leaf value
///
/// Strings, records and decimals are sequence-like on the wire but are always leaves here.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarNode {
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Integer of any supported width
    Int(i128),
    /// Boolean
    Bool(bool),
    /// Character string (Latin-1 on the wire)
    Str(String),
    /// Structure
    Record(Record),
    /// Wide decimal
    Decimal(Decimal),
    /// Narrow, pre-encoded decimal
    WireDecimal(WireDecimal),
}

impl ScalarNode {
    /// Short name of the variant, used in error reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalarNode::Float32(_) => "float32",
            ScalarNode::Float64(_) => "float64",
            ScalarNode::Int(_) => "int",
            ScalarNode::Bool(_) => "bool",
            ScalarNode::Str(_) => "string",
            ScalarNode::Record(Record::Legacy(_)) => "record",
            ScalarNode::Record(Record::V2(_)) => "v2 record",
            ScalarNode::Decimal(_) => "decimal",
            ScalarNode::WireDecimal(_) => "wire decimal",
        }
    }
}

/// One level of a nested array: a container of nodes, or a leaf scalar
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayNode {
    /// Container of child nodes
    Nested(Vec<ArrayNode>),
    /// Leaf scalar
    Scalar(ScalarNode),
}

/// Root of a caller-owned array
pub type ArrayValue = ArrayNode;

impl ArrayNode {
    /// Container from anything convertible to nodes
    pub fn nested<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArrayNode>,
    {
        ArrayNode::Nested(items.into_iter().map(Into::into).collect())
    }

    /// Children if this is a container
    pub fn as_nested(&self) -> Option<&[ArrayNode]> {
        match self {
            ArrayNode::Nested(children) => Some(children),
            ArrayNode::Scalar(_) => None,
        }
    }

    /// Scalar if this is a leaf
    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            ArrayNode::Scalar(scalar) => Some(scalar),
            ArrayNode::Nested(_) => None,
        }
    }

    /// Total number of scalars in the tree
    pub fn scalar_count(&self) -> usize {
        match self {
            ArrayNode::Scalar(_) => 1,
            ArrayNode::Nested(children) => children.iter().map(ArrayNode::scalar_count).sum(),
        }
    }
}

impl From<ScalarNode> for ArrayNode {
    fn from(scalar: ScalarNode) -> Self {
        ArrayNode::Scalar(scalar)
    }
}

impl<T: Into<ArrayNode>> From<Vec<T>> for ArrayNode {
    fn from(items: Vec<T>) -> Self {
        ArrayNode::nested(items)
    }
}

macro_rules! scalar_from {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl From<$ty> for ScalarNode {
                fn from(value: $ty) -> Self {
                    ScalarNode::$variant(value.into())
                }
            }

            impl From<$ty> for ArrayNode {
                fn from(value: $ty) -> Self {
                    ArrayNode::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_from!(Int: i8, u8, i16, u16, i32, u32, i64, u64, i128);
scalar_from!(Float32: f32);
scalar_from!(Float64: f64);
scalar_from!(Bool: bool);
scalar_from!(Str: String, &str);
scalar_from!(Record: Record, StructRecord, V2Record);
scalar_from!(Decimal: Decimal);
scalar_from!(WireDecimal: WireDecimal);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_from_vectors() {
        let value = ArrayNode::from(vec![vec![1, 2], vec![3, 4]]);
        let rows = value.as_nested().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].as_nested().unwrap()[0],
            ArrayNode::Scalar(ScalarNode::Int(3))
        );
        assert_eq!(value.scalar_count(), 4);
    }

    #[test]
    fn test_strings_are_leaves() {
        let value = ArrayNode::from(vec!["abc", "de"]);
        let rows = value.as_nested().unwrap();
        assert!(rows.iter().all(|n| n.as_scalar().is_some()));
        assert_eq!(rows[0].as_scalar().unwrap().kind_name(), "string");
    }
}
