//! Wire type and class code enumerations
//!
//! The code table is closed and immutable: every descriptor type code the marshaller
//! understands maps to exactly one [`LeafKind`], which decides the leaf encoding.

use crate::constants::*;
use crate::error::WireError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer width on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8-bit
    W8,
    /// 16-bit
    W16,
    /// 32-bit
    W32,
    /// 64-bit
    W64,
    /// 64-bit value in a 128-bit slot
    Octa,
}

impl IntWidth {
    /// Bytes occupied by one value on the wire
    pub fn wire_len(self) -> usize {
        match self {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
            IntWidth::Octa => 16,
        }
    }
}

/// Decimal sub-format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecimalFormat {
    /// Unsigned numeric string
    Unsigned,
    /// Leading separate sign character
    LeftSeparate,
    /// Sign overpunched on the first digit
    LeftOverpunched,
    /// Trailing separate sign character
    RightSeparate,
    /// Sign overpunched on the last digit
    RightOverpunched,
    /// Zoned sign on the last digit
    Zoned,
    /// Packed BCD with trailing sign nibble
    Packed,
}

impl DecimalFormat {
    /// Bytes occupied by one value of the given precision
    pub fn byte_count(self, precision: usize) -> usize {
        match self {
            DecimalFormat::Packed => precision / 2 + 1,
            DecimalFormat::LeftSeparate | DecimalFormat::RightSeparate => precision + 1,
            DecimalFormat::Unsigned
            | DecimalFormat::LeftOverpunched
            | DecimalFormat::RightOverpunched
            | DecimalFormat::Zoned => precision,
        }
    }
}

/// Native kind selected by a wire type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float; `extended` values carry 8 trailing zero bytes
    Float64 {
        /// 128-bit slot
        extended: bool,
    },
    /// Two's-complement integer
    Int {
        /// Wire width
        width: IntWidth,
        /// Signedness of the legal interval
        signed: bool,
    },
    /// One byte per boolean
    Bool,
    /// Fixed-length character string
    FixedString,
    /// Counted character string
    VaryingString,
    /// Structure image (legacy or v2 representation)
    Record,
    /// Decimal in one of the seven sub-formats
    Decimal(DecimalFormat),
    /// String descriptor (dynamic string arrays only)
    Descriptor,
    /// No type
    Unspecified,
}

impl LeafKind {
    /// Whether values of this kind are always leaves, never one more array dimension.
    ///
    /// Strings, records and decimals are sequence-like on the wire but still atomic.
    pub fn is_atomic(self) -> bool {
        !matches!(self, LeafKind::Descriptor | LeafKind::Unspecified)
    }
}

/// Wire type code (descriptor data type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CodeRepr", into = "u8")]
#[repr(u8)]
pub enum WireTypeCode {
    /// Unspecified
    Unspecified = DTYPE_Z,
    /// Boolean (aligned bit string)
    Bool = DTYPE_V,
    /// Unsigned byte
    ByteU = DTYPE_BU,
    /// Unsigned word
    WordU = DTYPE_WU,
    /// Unsigned longword
    LongU = DTYPE_LU,
    /// Unsigned quadword
    QuadU = DTYPE_QU,
    /// Signed byte
    Byte = DTYPE_B,
    /// Signed word
    Word = DTYPE_W,
    /// Signed longword
    Long = DTYPE_L,
    /// Signed quadword
    Quad = DTYPE_Q,
    /// F_floating
    FFloat = DTYPE_F,
    /// D_floating
    DFloat = DTYPE_D,
    /// Fixed character string
    Text = DTYPE_T,
    /// Numeric string, unsigned
    NumericUnsigned = DTYPE_NU,
    /// Numeric string, left separate sign
    NumericLeftSeparate = DTYPE_NL,
    /// Numeric string, left overpunched sign
    NumericLeftOverpunched = DTYPE_NLO,
    /// Numeric string, right separate sign
    NumericRightSeparate = DTYPE_NR,
    /// Numeric string, right overpunched sign
    NumericRightOverpunched = DTYPE_NRO,
    /// Numeric string, zoned sign
    NumericZoned = DTYPE_NZ,
    /// Packed decimal
    Packed = DTYPE_P,
    /// Descriptor
    Descriptor = DTYPE_DSC,
    /// Unsigned octaword
    OctaU = DTYPE_OU,
    /// Signed octaword
    Octa = DTYPE_O,
    /// G_floating
    GFloat = DTYPE_G,
    /// Varying character string
    VaryingText = DTYPE_VT,
    /// IEEE single
    IeeeSingle = DTYPE_FS,
    /// IEEE double
    IeeeDouble = DTYPE_FT,
    /// IEEE extended
    IeeeExtended = DTYPE_FX,
    /// Structure
    Struct = DTYPE_STRUCT,
}

const ALL_TYPE_CODES: [WireTypeCode; 29] = [
    WireTypeCode::Unspecified,
    WireTypeCode::Bool,
    WireTypeCode::ByteU,
    WireTypeCode::WordU,
    WireTypeCode::LongU,
    WireTypeCode::QuadU,
    WireTypeCode::Byte,
    WireTypeCode::Word,
    WireTypeCode::Long,
    WireTypeCode::Quad,
    WireTypeCode::FFloat,
    WireTypeCode::DFloat,
    WireTypeCode::Text,
    WireTypeCode::NumericUnsigned,
    WireTypeCode::NumericLeftSeparate,
    WireTypeCode::NumericLeftOverpunched,
    WireTypeCode::NumericRightSeparate,
    WireTypeCode::NumericRightOverpunched,
    WireTypeCode::NumericZoned,
    WireTypeCode::Packed,
    WireTypeCode::Descriptor,
    WireTypeCode::OctaU,
    WireTypeCode::Octa,
    WireTypeCode::GFloat,
    WireTypeCode::VaryingText,
    WireTypeCode::IeeeSingle,
    WireTypeCode::IeeeDouble,
    WireTypeCode::IeeeExtended,
    WireTypeCode::Struct,
];

impl WireTypeCode {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, WireError> {
        ALL_TYPE_CODES
            .iter()
            .copied()
            .find(|code| *code as u8 == val)
            .ok_or(WireError::UnknownTypeCode(val))
    }

    /// Look up a code by its short descriptor name (`"L"`, `"FS"`, `"STRUCT"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        ALL_TYPE_CODES
            .iter()
            .copied()
            .find(|code| code.name() == upper)
    }

    /// Short descriptor name
    pub fn name(self) -> &'static str {
        match self {
            WireTypeCode::Unspecified => "Z",
            WireTypeCode::Bool => "V",
            WireTypeCode::ByteU => "BU",
            WireTypeCode::WordU => "WU",
            WireTypeCode::LongU => "LU",
            WireTypeCode::QuadU => "QU",
            WireTypeCode::Byte => "B",
            WireTypeCode::Word => "W",
            WireTypeCode::Long => "L",
            WireTypeCode::Quad => "Q",
            WireTypeCode::FFloat => "F",
            WireTypeCode::DFloat => "D",
            WireTypeCode::Text => "T",
            WireTypeCode::NumericUnsigned => "NU",
            WireTypeCode::NumericLeftSeparate => "NL",
            WireTypeCode::NumericLeftOverpunched => "NLO",
            WireTypeCode::NumericRightSeparate => "NR",
            WireTypeCode::NumericRightOverpunched => "NRO",
            WireTypeCode::NumericZoned => "NZ",
            WireTypeCode::Packed => "P",
            WireTypeCode::Descriptor => "DSC",
            WireTypeCode::OctaU => "OU",
            WireTypeCode::Octa => "O",
            WireTypeCode::GFloat => "G",
            WireTypeCode::VaryingText => "VT",
            WireTypeCode::IeeeSingle => "FS",
            WireTypeCode::IeeeDouble => "FT",
            WireTypeCode::IeeeExtended => "FX",
            WireTypeCode::Struct => "STRUCT",
        }
    }

    /// Native kind for this code
    pub fn leaf_kind(self) -> LeafKind {
        use WireTypeCode::*;
        match self {
            FFloat | IeeeSingle => LeafKind::Float32,
            DFloat | GFloat | IeeeDouble => LeafKind::Float64 { extended: false },
            IeeeExtended => LeafKind::Float64 { extended: true },
            Byte => int(IntWidth::W8, true),
            ByteU => int(IntWidth::W8, false),
            Word => int(IntWidth::W16, true),
            WordU => int(IntWidth::W16, false),
            Long => int(IntWidth::W32, true),
            LongU => int(IntWidth::W32, false),
            Quad => int(IntWidth::W64, true),
            QuadU => int(IntWidth::W64, false),
            Octa => int(IntWidth::Octa, true),
            OctaU => int(IntWidth::Octa, false),
            Bool => LeafKind::Bool,
            Text => LeafKind::FixedString,
            VaryingText => LeafKind::VaryingString,
            Struct => LeafKind::Record,
            NumericUnsigned => LeafKind::Decimal(DecimalFormat::Unsigned),
            NumericLeftSeparate => LeafKind::Decimal(DecimalFormat::LeftSeparate),
            NumericLeftOverpunched => LeafKind::Decimal(DecimalFormat::LeftOverpunched),
            NumericRightSeparate => LeafKind::Decimal(DecimalFormat::RightSeparate),
            NumericRightOverpunched => LeafKind::Decimal(DecimalFormat::RightOverpunched),
            NumericZoned => LeafKind::Decimal(DecimalFormat::Zoned),
            Packed => LeafKind::Decimal(DecimalFormat::Packed),
            Descriptor => LeafKind::Descriptor,
            Unspecified => LeafKind::Unspecified,
        }
    }

    /// Decimal sub-format, if this is a decimal code
    pub fn decimal_format(self) -> Option<DecimalFormat> {
        match self.leaf_kind() {
            LeafKind::Decimal(format) => Some(format),
            _ => None,
        }
    }
}

const fn int(width: IntWidth, signed: bool) -> LeafKind {
    LeafKind::Int { width, signed }
}

impl From<WireTypeCode> for u8 {
    fn from(code: WireTypeCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for WireTypeCode {
    type Error = WireError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        Self::from_u8(val)
    }
}

impl fmt::Display for WireTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DTYPE_{}", self.name())
    }
}

/// Wire class code (descriptor class)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CodeRepr", into = "u8")]
#[repr(u8)]
pub enum WireClassCode {
    /// Static / scalar
    Static = CLASS_S,
    /// Dynamic string
    Dynamic = CLASS_D,
    /// Array
    Array = CLASS_A,
    /// Scaled decimal
    ScaledDecimal = CLASS_SD,
    /// Non-contiguous array
    NonContiguousArray = CLASS_NCA,
    /// Variant string
    VariantString = CLASS_VS,
    /// Variant string array; header size is the largest string
    VariantStringArray = CLASS_VSA,
}

const ALL_CLASS_CODES: [WireClassCode; 7] = [
    WireClassCode::Static,
    WireClassCode::Dynamic,
    WireClassCode::Array,
    WireClassCode::ScaledDecimal,
    WireClassCode::NonContiguousArray,
    WireClassCode::VariantString,
    WireClassCode::VariantStringArray,
];

impl WireClassCode {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, WireError> {
        ALL_CLASS_CODES
            .iter()
            .copied()
            .find(|code| *code as u8 == val)
            .ok_or(WireError::UnknownClassCode(val))
    }

    /// Look up a class by its short descriptor name (`"A"`, `"VSA"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        ALL_CLASS_CODES
            .iter()
            .copied()
            .find(|code| code.name() == upper)
    }

    /// Short descriptor name
    pub fn name(self) -> &'static str {
        match self {
            WireClassCode::Static => "S",
            WireClassCode::Dynamic => "D",
            WireClassCode::Array => "A",
            WireClassCode::ScaledDecimal => "SD",
            WireClassCode::NonContiguousArray => "NCA",
            WireClassCode::VariantString => "VS",
            WireClassCode::VariantStringArray => "VSA",
        }
    }

    /// Whether element size is derived from the longest string in the array
    pub fn sizes_from_largest_string(self) -> bool {
        self == WireClassCode::VariantStringArray
    }
}

impl From<WireClassCode> for u8 {
    fn from(code: WireClassCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for WireClassCode {
    type Error = WireError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        Self::from_u8(val)
    }
}

impl fmt::Display for WireClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLASS_{}", self.name())
    }
}

/// Codes in configuration may be given by number or by short name
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeRepr {
    Number(u8),
    Name(String),
}

impl TryFrom<CodeRepr> for WireTypeCode {
    type Error = WireError;

    fn try_from(repr: CodeRepr) -> Result<Self, Self::Error> {
        match repr {
            CodeRepr::Number(n) => Self::from_u8(n),
            CodeRepr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| WireError::Internal(format!("unknown type code name {name:?}"))),
        }
    }
}

impl TryFrom<CodeRepr> for WireClassCode {
    type Error = WireError;

    fn try_from(repr: CodeRepr) -> Result<Self, Self::Error> {
        match repr {
            CodeRepr::Number(n) => Self::from_u8(n),
            CodeRepr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| WireError::Internal(format!("unknown class code name {name:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_from_u8_valid() {
        let cases = vec![
            (1, WireTypeCode::Bool),
            (6, WireTypeCode::Byte),
            (9, WireTypeCode::Quad),
            (21, WireTypeCode::Packed),
            (26, WireTypeCode::Octa),
            (37, WireTypeCode::VaryingText),
            (52, WireTypeCode::IeeeSingle),
            (77, WireTypeCode::Struct),
        ];

        for (val, expected) in cases {
            assert_eq!(WireTypeCode::from_u8(val).unwrap(), expected);
        }
    }

    #[test]
    fn test_type_code_from_u8_unknown() {
        for val in [12u8, 13, 22, 28, 35, 78, 255] {
            match WireTypeCode::from_u8(val) {
                Err(WireError::UnknownTypeCode(v)) => assert_eq!(v, val),
                other => panic!("expected UnknownTypeCode, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_every_code_round_trips_through_u8_and_name() {
        for code in ALL_TYPE_CODES {
            assert_eq!(WireTypeCode::from_u8(code as u8).unwrap(), code);
            assert_eq!(WireTypeCode::from_name(code.name()), Some(code));
        }
        for class in ALL_CLASS_CODES {
            assert_eq!(WireClassCode::from_u8(class as u8).unwrap(), class);
            assert_eq!(WireClassCode::from_name(class.name()), Some(class));
        }
    }

    #[test]
    fn test_leaf_kinds() {
        assert_eq!(WireTypeCode::FFloat.leaf_kind(), LeafKind::Float32);
        assert_eq!(WireTypeCode::IeeeSingle.leaf_kind(), LeafKind::Float32);
        assert_eq!(
            WireTypeCode::GFloat.leaf_kind(),
            LeafKind::Float64 { extended: false }
        );
        assert_eq!(
            WireTypeCode::IeeeExtended.leaf_kind(),
            LeafKind::Float64 { extended: true }
        );
        assert_eq!(
            WireTypeCode::ByteU.leaf_kind(),
            LeafKind::Int {
                width: IntWidth::W8,
                signed: false
            }
        );
        assert_eq!(
            WireTypeCode::Octa.leaf_kind(),
            LeafKind::Int {
                width: IntWidth::Octa,
                signed: true
            }
        );
        assert_eq!(
            WireTypeCode::NumericZoned.decimal_format(),
            Some(DecimalFormat::Zoned)
        );
        assert_eq!(WireTypeCode::Long.decimal_format(), None);
    }

    #[test]
    fn test_atomic_kinds() {
        assert!(WireTypeCode::Text.leaf_kind().is_atomic());
        assert!(WireTypeCode::Struct.leaf_kind().is_atomic());
        assert!(!WireTypeCode::Descriptor.leaf_kind().is_atomic());
        assert!(!WireTypeCode::Unspecified.leaf_kind().is_atomic());
    }

    #[test]
    fn test_decimal_byte_counts() {
        assert_eq!(DecimalFormat::Packed.byte_count(5), 3);
        assert_eq!(DecimalFormat::Packed.byte_count(6), 4);
        assert_eq!(DecimalFormat::LeftSeparate.byte_count(5), 6);
        assert_eq!(DecimalFormat::Zoned.byte_count(5), 5);
    }

    #[test]
    fn test_serde_accepts_number_or_name() {
        let by_num: WireTypeCode = serde_json::from_str("8").unwrap();
        let by_name: WireTypeCode = serde_json::from_str("\"l\"").unwrap();
        assert_eq!(by_num, WireTypeCode::Long);
        assert_eq!(by_name, WireTypeCode::Long);
        assert_eq!(serde_json::to_string(&WireTypeCode::Long).unwrap(), "8");

        let class: WireClassCode = serde_json::from_str("\"VSA\"").unwrap();
        assert_eq!(class, WireClassCode::VariantStringArray);
        assert!(serde_json::from_str::<WireClassCode>("3").is_err());
    }
}
