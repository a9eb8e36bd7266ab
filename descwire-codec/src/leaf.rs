//! Per-type leaf codecs
//!
//! Each leaf list of an array is written with exactly one bulk put and read with exactly
//! one bulk get. [`ElementCodec`] selects the codec once per array from the context.

use crate::context::MarshalContext;
use crate::value::ScalarNode;
use descwire_format::{
    Decimal, DecimalFormat, IntWidth, LeafKind, PrimitiveCodec, Record, Result, StructRecord,
    V2Record, WireDecimal, WireError, WireInt, WireTypeCode,
};
use std::marker::PhantomData;

/// Bulk encoding of one leaf list
pub trait LeafCodec {
    /// Native element type after coercion
    type Native;

    /// Wire type code name, for error reports
    fn type_name(&self) -> &'static str;
    /// Convert a leaf scalar into the native type
    fn coerce(&self, scalar: &ScalarNode) -> Result<Self::Native>;
    /// One bulk put
    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[Self::Native]) -> Result<()>;
    /// One bulk get, shaped like `template`
    fn get_all<C: PrimitiveCodec>(
        &self,
        codec: &mut C,
        template: &[&ScalarNode],
    ) -> Result<Vec<Self::Native>>;
    /// Convert a native value back into a leaf scalar
    fn wrap(&self, native: Self::Native) -> ScalarNode;
    /// Fresh leaf for an array allocated by the importer
    fn default_scalar(&self) -> Result<ScalarNode>;

    /// Reject `scalar` as the wrong kind
    fn unsupported(&self, scalar: &ScalarNode) -> WireError {
        WireError::UnsupportedElementType {
            type_code: self.type_name(),
            found: scalar.kind_name(),
        }
    }
}

/// 32-bit float codes (`F`, `FS`)
#[derive(Debug, Clone, Copy)]
pub struct F32Codec {
    code: WireTypeCode,
}

impl LeafCodec for F32Codec {
    type Native = f32;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<f32> {
        match scalar {
            ScalarNode::Float32(v) => Ok(*v),
            ScalarNode::Float64(v) => Ok(*v as f32),
            ScalarNode::Int(v) => Ok(*v as f32),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[f32]) -> Result<()> {
        codec.put_f32_array(values, self.code)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<f32>> {
        codec.get_f32_array(self.code, template.len())
    }

    fn wrap(&self, native: f32) -> ScalarNode {
        ScalarNode::Float32(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Float32(0.0))
    }
}

/// 64-bit float codes (`D`, `G`, `FT`, `FX`)
#[derive(Debug, Clone, Copy)]
pub struct F64Codec {
    code: WireTypeCode,
}

impl LeafCodec for F64Codec {
    type Native = f64;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<f64> {
        match scalar {
            ScalarNode::Float32(v) => Ok(f64::from(*v)),
            ScalarNode::Float64(v) => Ok(*v),
            ScalarNode::Int(v) => Ok(*v as f64),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[f64]) -> Result<()> {
        codec.put_f64_array(values, self.code)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<f64>> {
        codec.get_f64_array(self.code, template.len())
    }

    fn wrap(&self, native: f64) -> ScalarNode {
        ScalarNode::Float64(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Float64(0.0))
    }
}

/// Integer codes; `T` is the native type whose range the code accepts
#[derive(Debug, Clone, Copy)]
pub struct IntCodec<T> {
    code: WireTypeCode,
    _native: PhantomData<T>,
}

impl<T: WireInt> IntCodec<T> {
    fn new(code: WireTypeCode) -> Self {
        Self {
            code,
            _native: PhantomData,
        }
    }
}

impl<T: WireInt> LeafCodec for IntCodec<T> {
    type Native = T;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<T> {
        match scalar {
            ScalarNode::Int(v) => T::from_i128(*v).ok_or(WireError::IntegerRangeError {
                value: *v,
                type_code: self.code.name(),
            }),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[T]) -> Result<()> {
        codec.put_int_array(values, self.code)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<T>> {
        codec.get_int_array(self.code, template.len())
    }

    fn wrap(&self, native: T) -> ScalarNode {
        ScalarNode::Int(native.to_i128())
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Int(0))
    }
}

/// Boolean code (`V`)
#[derive(Debug, Clone, Copy)]
pub struct BoolCodec;

impl LeafCodec for BoolCodec {
    type Native = bool;

    fn type_name(&self) -> &'static str {
        WireTypeCode::Bool.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<bool> {
        match scalar {
            ScalarNode::Bool(v) => Ok(*v),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[bool]) -> Result<()> {
        codec.put_bool_array(values)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<bool>> {
        codec.get_bool_array(template.len())
    }

    fn wrap(&self, native: bool) -> ScalarNode {
        ScalarNode::Bool(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Bool(false))
    }
}

/// String codes (`T`, `VT`)
#[derive(Debug, Clone, Copy)]
pub struct StrCodec {
    code: WireTypeCode,
    size: usize,
    null_term: bool,
}

impl LeafCodec for StrCodec {
    type Native = String;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<String> {
        match scalar {
            ScalarNode::Str(v) => Ok(v.clone()),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[String]) -> Result<()> {
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        codec.put_str_array(&refs, self.code, self.size, self.null_term)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<String>> {
        codec.get_str_array(self.code, template.len(), self.size)
    }

    fn wrap(&self, native: String) -> ScalarNode {
        ScalarNode::Str(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Str(String::new()))
    }
}

/// Structure code (`STRUCT`), legacy or v2 representation
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    v2: bool,
}

impl RecordCodec {
    fn record<'a>(&self, scalar: &'a ScalarNode) -> Result<&'a Record> {
        match scalar {
            ScalarNode::Record(record) if record.is_v2() == self.v2 => Ok(record),
            other => Err(self.unsupported(other)),
        }
    }
}

impl LeafCodec for RecordCodec {
    type Native = Record;

    fn type_name(&self) -> &'static str {
        WireTypeCode::Struct.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<Record> {
        self.record(scalar).cloned()
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[Record]) -> Result<()> {
        if self.v2 {
            let v2: Vec<&V2Record> = values
                .iter()
                .filter_map(|r| match r {
                    Record::V2(v) => Some(v),
                    Record::Legacy(_) => None,
                })
                .collect();
            codec.put_v2_record_array(&v2)
        } else {
            let images: Vec<&StructRecord> = values.iter().map(Record::image).collect();
            codec.put_record_array(&images)
        }
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<Record>> {
        let records = template
            .iter()
            .map(|s| self.record(s))
            .collect::<Result<Vec<_>>>()?;

        if self.v2 {
            let v2: Vec<&V2Record> = records
                .iter()
                .filter_map(|r| match r {
                    Record::V2(v) => Some(v),
                    Record::Legacy(_) => None,
                })
                .collect();
            Ok(codec
                .get_v2_record_array(&v2)?
                .into_iter()
                .map(Record::V2)
                .collect())
        } else {
            let images: Vec<&StructRecord> = records.iter().map(|r| r.image()).collect();
            Ok(codec
                .get_record_array(&images)?
                .into_iter()
                .map(Record::Legacy)
                .collect())
        }
    }

    fn wrap(&self, native: Record) -> ScalarNode {
        ScalarNode::Record(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Err(WireError::InvalidArrayObject(
            "structure arrays need caller-supplied records to size their elements".to_string(),
        ))
    }
}

/// Decimal codes carried as wide [`Decimal`] values
#[derive(Debug, Clone, Copy)]
pub struct DecimalCodec {
    code: WireTypeCode,
    format: DecimalFormat,
    precision: usize,
    scale: u8,
}

impl LeafCodec for DecimalCodec {
    type Native = Decimal;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<Decimal> {
        match scalar {
            ScalarNode::Decimal(v) => Ok(v.clone()),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[Decimal]) -> Result<()> {
        let refs: Vec<&Decimal> = values.iter().collect();
        codec.put_decimal_array(&refs, self.format, self.precision, self.scale)
    }

    fn get_all<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<Decimal>> {
        codec.get_decimal_array(self.format, template.len(), self.precision, self.scale)
    }

    fn wrap(&self, native: Decimal) -> ScalarNode {
        ScalarNode::Decimal(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        Ok(ScalarNode::Decimal(Decimal::zero()))
    }
}

/// Decimal codes carried as pre-encoded [`WireDecimal`] images
#[derive(Debug, Clone, Copy)]
pub struct WireDecimalCodec {
    code: WireTypeCode,
    format: DecimalFormat,
    precision: usize,
    scale: u8,
}

impl LeafCodec for WireDecimalCodec {
    type Native = WireDecimal;

    fn type_name(&self) -> &'static str {
        self.code.name()
    }

    fn coerce(&self, scalar: &ScalarNode) -> Result<WireDecimal> {
        match scalar {
            ScalarNode::WireDecimal(v) => {
                if v.format() != self.format
                    || v.precision() != self.precision
                    || v.scale() != self.scale
                {
                    return Err(WireError::InvalidDecimal(format!(
                        "element is {:?}({}, {}), array is {:?}({}, {})",
                        v.format(),
                        v.precision(),
                        v.scale(),
                        self.format,
                        self.precision,
                        self.scale
                    )));
                }
                Ok(v.clone())
            }
            ScalarNode::Decimal(v) => WireDecimal::encode(v, self.format, self.precision, self.scale),
            other => Err(self.unsupported(other)),
        }
    }

    fn put_all<C: PrimitiveCodec>(&self, codec: &mut C, values: &[WireDecimal]) -> Result<()> {
        let refs: Vec<&WireDecimal> = values.iter().collect();
        codec.put_wire_decimal_array(&refs)
    }

    fn get_all<C: PrimitiveCodec>(
        &self,
        codec: &mut C,
        template: &[&ScalarNode],
    ) -> Result<Vec<WireDecimal>> {
        codec.get_wire_decimal_array(self.format, template.len(), self.precision, self.scale)
    }

    fn wrap(&self, native: WireDecimal) -> ScalarNode {
        ScalarNode::WireDecimal(native)
    }

    fn default_scalar(&self) -> Result<ScalarNode> {
        WireDecimal::zero(self.format, self.precision, self.scale).map(ScalarNode::WireDecimal)
    }
}

/// Leaf codec selected once per array
#[derive(Debug, Clone, Copy)]
pub enum ElementCodec {
    /// 32-bit floats
    F32(F32Codec),
    /// 64-bit floats
    F64(F64Codec),
    /// Signed bytes
    I8(IntCodec<i8>),
    /// Unsigned bytes
    U8(IntCodec<u8>),
    /// Signed words
    I16(IntCodec<i16>),
    /// Unsigned words
    U16(IntCodec<u16>),
    /// Signed longwords
    I32(IntCodec<i32>),
    /// Unsigned longwords
    U32(IntCodec<u32>),
    /// Signed quadwords and octawords
    I64(IntCodec<i64>),
    /// Unsigned quadwords and octawords
    U64(IntCodec<u64>),
    /// Booleans
    Bool(BoolCodec),
    /// Strings
    Str(StrCodec),
    /// Structures
    Record(RecordCodec),
    /// Wide decimals
    Decimal(DecimalCodec),
    /// Narrow decimals
    WireDecimal(WireDecimalCodec),
}

macro_rules! dispatch {
    ($self:expr, $codec:ident => $body:expr) => {
        match $self {
            ElementCodec::F32($codec) => $body,
            ElementCodec::F64($codec) => $body,
            ElementCodec::I8($codec) => $body,
            ElementCodec::U8($codec) => $body,
            ElementCodec::I16($codec) => $body,
            ElementCodec::U16($codec) => $body,
            ElementCodec::I32($codec) => $body,
            ElementCodec::U32($codec) => $body,
            ElementCodec::I64($codec) => $body,
            ElementCodec::U64($codec) => $body,
            ElementCodec::Bool($codec) => $body,
            ElementCodec::Str($codec) => $body,
            ElementCodec::Record($codec) => $body,
            ElementCodec::Decimal($codec) => $body,
            ElementCodec::WireDecimal($codec) => $body,
        }
    };
}

impl ElementCodec {
    /// Select the codec for `context`.
    ///
    /// `size` is the effective element size (the largest string for `VSA` arrays, the
    /// header's element length on import). `first` is the first leaf of the array; it picks
    /// the record representation.
    pub fn select(context: &MarshalContext, size: usize, first: Option<&ScalarNode>) -> Result<Self> {
        let code = context.type_code;
        let codec = match code.leaf_kind() {
            LeafKind::Float32 => ElementCodec::F32(F32Codec { code }),
            LeafKind::Float64 { .. } => ElementCodec::F64(F64Codec { code }),
            LeafKind::Int { width, signed } => match (width, signed) {
                (IntWidth::W8, true) => ElementCodec::I8(IntCodec::new(code)),
                (IntWidth::W8, false) => ElementCodec::U8(IntCodec::new(code)),
                (IntWidth::W16, true) => ElementCodec::I16(IntCodec::new(code)),
                (IntWidth::W16, false) => ElementCodec::U16(IntCodec::new(code)),
                (IntWidth::W32, true) => ElementCodec::I32(IntCodec::new(code)),
                (IntWidth::W32, false) => ElementCodec::U32(IntCodec::new(code)),
                (IntWidth::W64 | IntWidth::Octa, true) => ElementCodec::I64(IntCodec::new(code)),
                (IntWidth::W64 | IntWidth::Octa, false) => ElementCodec::U64(IntCodec::new(code)),
            },
            LeafKind::Bool => ElementCodec::Bool(BoolCodec),
            LeafKind::FixedString | LeafKind::VaryingString => ElementCodec::Str(StrCodec {
                code,
                size,
                null_term: context.null_term,
            }),
            LeafKind::Record => ElementCodec::Record(RecordCodec {
                v2: matches!(first, Some(ScalarNode::Record(Record::V2(_)))),
            }),
            LeafKind::Decimal(format) if context.wide_decimal => ElementCodec::Decimal(DecimalCodec {
                code,
                format,
                precision: context.size,
                scale: context.scale,
            }),
            LeafKind::Decimal(format) => ElementCodec::WireDecimal(WireDecimalCodec {
                code,
                format,
                precision: context.size,
                scale: context.scale,
            }),
            LeafKind::Descriptor | LeafKind::Unspecified => {
                return Err(WireError::UnsupportedElementType {
                    type_code: code.name(),
                    found: "element type",
                })
            }
        };
        Ok(codec)
    }

    /// Coerce `leaves` and write them with one bulk put
    pub fn export<C: PrimitiveCodec>(&self, codec: &mut C, leaves: &[&ScalarNode]) -> Result<()> {
        dispatch!(self, c => {
            let values = leaves
                .iter()
                .map(|scalar| c.coerce(scalar))
                .collect::<Result<Vec<_>>>()?;
            c.put_all(codec, &values)
        })
    }

    /// Read one bulk get shaped like `template`
    pub fn import<C: PrimitiveCodec>(&self, codec: &mut C, template: &[&ScalarNode]) -> Result<Vec<ScalarNode>> {
        dispatch!(self, c => {
            let values = c.get_all(codec, template)?;
            Ok(values.into_iter().map(|v| c.wrap(v)).collect())
        })
    }

    /// Fresh leaf for arrays allocated by the importer
    pub fn default_scalar(&self) -> Result<ScalarNode> {
        dispatch!(self, c => c.default_scalar())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descwire_format::WireBuffer;

    fn select(ctx: &MarshalContext) -> ElementCodec {
        ElementCodec::select(ctx, ctx.size, None).unwrap()
    }

    #[test]
    fn test_integer_range_follows_signedness() {
        let byte = select(&MarshalContext::new(WireTypeCode::Byte));
        let mut buf = WireBuffer::new();
        assert!(byte.export(&mut buf, &[&ScalarNode::Int(-128)]).is_ok());
        assert!(matches!(
            byte.export(&mut buf, &[&ScalarNode::Int(300)]),
            Err(WireError::IntegerRangeError { value: 300, type_code: "B" })
        ));

        let ubyte = select(&MarshalContext::new(WireTypeCode::ByteU));
        assert!(ubyte.export(&mut buf, &[&ScalarNode::Int(255)]).is_ok());
        assert!(matches!(
            ubyte.export(&mut buf, &[&ScalarNode::Int(-1)]),
            Err(WireError::IntegerRangeError { .. })
        ));
    }

    #[test]
    fn test_octaword_uses_quad_range() {
        let octa = select(&MarshalContext::new(WireTypeCode::Octa));
        let mut buf = WireBuffer::new();
        assert!(octa
            .export(&mut buf, &[&ScalarNode::Int(i128::from(i64::MIN))])
            .is_ok());
        assert_eq!(buf.len(), 16);
        assert!(octa
            .export(&mut buf, &[&ScalarNode::Int(i128::from(i64::MAX) + 1)])
            .is_err());
    }

    #[test]
    fn test_float_accepts_ints_but_ints_reject_floats() {
        let float = select(&MarshalContext::new(WireTypeCode::IeeeSingle));
        let mut buf = WireBuffer::new();
        float
            .export(&mut buf, &[&ScalarNode::Int(3), &ScalarNode::Float64(1.5)])
            .unwrap();
        assert_eq!(buf.len(), 8);

        let long = select(&MarshalContext::new(WireTypeCode::Long));
        assert!(matches!(
            long.export(&mut buf, &[&ScalarNode::Float32(1.0)]),
            Err(WireError::UnsupportedElementType { type_code: "L", found: "float32" })
        ));
    }

    #[test]
    fn test_record_representation_must_match() {
        let legacy = StructRecord::new(vec![1, 2], 2).unwrap();
        let v2 = V2Record::new("S", legacy.clone());
        let first = ScalarNode::Record(Record::V2(v2));
        let ctx = MarshalContext::new(WireTypeCode::Struct);
        let codec = ElementCodec::select(&ctx, 0, Some(&first)).unwrap();

        let mut buf = WireBuffer::new();
        let mixed = ScalarNode::Record(Record::Legacy(legacy));
        assert!(matches!(
            codec.export(&mut buf, &[&first, &mixed]),
            Err(WireError::UnsupportedElementType { found: "record", .. })
        ));
        assert!(codec.default_scalar().is_err());
    }

    #[test]
    fn test_narrow_decimals() {
        let ctx = MarshalContext::new(WireTypeCode::Packed)
            .with_size(5)
            .with_scale(2)
            .with_wide_decimal(false);
        let codec = select(&ctx);
        let value = Decimal::from_str_exact("1.25").unwrap();
        let mut buf = WireBuffer::new();
        codec
            .export(&mut buf, &[&ScalarNode::Decimal(value.clone())])
            .unwrap();
        assert_eq!(buf.as_bytes(), &[0x00, 0x12, 0x5C]);

        let mismatched = WireDecimal::encode(&value, DecimalFormat::Packed, 5, 3).unwrap();
        assert!(matches!(
            codec.export(&mut buf, &[&ScalarNode::WireDecimal(mismatched)]),
            Err(WireError::InvalidDecimal(_))
        ));

        let wide = select(&ctx.clone().with_wide_decimal(true));
        let encoded = WireDecimal::encode(&value, DecimalFormat::Packed, 5, 2).unwrap();
        assert!(matches!(
            wide.export(&mut buf, &[&ScalarNode::WireDecimal(encoded)]),
            Err(WireError::UnsupportedElementType { .. })
        ));
    }

    #[test]
    fn test_default_scalars() {
        let ctx = MarshalContext::new(WireTypeCode::NumericLeftSeparate)
            .with_size(3)
            .with_wide_decimal(false);
        match select(&ctx).default_scalar().unwrap() {
            ScalarNode::WireDecimal(w) => assert_eq!(w.as_bytes(), b"+000"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            select(&MarshalContext::new(WireTypeCode::VaryingText))
                .default_scalar()
                .unwrap(),
            ScalarNode::Str(String::new())
        );
    }
}
