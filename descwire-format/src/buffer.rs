//! Wire buffer primitive codec
//!
//! [`PrimitiveCodec`] is the seam the array marshaller writes through: one header, one
//! bound pair per dimension, then one bulk put per leaf array. [`WireBuffer`] is the
//! little-endian implementation over a growable byte vector.

use crate::constants::*;
use crate::decimal::{Decimal, WireDecimal};
use crate::error::{Result, WireError};
use crate::header::{bounds_offset, multiplier_offset, payload_element_len, ArrayDescriptor, ArrayHeader};
use crate::record::{StructRecord, V2Record};
use crate::types::{DecimalFormat, IntWidth, LeafKind, WireTypeCode};

/// Native integer types carried by the integer wire codes
pub trait WireInt: Copy + Default + Send + 'static {
    /// Native width in bytes
    const WIDTH: usize;
    /// Whether the type is signed
    const SIGNED: bool;

    /// Widen to i128
    fn to_i128(self) -> i128;
    /// Narrow from i128, `None` when out of range
    fn from_i128(value: i128) -> Option<Self>;
    /// Little-endian bytes into `out` (exactly `WIDTH` long)
    fn write_le(self, out: &mut [u8]);
    /// Read from the first `WIDTH` little-endian bytes
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_int {
    ($($ty:ty => $signed:expr),* $(,)?) => {
        $(
            impl WireInt for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                const SIGNED: bool = $signed;

                fn to_i128(self) -> i128 {
                    i128::from(self)
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_wire_int!(
    i8 => true,
    u8 => false,
    i16 => true,
    u16 => false,
    i32 => true,
    u32 => false,
    i64 => true,
    u64 => false,
);

/// Primitive operations the array marshaller needs from a wire buffer
pub trait PrimitiveCodec {
    /// Current absolute position
    fn position(&self) -> usize;

    /// Write an array descriptor and move to its value area. Returns the descriptor offset.
    fn put_array_header(&mut self, header: &ArrayHeader) -> Result<usize>;
    /// Record bounds for dimension `level` (outermost is `dim_count`, innermost is 1)
    fn put_array_dim(&mut self, level: usize, lower: i32, upper: i32) -> Result<()>;
    /// Read an array descriptor and move to its value area
    fn get_array_header(&mut self) -> Result<ArrayDescriptor>;

    /// Bulk put of 32-bit floats
    fn put_f32_array(&mut self, values: &[f32], code: WireTypeCode) -> Result<()>;
    /// Bulk get of 32-bit floats
    fn get_f32_array(&mut self, code: WireTypeCode, count: usize) -> Result<Vec<f32>>;
    /// Bulk put of 64-bit floats
    fn put_f64_array(&mut self, values: &[f64], code: WireTypeCode) -> Result<()>;
    /// Bulk get of 64-bit floats
    fn get_f64_array(&mut self, code: WireTypeCode, count: usize) -> Result<Vec<f64>>;

    /// Bulk put of integers
    fn put_int_array<T: WireInt>(&mut self, values: &[T], code: WireTypeCode) -> Result<()>;
    /// Bulk get of integers
    fn get_int_array<T: WireInt>(&mut self, code: WireTypeCode, count: usize) -> Result<Vec<T>>;

    /// Bulk put of booleans
    fn put_bool_array(&mut self, values: &[bool]) -> Result<()>;
    /// Bulk get of booleans
    fn get_bool_array(&mut self, count: usize) -> Result<Vec<bool>>;

    /// Bulk put of strings with element size `size`
    fn put_str_array(
        &mut self,
        values: &[&str],
        code: WireTypeCode,
        size: usize,
        null_term: bool,
    ) -> Result<()>;
    /// Bulk get of strings with element size `size`
    fn get_str_array(&mut self, code: WireTypeCode, count: usize, size: usize)
        -> Result<Vec<String>>;

    /// Bulk put of legacy structures
    fn put_record_array(&mut self, values: &[&StructRecord]) -> Result<()>;
    /// Bulk get of legacy structures shaped like `templates`
    fn get_record_array(&mut self, templates: &[&StructRecord]) -> Result<Vec<StructRecord>>;
    /// Bulk put of v2 structures
    fn put_v2_record_array(&mut self, values: &[&V2Record]) -> Result<()>;
    /// Bulk get of v2 structures shaped like `templates`
    fn get_v2_record_array(&mut self, templates: &[&V2Record]) -> Result<Vec<V2Record>>;

    /// Bulk put of pre-encoded decimals
    fn put_wire_decimal_array(&mut self, values: &[&WireDecimal]) -> Result<()>;
    /// Bulk get of pre-encoded decimals
    fn get_wire_decimal_array(
        &mut self,
        format: DecimalFormat,
        count: usize,
        precision: usize,
        scale: u8,
    ) -> Result<Vec<WireDecimal>>;
    /// Bulk put of wide decimals, encoded at `precision` and `scale`
    fn put_decimal_array(
        &mut self,
        values: &[&Decimal],
        format: DecimalFormat,
        precision: usize,
        scale: u8,
    ) -> Result<()>;
    /// Bulk get of wide decimals
    fn get_decimal_array(
        &mut self,
        format: DecimalFormat,
        count: usize,
        precision: usize,
        scale: u8,
    ) -> Result<Vec<Decimal>>;
}

/// Growable little-endian wire buffer
#[derive(Debug, Clone, Default)]
pub struct WireBuffer {
    data: Vec<u8>,
    pos: usize,
    header_at: Option<usize>,
    descriptor_pos: usize,
}

impl WireBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Buffer positioned at the start of existing bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Written bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning its bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Number of bytes held
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move to an absolute position
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Zero-pad up to the next multiple of `alignment` (absolute offset)
    pub fn align_to(&mut self, alignment: usize) {
        if alignment <= 1 {
            return;
        }
        let rem = self.pos % alignment;
        if rem != 0 {
            self.pos += alignment - rem;
        }
        if self.data.len() < self.pos {
            self.data.resize(self.pos, 0);
        }
    }

    fn write_at(&mut self, at: usize, bytes: &[u8]) {
        let end = at + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[at..end].copy_from_slice(bytes);
    }

    fn write(&mut self, bytes: &[u8]) {
        self.write_at(self.pos, bytes);
        self.pos += bytes.len();
    }

    fn write_fill(&mut self, byte: u8, count: usize) {
        let end = self.pos + count;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].fill(byte);
        self.pos = end;
    }

    fn slice_at(&self, at: usize, len: usize) -> Result<&[u8]> {
        let end = at.checked_add(len).ok_or(WireError::UnexpectedEof)?;
        self.data.get(at..end).ok_or(WireError::UnexpectedEof)
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.pos;
        let end = start.checked_add(len).ok_or(WireError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(WireError::UnexpectedEof);
        }
        self.pos = end;
        Ok(&self.data[start..end])
    }

    fn u16_at(&self, at: usize) -> Result<u16> {
        let b = self.slice_at(at, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_at(&self, at: usize) -> Result<u32> {
        let b = self.slice_at(at, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32_at(&self, at: usize) -> Result<i32> {
        Ok(self.u32_at(at)? as i32)
    }

    fn put_u32_at(&mut self, at: usize, value: u32) {
        self.write_at(at, &value.to_le_bytes());
    }

    fn header_offset(&self) -> Result<usize> {
        self.header_at.ok_or(WireError::MissingArrayHeader)
    }

    fn put_dynamic_strings(&mut self, values: &[&str]) -> Result<()> {
        let header_at = self.header_offset()?;
        if self.slice_at(header_at + HDR_OFFSET_TYPE, 1)?[0] != DTYPE_DSC {
            return Err(WireError::MissingArrayHeader);
        }

        for value in values {
            let bytes = latin1_bytes(value)?;
            let len = u16::try_from(bytes.len()).map_err(|_| {
                WireError::LimitExceeded(format!(
                    "dynamic string of {} characters exceeds 65535",
                    bytes.len()
                ))
            })?;
            let offset = offset_u32(self.pos)?;

            let mut descriptor = [0u8; DYNAMIC_STRING_DESCRIPTOR_LEN];
            descriptor[0..2].copy_from_slice(&len.to_le_bytes());
            descriptor[2] = DTYPE_T;
            descriptor[3] = CLASS_D;
            descriptor[4..8].copy_from_slice(&offset.to_le_bytes());
            self.write_at(self.descriptor_pos, &descriptor);
            self.descriptor_pos += DYNAMIC_STRING_DESCRIPTOR_LEN;

            self.write(&bytes);
            self.write(&[0]);
        }
        Ok(())
    }

    fn get_dynamic_strings(&mut self, count: usize) -> Result<Vec<String>> {
        self.header_offset()?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let len = self.u16_at(self.descriptor_pos)? as usize;
            let offset = self.u32_at(self.descriptor_pos + 4)? as usize;
            self.descriptor_pos += DYNAMIC_STRING_DESCRIPTOR_LEN;
            out.push(latin1_string(self.slice_at(offset, len)?));
            self.pos = offset + len + 1;
        }
        Ok(out)
    }

    fn put_fixed_string(&mut self, value: &str, code: WireTypeCode, size: usize, null_term: bool) -> Result<()> {
        let bytes = latin1_bytes(value)?;
        let used = if size == 0 { bytes.len() } else { bytes.len().min(size) };

        if code == WireTypeCode::VaryingText {
            let count = u16::try_from(used).map_err(|_| {
                WireError::LimitExceeded(format!("varying string of {used} characters exceeds 65535"))
            })?;
            self.write(&count.to_le_bytes());
        }

        self.write(&bytes[..used]);
        if size == 0 && used > 0 {
            self.write(&[0]);
        } else if used < size {
            self.write_fill(if null_term { 0 } else { b' ' }, size - used);
        } else if size > 0 && null_term {
            let last = self.pos - 1;
            self.data[last] = 0;
        }
        Ok(())
    }

    fn get_fixed_string(&mut self, code: WireTypeCode, size: usize) -> Result<String> {
        if code == WireTypeCode::VaryingText {
            let count = self.u16_at(self.pos)? as usize;
            self.pos += 2;
            // unsized slots carry a NUL after any non-empty value
            let slot = match size {
                0 if count > 0 => count + 1,
                0 => 0,
                _ => size,
            };
            let raw = self.take(slot)?;
            return Ok(latin1_string(&raw[..count.min(slot)]));
        }

        let raw = self.take(size)?;
        let end = raw
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        Ok(latin1_string(&raw[..end]))
    }
}

fn dimension_overflow(what: &str) -> WireError {
    WireError::LimitExceeded(format!("{what} overflows 64 bits"))
}

fn offset_u32(offset: usize) -> Result<u32> {
    u32::try_from(offset)
        .map_err(|_| WireError::LimitExceeded(format!("buffer offset {offset} exceeds 32 bits")))
}

fn latin1_bytes(value: &str) -> Result<Vec<u8>> {
    value
        .chars()
        .map(|ch| {
            u8::try_from(u32::from(ch)).map_err(|_| {
                WireError::InvalidString(format!("character {ch:?} is outside Latin-1 in {value:?}"))
            })
        })
        .collect()
}

fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn int_width(code: WireTypeCode) -> Result<(IntWidth, bool)> {
    match code.leaf_kind() {
        LeafKind::Int { width, signed } => Ok((width, signed)),
        _ => Err(WireError::Internal(format!("{code} is not an integer code"))),
    }
}

fn check_native_width<T: WireInt>(code: WireTypeCode, width: IntWidth) -> Result<()> {
    let native = match width {
        IntWidth::Octa => 8,
        other => other.wire_len(),
    };
    if native != T::WIDTH {
        return Err(WireError::Internal(format!(
            "{code} carries {native}-byte values, got a {}-byte integer",
            T::WIDTH
        )));
    }
    Ok(())
}

impl PrimitiveCodec for WireBuffer {
    fn position(&self) -> usize {
        self.pos
    }

    fn put_array_header(&mut self, header: &ArrayHeader) -> Result<usize> {
        let start = self.pos;
        let unpadded = start + header.encoded_len();
        let value_offset = unpadded.div_ceil(ARRAY_VALUE_ALIGNMENT) * ARRAY_VALUE_ALIGNMENT;

        let bytes = header.encode(offset_u32(value_offset)?)?;
        self.write(&bytes);
        self.align_to(ARRAY_VALUE_ALIGNMENT);

        self.header_at = Some(start);
        self.descriptor_pos = value_offset;
        self.pos = value_offset;
        Ok(start)
    }

    fn put_array_dim(&mut self, level: usize, lower: i32, upper: i32) -> Result<()> {
        let at = self.header_offset()?;
        let elem_len = self.u16_at(at + HDR_OFFSET_LENGTH)? as usize;
        let type_byte = self.slice_at(at + HDR_OFFSET_TYPE, 1)?[0];
        let class_byte = self.slice_at(at + HDR_OFFSET_CLASS, 1)?[0];
        let dims = self.slice_at(at + HDR_OFFSET_DIMS, 1)?[0] as usize;

        if level == 0 || level > dims {
            return Err(WireError::Internal(format!(
                "dimension level {level} outside 1..={dims}"
            )));
        }

        let type_code = WireTypeCode::from_u8(type_byte)?;
        let elem_len = payload_element_len(type_code, elem_len) as i64;
        let slot = level - 1;

        let bounds_at = at + bounds_offset(dims, slot);
        self.write_at(bounds_at, &lower.to_le_bytes());
        self.write_at(bounds_at + 4, &upper.to_le_bytes());

        let extent = |lo: i32, hi: i32| i64::from(hi) - i64::from(lo) + 1;
        let multiplier = if class_byte == CLASS_A {
            extent(lower, upper)
        } else if level == dims {
            elem_len
        } else {
            let stride = i64::from(self.u32_at(at + multiplier_offset(level))?);
            let outer_at = at + bounds_offset(dims, level);
            extent(self.i32_at(outer_at)?, self.i32_at(outer_at + 4)?)
                .checked_mul(stride)
                .ok_or_else(|| dimension_overflow("stride"))?
        };
        let multiplier = u32::try_from(multiplier).map_err(|_| {
            WireError::LimitExceeded(format!("multiplier {multiplier} does not fit 32 bits"))
        })?;
        self.put_u32_at(at + multiplier_offset(slot), multiplier);

        if level == 1 {
            let mut array_size = elem_len;
            for s in 0..dims {
                let pair_at = at + bounds_offset(dims, s);
                array_size = array_size
                    .checked_mul(extent(self.i32_at(pair_at)?, self.i32_at(pair_at + 4)?))
                    .ok_or_else(|| dimension_overflow("array size"))?;
            }
            let array_size = u32::try_from(array_size).map_err(|_| {
                WireError::LimitExceeded(format!("array size {array_size} does not fit 32 bits"))
            })?;
            self.put_u32_at(at + HDR_OFFSET_ARRAY_SIZE, array_size);

            self.pos = if type_byte == DTYPE_DSC {
                self.descriptor_pos + array_size as usize
            } else {
                self.descriptor_pos
            };
        } else {
            self.pos = self.descriptor_pos;
        }
        Ok(())
    }

    fn get_array_header(&mut self) -> Result<ArrayDescriptor> {
        let start = self.pos;
        let (descriptor, _) = ArrayDescriptor::decode(self.data.get(start..).unwrap_or(&[]))?;

        self.header_at = Some(start);
        self.descriptor_pos = descriptor.pointer as usize;
        self.pos = if descriptor.is_dynamic_string() {
            self.descriptor_pos + descriptor.array_size as usize
        } else {
            self.descriptor_pos
        };
        Ok(descriptor)
    }

    fn put_f32_array(&mut self, values: &[f32], _code: WireTypeCode) -> Result<()> {
        for value in values {
            self.write(&value.to_le_bytes());
        }
        Ok(())
    }

    fn get_f32_array(&mut self, _code: WireTypeCode, count: usize) -> Result<Vec<f32>> {
        let raw = self.take(count * 4)?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn put_f64_array(&mut self, values: &[f64], code: WireTypeCode) -> Result<()> {
        let extended = code == WireTypeCode::IeeeExtended;
        for value in values {
            self.write(&value.to_le_bytes());
            if extended {
                self.write_fill(0, 8);
            }
        }
        Ok(())
    }

    fn get_f64_array(&mut self, code: WireTypeCode, count: usize) -> Result<Vec<f64>> {
        let slot = if code == WireTypeCode::IeeeExtended { 16 } else { 8 };
        let raw = self.take(count * slot)?;
        Ok(raw
            .chunks_exact(slot)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    fn put_int_array<T: WireInt>(&mut self, values: &[T], code: WireTypeCode) -> Result<()> {
        let (width, signed) = int_width(code)?;
        check_native_width::<T>(code, width)?;

        let mut slot = [0u8; 16];
        for &value in values {
            value.write_le(&mut slot[..T::WIDTH]);
            if width == IntWidth::Octa {
                let extension = if signed && value.to_i128() < 0 { 0xFF } else { 0 };
                slot[8..16].fill(extension);
                self.write(&slot);
            } else {
                self.write(&slot[..T::WIDTH]);
            }
        }
        Ok(())
    }

    fn get_int_array<T: WireInt>(&mut self, code: WireTypeCode, count: usize) -> Result<Vec<T>> {
        let (width, signed) = int_width(code)?;
        check_native_width::<T>(code, width)?;

        let slot = width.wire_len();
        let raw = self.take(count * slot)?;
        let mut out = Vec::with_capacity(count);
        for chunk in raw.chunks_exact(slot) {
            let value = T::read_le(chunk);
            if width == IntWidth::Octa {
                let low_negative = signed && chunk[7] & 0x80 != 0;
                let extension = if low_negative { 0xFF } else { 0 };
                if chunk[8..16].iter().any(|&b| b != extension) {
                    let mut wide = [0u8; 16];
                    wide.copy_from_slice(chunk);
                    let value = if signed {
                        i128::from_le_bytes(wide)
                    } else {
                        u128::from_le_bytes(wide).min(i128::MAX as u128) as i128
                    };
                    return Err(WireError::IntegerRangeError {
                        value,
                        type_code: code.name(),
                    });
                }
            }
            out.push(value);
        }
        Ok(out)
    }

    fn put_bool_array(&mut self, values: &[bool]) -> Result<()> {
        for &value in values {
            self.write(&[u8::from(value)]);
        }
        Ok(())
    }

    fn get_bool_array(&mut self, count: usize) -> Result<Vec<bool>> {
        Ok(self.take(count)?.iter().map(|&b| b != 0).collect())
    }

    fn put_str_array(
        &mut self,
        values: &[&str],
        code: WireTypeCode,
        size: usize,
        null_term: bool,
    ) -> Result<()> {
        if code == WireTypeCode::Text && size == 0 {
            return self.put_dynamic_strings(values);
        }
        for value in values {
            self.put_fixed_string(value, code, size, null_term)?;
        }
        Ok(())
    }

    fn get_str_array(
        &mut self,
        code: WireTypeCode,
        count: usize,
        size: usize,
    ) -> Result<Vec<String>> {
        if code == WireTypeCode::Text && size == 0 {
            return self.get_dynamic_strings(count);
        }
        (0..count).map(|_| self.get_fixed_string(code, size)).collect()
    }

    fn put_record_array(&mut self, values: &[&StructRecord]) -> Result<()> {
        let Some(first) = values.first() else {
            return Ok(());
        };
        let alignment = first.alignment();
        for record in values {
            self.align_to(alignment);
            self.write(record.as_bytes());
        }
        Ok(())
    }

    fn get_record_array(&mut self, templates: &[&StructRecord]) -> Result<Vec<StructRecord>> {
        let Some(first) = templates.first() else {
            return Ok(Vec::new());
        };
        let alignment = first.alignment();
        let mut out = Vec::with_capacity(templates.len());
        for template in templates {
            self.align_to(alignment);
            let bytes = self.take(template.len())?.to_vec();
            out.push(StructRecord::new(bytes, template.alignment())?);
        }
        Ok(out)
    }

    fn put_v2_record_array(&mut self, values: &[&V2Record]) -> Result<()> {
        let inner: Vec<&StructRecord> = values.iter().map(|v| v.inner()).collect();
        self.put_record_array(&inner)
    }

    fn get_v2_record_array(&mut self, templates: &[&V2Record]) -> Result<Vec<V2Record>> {
        let inner: Vec<&StructRecord> = templates.iter().map(|v| v.inner()).collect();
        let images = self.get_record_array(&inner)?;
        Ok(templates
            .iter()
            .zip(images)
            .map(|(template, image)| V2Record::new(template.name(), image))
            .collect())
    }

    fn put_wire_decimal_array(&mut self, values: &[&WireDecimal]) -> Result<()> {
        for value in values {
            self.write(value.as_bytes());
        }
        Ok(())
    }

    fn get_wire_decimal_array(
        &mut self,
        format: DecimalFormat,
        count: usize,
        precision: usize,
        scale: u8,
    ) -> Result<Vec<WireDecimal>> {
        let len = format.byte_count(precision);
        (0..count)
            .map(|_| {
                let bytes = self.take(len)?.to_vec();
                WireDecimal::from_bytes(format, precision, scale, bytes)
            })
            .collect()
    }

    fn put_decimal_array(
        &mut self,
        values: &[&Decimal],
        format: DecimalFormat,
        precision: usize,
        scale: u8,
    ) -> Result<()> {
        for value in values {
            let encoded = WireDecimal::encode(value, format, precision, scale)?;
            self.write(encoded.as_bytes());
        }
        Ok(())
    }

    fn get_decimal_array(
        &mut self,
        format: DecimalFormat,
        count: usize,
        precision: usize,
        scale: u8,
    ) -> Result<Vec<Decimal>> {
        self.get_wire_decimal_array(format, count, precision, scale)?
            .iter()
            .map(WireDecimal::to_decimal)
            .collect()
    }
}
