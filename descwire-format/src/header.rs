//! Array descriptor header structures
//!
//! An array descriptor is `24 + 12 * dims` bytes, little-endian, followed by zero padding up
//! to a 16-byte boundary where the value area begins:
//!
//! ```text
//! 0  u16  element length       11 u8   dimension count
//! 2  u8   type code            12 u32  array size in bytes
//! 3  u8   class code           16 u32  A0 (value area offset)
//! 4  u32  pointer (value area) 20 u32  multipliers, one per dimension
//! 8  u8   scale                   i32  (lower, upper) pairs, level n at slot n-1
//! 9  u8   digits (always 0)
//! 10 u8   array flags
//! ```

use crate::constants::*;
use crate::error::{Result, WireError};
use crate::types::{WireClassCode, WireTypeCode};

/// Parameters written into an array descriptor by the exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    /// Element type code
    pub type_code: WireTypeCode,
    /// Class code
    pub class_code: WireClassCode,
    /// Element size (string length or decimal precision); 0 for a dynamic string array
    pub size: usize,
    /// Decimal scale
    pub scale: u8,
    /// Number of dimensions
    pub dim_count: usize,
    /// Row-major storage; cleared sets the column-major flag for class `A`
    pub row_major: bool,
}

impl ArrayHeader {
    /// Whether this header opens a dynamic string array (`T` with size 0)
    pub fn is_dynamic_string(&self) -> bool {
        self.type_code == WireTypeCode::Text && self.size == 0
    }

    /// Type code as written to the wire
    pub fn wire_type(&self) -> WireTypeCode {
        if self.is_dynamic_string() {
            WireTypeCode::Descriptor
        } else {
            self.type_code
        }
    }

    /// Element length field as written to the wire
    pub fn element_length(&self) -> u16 {
        if self.is_dynamic_string() {
            DYNAMIC_STRING_DESCRIPTOR_LEN as u16
        } else {
            (self.size & 0xffff) as u16
        }
    }

    /// Array flags byte
    pub fn aflags(&self) -> u8 {
        if self.class_code == WireClassCode::Array {
            if self.row_major {
                AFLAG_COEFF_AND_BOUNDS
            } else {
                AFLAG_COEFF_AND_BOUNDS + AFLAG_COLUMN_MAJOR
            }
        } else {
            AFLAG_NO_DEALLOCATE
        }
    }

    /// Descriptor length before alignment padding
    pub fn encoded_len(&self) -> usize {
        ARRAY_HEADER_FIXED_LEN + self.dim_count * ARRAY_HEADER_DIM_LEN
    }

    /// Encode the descriptor with the given value area offset.
    ///
    /// Array size, multipliers and bounds are left zero; they are filled per dimension.
    pub fn encode(&self, value_offset: u32) -> Result<Vec<u8>> {
        let dims = u8::try_from(self.dim_count).map_err(|_| {
            WireError::LimitExceeded(format!(
                "Dimension count {} does not fit the descriptor",
                self.dim_count
            ))
        })?;

        let mut out = vec![0u8; self.encoded_len()];
        out[HDR_OFFSET_LENGTH..HDR_OFFSET_LENGTH + 2]
            .copy_from_slice(&self.element_length().to_le_bytes());
        out[HDR_OFFSET_TYPE] = self.wire_type() as u8;
        out[HDR_OFFSET_CLASS] = self.class_code as u8;
        out[HDR_OFFSET_POINTER..HDR_OFFSET_POINTER + 4].copy_from_slice(&value_offset.to_le_bytes());
        out[HDR_OFFSET_SCALE] = self.scale;
        out[HDR_OFFSET_DIGITS] = 0;
        out[HDR_OFFSET_AFLAGS] = self.aflags();
        out[HDR_OFFSET_DIMS] = dims;
        out[HDR_OFFSET_A0..HDR_OFFSET_A0 + 4].copy_from_slice(&value_offset.to_le_bytes());
        Ok(out)
    }
}

/// Offset of the multiplier for dimension slot `slot` relative to the descriptor start
pub fn multiplier_offset(slot: usize) -> usize {
    HDR_OFFSET_MULTIPLIERS + slot * 4
}

/// Offset of the `(lower, upper)` pair for dimension slot `slot`
pub fn bounds_offset(dims: usize, slot: usize) -> usize {
    HDR_OFFSET_MULTIPLIERS + dims * 4 + slot * 8
}

/// Bytes per element used in the array size computation
pub fn payload_element_len(type_code: WireTypeCode, element_length: usize) -> usize {
    if type_code == WireTypeCode::Packed {
        element_length / 2 + 1
    } else {
        element_length
    }
}

/// Decoded array descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDescriptor {
    /// Element length field
    pub element_length: u16,
    /// Type code on the wire (`DSC` for dynamic string arrays)
    pub type_code: WireTypeCode,
    /// Class code
    pub class_code: WireClassCode,
    /// Value area offset
    pub pointer: u32,
    /// Decimal scale
    pub scale: u8,
    /// Array flags
    pub aflags: u8,
    /// Total array size in bytes
    pub array_size: u32,
    /// A0 field
    pub a0: u32,
    /// Multiplier per dimension slot
    pub multipliers: Vec<u32>,
    /// `(lower, upper)` per dimension slot
    pub bounds: Vec<(i32, i32)>,
}

impl ArrayDescriptor {
    /// Decode a descriptor from the start of `bytes`.
    ///
    /// Returns the descriptor and the unpadded descriptor length.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < ARRAY_HEADER_FIXED_LEN {
            return Err(WireError::UnexpectedEof);
        }

        let dims = bytes[HDR_OFFSET_DIMS] as usize;
        let total = ARRAY_HEADER_FIXED_LEN + dims * ARRAY_HEADER_DIM_LEN;
        if bytes.len() < total {
            return Err(WireError::UnexpectedEof);
        }

        let type_code = WireTypeCode::from_u8(bytes[HDR_OFFSET_TYPE])?;
        let class_code = WireClassCode::from_u8(bytes[HDR_OFFSET_CLASS])?;

        let multipliers = (0..dims)
            .map(|slot| read_u32(bytes, multiplier_offset(slot)))
            .collect();
        let bounds = (0..dims)
            .map(|slot| {
                let at = bounds_offset(dims, slot);
                (read_u32(bytes, at) as i32, read_u32(bytes, at + 4) as i32)
            })
            .collect();

        let descriptor = Self {
            element_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            type_code,
            class_code,
            pointer: read_u32(bytes, HDR_OFFSET_POINTER),
            scale: bytes[HDR_OFFSET_SCALE],
            aflags: bytes[HDR_OFFSET_AFLAGS],
            array_size: read_u32(bytes, HDR_OFFSET_ARRAY_SIZE),
            a0: read_u32(bytes, HDR_OFFSET_A0),
            multipliers,
            bounds,
        };
        Ok((descriptor, total))
    }

    /// Number of dimensions
    pub fn dim_count(&self) -> usize {
        self.bounds.len()
    }

    /// Whether the value area holds string descriptors
    pub fn is_dynamic_string(&self) -> bool {
        self.type_code == WireTypeCode::Descriptor
    }

    /// Whether the column-major flag is set
    pub fn is_column_major(&self) -> bool {
        self.class_code == WireClassCode::Array && self.aflags & AFLAG_COLUMN_MAJOR != 0
    }

    /// Extents in level order, outermost first
    pub fn extents(&self) -> Vec<usize> {
        self.bounds
            .iter()
            .rev()
            .map(|&(lower, upper)| (i64::from(upper) - i64::from(lower) + 1).max(0) as usize)
            .collect()
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(type_code: WireTypeCode, class_code: WireClassCode, size: usize) -> ArrayHeader {
        ArrayHeader {
            type_code,
            class_code,
            size,
            scale: 0,
            dim_count: 2,
            row_major: true,
        }
    }

    #[test]
    fn test_encode_fixed_fields() {
        let hdr = ArrayHeader {
            scale: 3,
            ..header(WireTypeCode::Long, WireClassCode::Array, 4)
        };
        let bytes = hdr.encode(48).unwrap();

        assert_eq!(bytes.len(), 24 + 2 * 12);
        assert_eq!(&bytes[0..2], &4u16.to_le_bytes());
        assert_eq!(bytes[2], DTYPE_L);
        assert_eq!(bytes[3], CLASS_A);
        assert_eq!(&bytes[4..8], &48u32.to_le_bytes());
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[9], 0);
        assert_eq!(bytes[10], 192);
        assert_eq!(bytes[11], 2);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &48u32.to_le_bytes());
        assert!(bytes[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aflags() {
        let mut hdr = header(WireTypeCode::Long, WireClassCode::Array, 4);
        assert_eq!(hdr.aflags(), 192);
        hdr.row_major = false;
        assert_eq!(hdr.aflags(), 224);
        hdr.class_code = WireClassCode::Static;
        assert_eq!(hdr.aflags(), 64);
    }

    #[test]
    fn test_dynamic_string_header() {
        let hdr = header(WireTypeCode::Text, WireClassCode::Array, 0);
        assert!(hdr.is_dynamic_string());
        assert_eq!(hdr.wire_type(), WireTypeCode::Descriptor);
        assert_eq!(hdr.element_length(), 8);

        let fixed = header(WireTypeCode::Text, WireClassCode::Array, 10);
        assert!(!fixed.is_dynamic_string());
        assert_eq!(fixed.wire_type(), WireTypeCode::Text);
    }

    #[test]
    fn test_element_length_truncates_to_u16() {
        let hdr = header(WireTypeCode::Text, WireClassCode::Array, 0x1_0005);
        assert_eq!(hdr.element_length(), 5);
    }

    #[test]
    fn test_encode_rejects_too_many_dimensions() {
        let hdr = ArrayHeader {
            dim_count: 256,
            ..header(WireTypeCode::Byte, WireClassCode::Array, 1)
        };
        assert!(matches!(hdr.encode(0), Err(WireError::LimitExceeded(_))));
    }

    #[test]
    fn test_decode_reads_bounds_and_multipliers() {
        let hdr = header(WireTypeCode::Word, WireClassCode::Array, 2);
        let mut bytes = hdr.encode(64).unwrap();
        // slot 1 = outer level (3 elements), slot 0 = inner level (5 elements)
        bytes[multiplier_offset(0)..multiplier_offset(0) + 4].copy_from_slice(&5u32.to_le_bytes());
        bytes[multiplier_offset(1)..multiplier_offset(1) + 4].copy_from_slice(&3u32.to_le_bytes());
        let b0 = bounds_offset(2, 0);
        bytes[b0 + 4..b0 + 8].copy_from_slice(&4i32.to_le_bytes());
        let b1 = bounds_offset(2, 1);
        bytes[b1 + 4..b1 + 8].copy_from_slice(&2i32.to_le_bytes());

        let (desc, len) = ArrayDescriptor::decode(&bytes).unwrap();
        assert_eq!(len, 48);
        assert_eq!(desc.type_code, WireTypeCode::Word);
        assert_eq!(desc.pointer, 64);
        assert_eq!(desc.a0, 64);
        assert_eq!(desc.multipliers, vec![5, 3]);
        assert_eq!(desc.bounds, vec![(0, 4), (0, 2)]);
        assert_eq!(desc.extents(), vec![3, 5]);
        assert!(!desc.is_column_major());
    }

    #[test]
    fn test_decode_truncated() {
        let hdr = header(WireTypeCode::Word, WireClassCode::Array, 2);
        let bytes = hdr.encode(64).unwrap();
        assert!(matches!(
            ArrayDescriptor::decode(&bytes[..10]),
            Err(WireError::UnexpectedEof)
        ));
        assert!(matches!(
            ArrayDescriptor::decode(&bytes[..30]),
            Err(WireError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_decode_unknown_codes() {
        let hdr = header(WireTypeCode::Word, WireClassCode::Array, 2);
        let mut bytes = hdr.encode(64).unwrap();
        bytes[2] = 99;
        assert!(matches!(
            ArrayDescriptor::decode(&bytes),
            Err(WireError::UnknownTypeCode(99))
        ));
        bytes[2] = DTYPE_W;
        bytes[3] = 3;
        assert!(matches!(
            ArrayDescriptor::decode(&bytes),
            Err(WireError::UnknownClassCode(3))
        ));
    }

    #[test]
    fn test_payload_element_len_for_packed() {
        assert_eq!(payload_element_len(WireTypeCode::Packed, 7), 4);
        assert_eq!(payload_element_len(WireTypeCode::Packed, 8), 5);
        assert_eq!(payload_element_len(WireTypeCode::NumericZoned, 7), 7);
    }
}
