//! Constants for the descriptor wire layout

/// Unspecified data type.
pub const DTYPE_Z: u8 = 0;
/// Aligned bit string, carried as one byte per boolean.
pub const DTYPE_V: u8 = 1;
/// Byte (unsigned), 8-bit.
pub const DTYPE_BU: u8 = 2;
/// Word (unsigned), 16-bit.
pub const DTYPE_WU: u8 = 3;
/// Longword (unsigned), 32-bit.
pub const DTYPE_LU: u8 = 4;
/// Quadword (unsigned), 64-bit.
pub const DTYPE_QU: u8 = 5;
/// Byte integer (signed), 8-bit.
pub const DTYPE_B: u8 = 6;
/// Word integer (signed), 16-bit.
pub const DTYPE_W: u8 = 7;
/// Longword integer (signed), 32-bit.
pub const DTYPE_L: u8 = 8;
/// Quadword integer (signed), 64-bit.
pub const DTYPE_Q: u8 = 9;
/// F_floating, 32-bit.
pub const DTYPE_F: u8 = 10;
/// D_floating, 64-bit.
pub const DTYPE_D: u8 = 11;
/// Character string.
pub const DTYPE_T: u8 = 14;
/// Numeric string, unsigned.
pub const DTYPE_NU: u8 = 15;
/// Numeric string, left separate sign.
pub const DTYPE_NL: u8 = 16;
/// Numeric string, left overpunched sign.
pub const DTYPE_NLO: u8 = 17;
/// Numeric string, right separate sign.
pub const DTYPE_NR: u8 = 18;
/// Numeric string, right overpunched sign.
pub const DTYPE_NRO: u8 = 19;
/// Numeric string, zoned sign.
pub const DTYPE_NZ: u8 = 20;
/// Packed decimal string.
pub const DTYPE_P: u8 = 21;
/// Descriptor (used for dynamic string arrays).
pub const DTYPE_DSC: u8 = 24;
/// Octaword (unsigned), 128-bit slot.
pub const DTYPE_OU: u8 = 25;
/// Octaword integer (signed), 128-bit slot.
pub const DTYPE_O: u8 = 26;
/// G_floating, 64-bit.
pub const DTYPE_G: u8 = 27;
/// Varying character string (16-bit count, then characters).
pub const DTYPE_VT: u8 = 37;
/// IEEE single, 32-bit.
pub const DTYPE_FS: u8 = 52;
/// IEEE double, 64-bit.
pub const DTYPE_FT: u8 = 53;
/// IEEE extended (double payload in a 128-bit slot).
pub const DTYPE_FX: u8 = 57;
/// Structure.
pub const DTYPE_STRUCT: u8 = 77;

/// Static/scalar class.
pub const CLASS_S: u8 = 1;
/// Dynamic string class.
pub const CLASS_D: u8 = 2;
/// Array class.
pub const CLASS_A: u8 = 4;
/// Scaled decimal class.
pub const CLASS_SD: u8 = 9;
/// Non-contiguous array class.
pub const CLASS_NCA: u8 = 10;
/// Variant string class.
pub const CLASS_VS: u8 = 11;
/// Variant string array class.
pub const CLASS_VSA: u8 = 12;

/// Fixed portion of an array descriptor in bytes.
pub const ARRAY_HEADER_FIXED_LEN: usize = 24;
/// Per-dimension portion of an array descriptor (multiplier, lower, upper).
pub const ARRAY_HEADER_DIM_LEN: usize = 12;
/// Alignment of the value area following an array descriptor.
pub const ARRAY_VALUE_ALIGNMENT: usize = 16;
/// Element length recorded for dynamic string arrays (one string descriptor).
pub const DYNAMIC_STRING_DESCRIPTOR_LEN: usize = 8;

/// Array flag: the descriptor must not be deallocated by the receiver.
pub const AFLAG_NO_DEALLOCATE: u8 = 64;
/// Array flags: multiplier block and bounds block present.
pub const AFLAG_COEFF_AND_BOUNDS: u8 = 192;
/// Array flag: column-major storage.
pub const AFLAG_COLUMN_MAJOR: u8 = 32;

/// Header offset: element length (u16).
pub const HDR_OFFSET_LENGTH: usize = 0;
/// Header offset: type code (u8).
pub const HDR_OFFSET_TYPE: usize = 2;
/// Header offset: class code (u8).
pub const HDR_OFFSET_CLASS: usize = 3;
/// Header offset: pointer to the value area (u32).
pub const HDR_OFFSET_POINTER: usize = 4;
/// Header offset: scale (u8).
pub const HDR_OFFSET_SCALE: usize = 8;
/// Header offset: digits (u8).
pub const HDR_OFFSET_DIGITS: usize = 9;
/// Header offset: array flags (u8).
pub const HDR_OFFSET_AFLAGS: usize = 10;
/// Header offset: dimension count (u8).
pub const HDR_OFFSET_DIMS: usize = 11;
/// Header offset: array size in bytes (u32).
pub const HDR_OFFSET_ARRAY_SIZE: usize = 12;
/// Header offset: A0 address (u32).
pub const HDR_OFFSET_A0: usize = 16;
/// Header offset: first multiplier (u32 each, then bound pairs).
pub const HDR_OFFSET_MULTIPLIERS: usize = 20;
