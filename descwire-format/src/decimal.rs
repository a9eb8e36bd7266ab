//! Decimal values and their seven wire formats
//!
//! [`Decimal`] is the wide, arbitrary-precision value handed to callers. [`WireDecimal`] is
//! the narrow form: a value already encoded for one format, precision and scale.

use crate::error::{Result, WireError};
use crate::types::DecimalFormat;
use std::fmt;
use std::str::FromStr;

const MAX_DIGITS: usize = 65_536;

/// Decimal number with exact representation
///
/// Canonical form: no leading or trailing zeros in `digits`, zero is `"0"` with exponent 0
/// and a cleared sign. Derived equality is therefore numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    /// Sign: false = non-negative, true = negative
    pub sign: bool,
    /// ASCII digits '0'..'9', MSB-first
    pub digits: Vec<u8>,
    /// Base-10 exponent
    pub exponent: i32,
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl Decimal {
    /// The value zero
    pub fn zero() -> Self {
        Self {
            sign: false,
            digits: vec![b'0'],
            exponent: 0,
        }
    }

    /// Whether this is zero
    pub fn is_zero(&self) -> bool {
        self.digits == [b'0']
    }

    /// Parse from a plain or scientific decimal string
    pub fn from_str_exact(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(WireError::InvalidDecimal("empty string".to_string()));
        }

        let (sign, s) = if let Some(stripped) = s.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = s.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, s)
        };

        let (mantissa, exponent) = if let Some(e_pos) = s.find(['e', 'E']) {
            let exp: i32 = s[e_pos + 1..]
                .parse()
                .map_err(|_| WireError::InvalidDecimal(format!("bad exponent in {s:?}")))?;
            (&s[..e_pos], exp)
        } else {
            (s, 0)
        };

        let (digits, decimal_places) = Self::parse_mantissa(mantissa)?;
        if digits.len() > MAX_DIGITS {
            return Err(WireError::LimitExceeded(
                "Too many decimal digits".to_string(),
            ));
        }

        let exponent = i32::try_from(decimal_places)
            .ok()
            .and_then(|places| exponent.checked_sub(places))
            .ok_or_else(|| WireError::InvalidDecimal(format!("exponent out of range in {s:?}")))?;

        Ok(Self::canonical(sign, digits, exponent))
    }

    /// Parse mantissa and return (digits, decimal_places)
    fn parse_mantissa(s: &str) -> Result<(Vec<u8>, usize)> {
        let mut digits = Vec::new();
        let mut decimal_places = 0;
        let mut found_dot = false;

        for ch in s.chars() {
            match ch {
                '0'..='9' => {
                    digits.push(ch as u8);
                    if found_dot {
                        decimal_places += 1;
                    }
                }
                '.' if !found_dot => found_dot = true,
                _ => {
                    return Err(WireError::InvalidDecimal(format!(
                        "unexpected character {ch:?} in {s:?}"
                    )))
                }
            }
        }

        if digits.is_empty() {
            return Err(WireError::InvalidDecimal(format!("no digits in {s:?}")));
        }

        Ok((digits, decimal_places))
    }

    /// Strip leading and trailing zeros, folding the latter into the exponent
    fn canonical(sign: bool, mut digits: Vec<u8>, mut exponent: i32) -> Self {
        let leading = digits.iter().take_while(|&&d| d == b'0').count();
        digits.drain(..leading);
        if digits.is_empty() {
            return Self::zero();
        }
        while digits.len() > 1 && digits.last() == Some(&b'0') {
            digits.pop();
            exponent = exponent.saturating_add(1);
        }
        Self {
            sign,
            digits,
            exponent,
        }
    }

    /// Build from the integer `value` scaled down by `10^scale`
    pub fn from_i128_scaled(value: i128, scale: u8) -> Self {
        let digits = value.unsigned_abs().to_string().into_bytes();
        Self::canonical(value < 0, digits, -i32::from(scale))
    }

    /// Render `value * 10^scale` as exactly `precision` ASCII digits.
    ///
    /// Fails with [`WireError::DecimalOverflow`] when the scaled integer needs more than
    /// `precision` digits or when fractional digits beyond `scale` would be dropped.
    pub fn to_scaled_digits(&self, precision: usize, scale: u8) -> Result<Vec<u8>> {
        if self.is_zero() {
            return Ok(vec![b'0'; precision]);
        }

        let shift = i64::from(self.exponent) + i64::from(scale);
        if shift < 0 {
            return Err(WireError::DecimalOverflow(format!(
                "{self} has more than {scale} fractional digits"
            )));
        }

        let width = self.digits.len() as u64 + shift as u64;
        if width > precision as u64 {
            return Err(WireError::DecimalOverflow(format!(
                "{self} does not fit precision {precision} at scale {scale}"
            )));
        }

        let mut out = Vec::with_capacity(precision);
        out.resize(precision - width as usize, b'0');
        out.extend_from_slice(&self.digits);
        out.resize(precision, b'0');
        Ok(out)
    }

    /// Inverse of [`Decimal::to_scaled_digits`]
    pub fn from_scaled_digits(negative: bool, digits: &[u8], scale: u8) -> Result<Self> {
        if let Some(bad) = digits.iter().find(|d| !d.is_ascii_digit()) {
            return Err(WireError::InvalidDecimal(format!(
                "non-digit byte 0x{bad:02x}"
            )));
        }
        if digits.is_empty() {
            return Ok(Self::zero());
        }
        Ok(Self::canonical(negative, digits.to_vec(), -i32::from(scale)))
    }

    /// Plain notation while the decimal point lies within six places of the digits,
    /// scientific notation (`d.ddde<n>`) beyond that
    pub fn to_plain_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }

        let sign = if self.sign { "-" } else { "" };
        let digits: String = self.digits.iter().map(|&d| char::from(d)).collect();
        let len = digits.len() as i64;
        // number of digits left of the decimal point; may be negative or exceed `len`
        let point = len + i64::from(self.exponent);

        let body = if !(-6..=len + 6).contains(&point) {
            let (lead, rest) = digits.split_at(1);
            let dot = if rest.is_empty() { "" } else { "." };
            format!("{lead}{dot}{rest}e{}", point - 1)
        } else if point <= 0 {
            format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
        } else if point >= len {
            format!("{digits}{}", "0".repeat((point - len) as usize))
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            format!("{int_part}.{frac_part}")
        };
        format!("{sign}{body}")
    }
}

impl FromStr for Decimal {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_exact(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

/// Decimal already encoded for a specific format, precision and scale
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireDecimal {
    format: DecimalFormat,
    precision: usize,
    scale: u8,
    bytes: Vec<u8>,
}

impl WireDecimal {
    /// Encode `value` in the given format
    pub fn encode(value: &Decimal, format: DecimalFormat, precision: usize, scale: u8) -> Result<Self> {
        check_precision(precision)?;
        let digits = value.to_scaled_digits(precision, scale)?;
        let negative = value.sign && !value.is_zero();
        let bytes = encode_digits(format, negative, &digits)?;
        Ok(Self {
            format,
            precision,
            scale,
            bytes,
        })
    }

    /// Zero in the given format
    pub fn zero(format: DecimalFormat, precision: usize, scale: u8) -> Result<Self> {
        Self::encode(&Decimal::zero(), format, precision, scale)
    }

    /// Wrap a wire image, validating its length and content
    pub fn from_bytes(
        format: DecimalFormat,
        precision: usize,
        scale: u8,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        check_precision(precision)?;
        let expected = format.byte_count(precision);
        if bytes.len() != expected {
            return Err(WireError::InvalidDecimal(format!(
                "expected {expected} bytes for precision {precision}, got {}",
                bytes.len()
            )));
        }
        decode_digits(format, precision, &bytes)?;
        Ok(Self {
            format,
            precision,
            scale,
            bytes,
        })
    }

    /// Decode to a wide decimal
    pub fn to_decimal(&self) -> Result<Decimal> {
        let (negative, digits) = decode_digits(self.format, self.precision, &self.bytes)?;
        Decimal::from_scaled_digits(negative, &digits, self.scale)
    }

    /// Wire format
    pub fn format(&self) -> DecimalFormat {
        self.format
    }

    /// Precision in digits
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Scale
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Wire image
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Wire length in bytes
    pub fn byte_count(&self) -> usize {
        self.bytes.len()
    }
}

fn check_precision(precision: usize) -> Result<()> {
    if precision == 0 {
        return Err(WireError::InvalidDecimal(
            "precision must be at least 1".to_string(),
        ));
    }
    Ok(())
}

const OVERPUNCH_POSITIVE: &[u8; 10] = b"{ABCDEFGHI";
const OVERPUNCH_NEGATIVE: &[u8; 10] = b"}JKLMNOPQR";

fn overpunch(digit: u8, negative: bool) -> u8 {
    let table = if negative {
        OVERPUNCH_NEGATIVE
    } else {
        OVERPUNCH_POSITIVE
    };
    table[(digit - b'0') as usize]
}

fn unpunch(byte: u8) -> Result<(u8, bool)> {
    if byte.is_ascii_digit() {
        return Ok((byte, false));
    }
    if let Some(i) = OVERPUNCH_POSITIVE.iter().position(|&b| b == byte) {
        return Ok((b'0' + i as u8, false));
    }
    if let Some(i) = OVERPUNCH_NEGATIVE.iter().position(|&b| b == byte) {
        return Ok((b'0' + i as u8, true));
    }
    Err(WireError::InvalidDecimal(format!(
        "invalid overpunch byte 0x{byte:02x}"
    )))
}

/// `digits` is exactly `precision` ASCII digits
fn encode_digits(format: DecimalFormat, negative: bool, digits: &[u8]) -> Result<Vec<u8>> {
    let sign_char = if negative { b'-' } else { b'+' };
    let mut out = Vec::with_capacity(format.byte_count(digits.len()));
    match format {
        DecimalFormat::Unsigned => {
            if negative {
                return Err(WireError::DecimalOverflow(
                    "negative value for an unsigned numeric string".to_string(),
                ));
            }
            out.extend_from_slice(digits);
        }
        DecimalFormat::LeftSeparate => {
            out.push(sign_char);
            out.extend_from_slice(digits);
        }
        DecimalFormat::RightSeparate => {
            out.extend_from_slice(digits);
            out.push(sign_char);
        }
        DecimalFormat::LeftOverpunched => {
            out.extend_from_slice(digits);
            out[0] = overpunch(out[0], negative);
        }
        DecimalFormat::RightOverpunched => {
            out.extend_from_slice(digits);
            let last = out.len() - 1;
            out[last] = overpunch(out[last], negative);
        }
        DecimalFormat::Zoned => {
            out.extend_from_slice(digits);
            if negative {
                let last = out.len() - 1;
                out[last] = 0x70 | (out[last] - b'0');
            }
        }
        DecimalFormat::Packed => {
            let mut nibbles: Vec<u8> = Vec::with_capacity(digits.len() + 2);
            if digits.len() % 2 == 0 {
                nibbles.push(0);
            }
            nibbles.extend(digits.iter().map(|d| d - b'0'));
            nibbles.push(if negative { 0xD } else { 0xC });
            out.extend(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
        }
    }
    Ok(out)
}

/// Returns the sign and exactly `precision` ASCII digits
fn decode_digits(format: DecimalFormat, precision: usize, bytes: &[u8]) -> Result<(bool, Vec<u8>)> {
    if bytes.len() != format.byte_count(precision) {
        return Err(WireError::UnexpectedEof);
    }

    let separate_sign = |byte: u8| match byte {
        b'+' | b' ' => Ok(false),
        b'-' => Ok(true),
        other => Err(WireError::InvalidDecimal(format!(
            "invalid sign byte 0x{other:02x}"
        ))),
    };

    let (negative, digits) = match format {
        DecimalFormat::Unsigned => (false, bytes.to_vec()),
        DecimalFormat::LeftSeparate => (separate_sign(bytes[0])?, bytes[1..].to_vec()),
        DecimalFormat::RightSeparate => {
            (separate_sign(bytes[precision])?, bytes[..precision].to_vec())
        }
        DecimalFormat::LeftOverpunched => {
            let mut digits = bytes.to_vec();
            let (first, negative) = unpunch(digits[0])?;
            digits[0] = first;
            (negative, digits)
        }
        DecimalFormat::RightOverpunched => {
            let mut digits = bytes.to_vec();
            let last = digits.len() - 1;
            let (digit, negative) = unpunch(digits[last])?;
            digits[last] = digit;
            (negative, digits)
        }
        DecimalFormat::Zoned => {
            let mut digits = bytes.to_vec();
            let last = digits.len() - 1;
            let negative = digits[last] & 0xF0 == 0x70;
            if negative {
                digits[last] = b'0' + (digits[last] & 0x0F);
            }
            (negative, digits)
        }
        DecimalFormat::Packed => {
            let mut nibbles = Vec::with_capacity(bytes.len() * 2);
            for byte in bytes {
                nibbles.push(byte >> 4);
                nibbles.push(byte & 0x0F);
            }
            let sign = nibbles.pop().unwrap_or(0);
            let negative = match sign {
                0xB | 0xD => true,
                0xA | 0xC | 0xE | 0xF => false,
                other => {
                    return Err(WireError::InvalidDecimal(format!(
                        "invalid packed sign nibble 0x{other:x}"
                    )))
                }
            };
            let skip = nibbles.len() - precision;
            if nibbles[..skip].iter().any(|&n| n != 0) {
                return Err(WireError::InvalidDecimal(
                    "non-zero packed pad nibble".to_string(),
                ));
            }
            let mut digits = Vec::with_capacity(precision);
            for &n in &nibbles[skip..] {
                if n > 9 {
                    return Err(WireError::InvalidDecimal(format!(
                        "invalid packed digit nibble 0x{n:x}"
                    )));
                }
                digits.push(b'0' + n);
            }
            (negative, digits)
        }
    };

    if let Some(bad) = digits.iter().find(|d| !d.is_ascii_digit()) {
        return Err(WireError::InvalidDecimal(format!(
            "non-digit byte 0x{bad:02x}"
        )));
    }
    Ok((negative, digits))
}
