//! Per-call marshalling parameters

use descwire_format::{
    DecimalFormat, LeafKind, Limits, Result, WireClassCode, WireError, WireTypeCode,
};
use serde::{Deserialize, Serialize};

/// Parameters of one array parameter, normally derived from its IDL declaration
///
/// Built once per call and never shared between calls. The dimension count is not part of
/// the context; it is computed from the value by the bounds validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshalContext {
    /// Element type code
    #[serde(rename = "type")]
    pub type_code: WireTypeCode,
    /// Class code
    #[serde(rename = "class", default = "default_class")]
    pub class_code: WireClassCode,
    /// Element size: string length or decimal precision (0 selects dynamic strings for `T`)
    #[serde(default)]
    pub size: usize,
    /// Decimal scale
    #[serde(default)]
    pub scale: u8,
    /// Pad fixed strings with NUL instead of spaces
    #[serde(default)]
    pub null_term: bool,
    /// Row-major storage
    #[serde(default = "default_true")]
    pub row_major: bool,
    /// Declared dimensions: a dimension count, or the bounds text in by-reference mode
    #[serde(rename = "dimensions", default)]
    pub declared_dimensions: String,
    /// Cross-check exact bounds instead of the dimension count
    #[serde(default)]
    pub by_reference: bool,
    /// Decimals travel as [`descwire_format::Decimal`] rather than pre-encoded images
    #[serde(default = "default_true")]
    pub wide_decimal: bool,
    /// Limits
    #[serde(default)]
    pub limits: Limits,
}

fn default_class() -> WireClassCode {
    WireClassCode::Array
}

fn default_true() -> bool {
    true
}

impl MarshalContext {
    /// Context for `type_code` with class `A`, row-major, wide decimals and no declaration
    pub fn new(type_code: WireTypeCode) -> Self {
        Self {
            type_code,
            class_code: default_class(),
            size: 0,
            scale: 0,
            null_term: false,
            row_major: true,
            declared_dimensions: String::new(),
            by_reference: false,
            wide_decimal: true,
            limits: Limits::default(),
        }
    }

    /// Load from an IDL-derived JSON parameter descriptor
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the class code
    pub fn with_class(mut self, class_code: WireClassCode) -> Self {
        self.class_code = class_code;
        self
    }

    /// Set the element size
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the decimal scale
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    /// Set NUL padding for fixed strings
    pub fn with_null_term(mut self, null_term: bool) -> Self {
        self.null_term = null_term;
        self
    }

    /// Set row-major (true) or column-major (false) storage
    pub fn with_row_major(mut self, row_major: bool) -> Self {
        self.row_major = row_major;
        self
    }

    /// Declare the expected dimension count
    pub fn with_dimension_count(mut self, count: usize) -> Self {
        self.declared_dimensions = count.to_string();
        self.by_reference = false;
        self
    }

    /// Declare the exact expected bounds text (by-reference mode)
    pub fn with_bounds(mut self, bounds: impl Into<String>) -> Self {
        self.declared_dimensions = bounds.into();
        self.by_reference = true;
        self
    }

    /// Select wide (true) or narrow (false) decimals
    pub fn with_wide_decimal(mut self, wide: bool) -> Self {
        self.wide_decimal = wide;
        self
    }

    /// Replace the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Leaf kind of the element type
    pub fn leaf_kind(&self) -> LeafKind {
        self.type_code.leaf_kind()
    }

    /// Decimal format, if the element type is a decimal
    pub fn decimal_format(&self) -> Option<DecimalFormat> {
        self.type_code.decimal_format()
    }

    /// Check the configuration itself, independent of any value
    pub fn check(&self) -> Result<()> {
        let kind = self.leaf_kind();
        if !kind.is_atomic() {
            return Err(WireError::UnsupportedElementType {
                type_code: self.type_code.name(),
                found: "element type",
            });
        }
        self.limits.check_element_size(self.size)?;
        match kind {
            LeafKind::FixedString | LeafKind::VaryingString => {
                if self.size > self.limits.max_string_len {
                    return Err(WireError::LimitExceeded(format!(
                        "String size {} exceeds limit {}",
                        self.size, self.limits.max_string_len
                    )));
                }
            }
            LeafKind::Decimal(_) => {
                if self.size == 0 || self.size > self.limits.max_decimal_precision {
                    return Err(WireError::LimitExceeded(format!(
                        "Decimal precision {} outside 1..={}",
                        self.size, self.limits.max_decimal_precision
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let ctx = MarshalContext::new(WireTypeCode::Long).with_dimension_count(2);
        assert_eq!(ctx.class_code, WireClassCode::Array);
        assert!(ctx.row_major);
        assert!(!ctx.by_reference);
        assert_eq!(ctx.declared_dimensions, "2");
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_with_bounds_enables_by_reference() {
        let ctx = MarshalContext::new(WireTypeCode::Long).with_bounds("3,5");
        assert!(ctx.by_reference);
        assert_eq!(ctx.declared_dimensions, "3,5");
    }

    #[test]
    fn test_from_json_by_name() {
        let ctx = MarshalContext::from_json(
            r#"{"type": "VT", "class": "VSA", "dimensions": "2", "null_term": true}"#,
        )
        .unwrap();
        assert_eq!(ctx.type_code, WireTypeCode::VaryingText);
        assert_eq!(ctx.class_code, WireClassCode::VariantStringArray);
        assert!(ctx.null_term);
        assert!(ctx.row_major);
        assert!(ctx.wide_decimal);
        assert_eq!(ctx.limits, Limits::default());
    }

    #[test]
    fn test_from_json_by_number_with_limits() {
        let ctx = MarshalContext::from_json(
            r#"{"type": 21, "size": 7, "scale": 2, "dimensions": "1", "limits": {"max_dimensions": 3}}"#,
        )
        .unwrap();
        assert_eq!(ctx.type_code, WireTypeCode::Packed);
        assert_eq!(ctx.decimal_format(), Some(DecimalFormat::Packed));
        assert_eq!(ctx.limits.max_dimensions, 3);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            MarshalContext::from_json(r#"{"class": "A"}"#),
            Err(WireError::Json(_))
        ));
        assert!(matches!(
            MarshalContext::from_json(r#"{"type": "XYZ"}"#),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn test_check_rejects_descriptor_and_bad_precision() {
        assert!(matches!(
            MarshalContext::new(WireTypeCode::Descriptor).check(),
            Err(WireError::UnsupportedElementType { .. })
        ));
        assert!(MarshalContext::new(WireTypeCode::Unspecified).check().is_err());
        assert!(MarshalContext::new(WireTypeCode::Packed).check().is_err());
        assert!(MarshalContext::new(WireTypeCode::Packed)
            .with_size(32)
            .check()
            .is_err());
        assert!(MarshalContext::new(WireTypeCode::Packed)
            .with_size(31)
            .check()
            .is_ok());
    }
}
