//! Marshalling limits and configuration

use serde::{Deserialize, Serialize};

/// Limits enforced while building and reading array descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum dimension count (hard: 255, the descriptor field is one byte)
    pub max_dimensions: usize,
    /// Maximum element length recorded in a descriptor (hard: 65,535)
    pub max_element_size: usize,
    /// Maximum characters per string value (hard: 65,535, the varying-string count is u16)
    pub max_string_len: usize,
    /// Maximum decimal precision in digits (default: 31)
    pub max_decimal_precision: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dimensions: 255,
            max_element_size: 0xffff,
            max_string_len: 0xffff,
            max_decimal_precision: 31,
        }
    }
}

impl Limits {
    /// Check a dimension count against the configured maximum.
    pub fn check_dimensions(&self, dims: usize) -> crate::error::Result<()> {
        if dims > self.max_dimensions.min(u8::MAX as usize) {
            return Err(crate::error::WireError::LimitExceeded(format!(
                "Dimension count {} exceeds limit {}",
                dims, self.max_dimensions
            )));
        }
        Ok(())
    }

    /// Check an element size against the configured maximum.
    pub fn check_element_size(&self, size: usize) -> crate::error::Result<()> {
        if size > self.max_element_size.min(u16::MAX as usize) {
            return Err(crate::error::WireError::LimitExceeded(format!(
                "Element size {} exceeds limit {}",
                size, self.max_element_size
            )));
        }
        Ok(())
    }
}
