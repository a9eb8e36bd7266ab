//! Structure (record) leaf values
//!
//! A record travels as its raw byte image, aligned to the record's alignment. The v2
//! representation wraps the same image and carries the structure's IDL name.

use crate::error::{Result, WireError};

/// Fixed-length structure image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRecord {
    bytes: Vec<u8>,
    alignment: usize,
}

impl StructRecord {
    /// Create a record from its byte image; `alignment` must be a power of two
    pub fn new(bytes: Vec<u8>, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(WireError::InvalidArrayObject(format!(
                "record alignment {alignment} is not a power of two"
            )));
        }
        Ok(Self { bytes, alignment })
    }

    /// Zero-filled record of `len` bytes
    pub fn zeroed(len: usize, alignment: usize) -> Result<Self> {
        Self::new(vec![0; len], alignment)
    }

    /// Byte image
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the byte image; the length must not change
    pub fn set_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.bytes.len() {
            return Err(WireError::Internal(format!(
                "record image is {} bytes, got {}",
                self.bytes.len(),
                bytes.len()
            )));
        }
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the image is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Alignment in bytes
    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

/// Named wrapper around a structure image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct V2Record {
    name: String,
    inner: StructRecord,
}

impl V2Record {
    /// Wrap `inner` under the IDL structure name `name`
    pub fn new(name: impl Into<String>, inner: StructRecord) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    /// IDL structure name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrapped structure
    pub fn inner(&self) -> &StructRecord {
        &self.inner
    }

    /// Wrapped structure, mutably
    pub fn inner_mut(&mut self) -> &mut StructRecord {
        &mut self.inner
    }
}

/// Record leaf in either representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Record {
    /// Legacy structure
    Legacy(StructRecord),
    /// V2 structure
    V2(V2Record),
}

impl Record {
    /// The structure image carried on the wire
    pub fn image(&self) -> &StructRecord {
        match self {
            Record::Legacy(inner) => inner,
            Record::V2(v2) => v2.inner(),
        }
    }

    /// The structure image, mutably
    pub fn image_mut(&mut self) -> &mut StructRecord {
        match self {
            Record::Legacy(inner) => inner,
            Record::V2(v2) => v2.inner_mut(),
        }
    }

    /// Whether this is the v2 representation
    pub fn is_v2(&self) -> bool {
        matches!(self, Record::V2(_))
    }
}

impl From<StructRecord> for Record {
    fn from(record: StructRecord) -> Self {
        Record::Legacy(record)
    }
}

impl From<V2Record> for Record {
    fn from(record: V2Record) -> Self {
        Record::V2(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_must_be_power_of_two() {
        assert!(StructRecord::new(vec![1, 2, 3], 4).is_ok());
        assert!(matches!(
            StructRecord::new(vec![1, 2, 3], 3),
            Err(WireError::InvalidArrayObject(_))
        ));
        assert!(StructRecord::new(vec![], 0).is_err());
    }

    #[test]
    fn test_set_bytes_keeps_length() {
        let mut rec = StructRecord::zeroed(4, 4).unwrap();
        rec.set_bytes(&[1, 2, 3, 4]).unwrap();
        assert_eq!(rec.as_bytes(), &[1, 2, 3, 4]);
        assert!(rec.set_bytes(&[1, 2]).is_err());
    }

    #[test]
    fn test_v2_image_is_inner_record() {
        let inner = StructRecord::new(vec![9; 8], 8).unwrap();
        let mut rec = Record::from(V2Record::new("POINT", inner.clone()));
        assert!(rec.is_v2());
        assert_eq!(rec.image(), &inner);
        rec.image_mut().set_bytes(&[0; 8]).unwrap();
        match &rec {
            Record::V2(v2) => {
                assert_eq!(v2.name(), "POINT");
                assert_eq!(v2.inner().as_bytes(), &[0; 8]);
            }
            Record::Legacy(_) => panic!("expected v2"),
        }
    }
}
