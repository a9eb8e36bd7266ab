//! descwire format - Core primitives for descriptor-based array marshalling
//!
//! This crate provides the wire-level building blocks of the legacy array descriptor
//! layout with no I/O dependencies. It includes:
//!
//! - Type and class codes and the leaf kind classifier
//! - Numeric constants of the descriptor layout
//! - Error types
//! - Limits
//! - Array descriptor headers
//! - Decimal values and the seven decimal wire formats
//! - Structure (record) leaf values
//! - The primitive codec trait and the little-endian wire buffer

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod constants;
pub mod decimal;
pub mod error;
pub mod header;
pub mod limits;
pub mod record;
pub mod types;

// Re-export commonly used types
pub use buffer::{PrimitiveCodec, WireBuffer, WireInt};
pub use decimal::{Decimal, WireDecimal};
pub use error::{Result, WireError};
pub use header::{ArrayDescriptor, ArrayHeader};
pub use limits::Limits;
pub use record::{Record, StructRecord, V2Record};
pub use types::{DecimalFormat, IntWidth, LeafKind, WireClassCode, WireTypeCode};
