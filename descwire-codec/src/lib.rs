//! descwire codec - Recursive marshalling of N-dimensional arrays
//!
//! This crate walks caller-owned nested arrays and drives the primitive codec from
//! `descwire-format`:
//!
//! - Marshal contexts built from IDL-derived parameters
//! - Shape discovery and declared-bounds validation
//! - Per-type leaf codecs with one bulk transfer per leaf list
//! - Array exporters and importers with and without a descriptor

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bounds;
pub mod context;
pub mod leaf;
pub mod marshal;
pub mod value;

// Re-export commonly used types
pub use descwire_format::{
    ArrayDescriptor, Decimal, Limits, PrimitiveCodec, Record, Result, StructRecord, V2Record,
    WireBuffer, WireClassCode, WireDecimal, WireError, WireTypeCode,
};

// Re-export our own types
pub use bounds::{BoundsGrammar, BoundsValidator, BracketGrammar, CommaGrammar, Extents, Shape};
pub use context::MarshalContext;
pub use leaf::{ElementCodec, LeafCodec};
pub use marshal::{
    export_array, export_values, import_array, import_new, import_values, ArrayExporter,
    ArrayImporter, Phase,
};
pub use value::{ArrayNode, ArrayValue, ScalarNode};
