//! Recursive export and import of nested arrays
//!
//! An export writes the array descriptor, fills in one bounds entry per dimension from the
//! innermost level outward, then walks the value depth first and hands every leaf list to
//! the element codec in a single bulk put. Import mirrors the walk, replacing leaf lists in
//! the caller's value with what one bulk get returns.

use crate::bounds::{BoundsGrammar, BoundsValidator, CommaGrammar, Shape};
use crate::context::MarshalContext;
use crate::leaf::ElementCodec;
use crate::value::{ArrayNode, ArrayValue, ScalarNode};
use descwire_format::{
    ArrayDescriptor, ArrayHeader, LeafKind, PrimitiveCodec, Result, WireError, WireTypeCode,
};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Progress of one marshalling call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Shape and context checked; nothing written or read yet
    Validated,
    /// Array descriptor written (or consumed) together with its bounds
    HeaderDone,
    /// Every leaf list transferred
    LeavesDone,
}

/// Exports one caller-owned array
#[derive(Debug)]
pub struct ArrayExporter<'a> {
    context: &'a MarshalContext,
    value: &'a ArrayValue,
    shape: Shape,
    phase: Phase,
}

impl<'a> ArrayExporter<'a> {
    /// Validate `value` against `context` with the comma bounds grammar
    pub fn new(context: &'a MarshalContext, value: &'a ArrayValue) -> Result<Self> {
        Self::with_validator(context, value, &BoundsValidator::<CommaGrammar>::new())
    }

    /// Validate `value` against `context` with a caller-chosen bounds grammar
    pub fn with_validator<G: BoundsGrammar>(
        context: &'a MarshalContext,
        value: &'a ArrayValue,
        validator: &BoundsValidator<G>,
    ) -> Result<Self> {
        context.check()?;
        let shape = validator.validate(context, value)?;
        debug!(
            type_code = context.type_code.name(),
            depth = shape.depth,
            extents = ?shape.extents.as_slice(),
            "array validated for export"
        );
        Ok(Self {
            context,
            value,
            shape,
            phase: Phase::Validated,
        })
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Shape computed during validation
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Write descriptor, bounds and values
    pub fn export<C: PrimitiveCodec>(&mut self, codec: &mut C) -> Result<()> {
        self.phase = Phase::Validated;
        let size = self.element_size()?;
        let header = ArrayHeader {
            type_code: self.context.type_code,
            class_code: self.context.class_code,
            size,
            scale: self.context.scale,
            dim_count: self.shape.depth,
            row_major: self.context.row_major,
        };

        let start = codec.put_array_header(&header)?;
        let dims = self.shape.depth;
        for (i, extent) in self.shape.extents.iter().enumerate() {
            codec.put_array_dim(dims - i, 0, upper_bound(*extent)?)?;
        }
        self.phase = Phase::HeaderDone;
        debug!(
            offset = start,
            size,
            dims,
            value_offset = codec.position(),
            "array descriptor written"
        );

        self.put_leaves(codec, size)
    }

    /// Write values only, for callers that supply the descriptor out of band
    pub fn export_values<C: PrimitiveCodec>(&mut self, codec: &mut C) -> Result<()> {
        self.phase = Phase::Validated;
        let size = self.context.size;
        require_header_free(self.context, size)?;
        self.phase = Phase::HeaderDone;
        self.put_leaves(codec, size)
    }

    fn put_leaves<C: PrimitiveCodec>(&mut self, codec: &mut C, size: usize) -> Result<()> {
        let start = codec.position();
        let element = ElementCodec::select(self.context, size, first_scalar(self.value))?;
        put_node(self.value, 1, self.shape.depth, &element, codec)?;
        self.phase = Phase::LeavesDone;
        debug!(
            elements = self.value.scalar_count(),
            bytes = codec.position().saturating_sub(start),
            "array values written"
        );
        Ok(())
    }

    /// Element size to record: the longest string for `VSA` arrays, the context size otherwise
    fn element_size(&self) -> Result<usize> {
        if !self.context.class_code.sizes_from_largest_string() {
            return Ok(self.context.size);
        }
        let size = largest_string(self.value);
        self.context.limits.check_element_size(size)?;
        if size > self.context.limits.max_string_len {
            return Err(WireError::LimitExceeded(format!(
                "String size {} exceeds limit {}",
                size, self.context.limits.max_string_len
            )));
        }
        Ok(size)
    }
}

/// Imports into one caller-owned array, whose leaves are overwritten in place
#[derive(Debug)]
pub struct ArrayImporter<'a> {
    context: &'a MarshalContext,
    value: &'a mut ArrayValue,
    shape: Shape,
    phase: Phase,
}

impl<'a> ArrayImporter<'a> {
    /// Validate `value` against `context` with the comma bounds grammar
    pub fn new(context: &'a MarshalContext, value: &'a mut ArrayValue) -> Result<Self> {
        Self::with_validator(context, value, &BoundsValidator::<CommaGrammar>::new())
    }

    /// Validate `value` against `context` with a caller-chosen bounds grammar
    pub fn with_validator<G: BoundsGrammar>(
        context: &'a MarshalContext,
        value: &'a mut ArrayValue,
        validator: &BoundsValidator<G>,
    ) -> Result<Self> {
        context.check()?;
        let shape = validator.validate(context, value)?;
        debug!(
            type_code = context.type_code.name(),
            depth = shape.depth,
            extents = ?shape.extents.as_slice(),
            "array validated for import"
        );
        Ok(Self {
            context,
            value,
            shape,
            phase: Phase::Validated,
        })
    }

    /// Importer for a value the caller did not declare, such as one allocated by
    /// [`import_new`]
    fn unchecked(context: &'a MarshalContext, value: &'a mut ArrayValue) -> Result<Self> {
        context.check()?;
        let depth = crate::bounds::depth(value);
        let shape = Shape {
            depth,
            extents: crate::bounds::extents(value, depth),
        };
        Ok(Self {
            context,
            value,
            shape,
            phase: Phase::Validated,
        })
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Shape computed during validation
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Consume descriptor and bounds, then read values into the array
    pub fn import<C: PrimitiveCodec>(&mut self, codec: &mut C) -> Result<ArrayDescriptor> {
        self.phase = Phase::Validated;
        let descriptor = codec.get_array_header()?;
        let size = self.check_descriptor(&descriptor)?;
        self.phase = Phase::HeaderDone;
        debug!(
            type_code = descriptor.type_code.name(),
            dims = descriptor.dim_count(),
            array_size = descriptor.array_size,
            value_offset = descriptor.pointer,
            "array descriptor read"
        );

        self.get_leaves(codec, size)?;
        Ok(descriptor)
    }

    /// Read values only, for callers that receive the descriptor out of band
    pub fn import_values<C: PrimitiveCodec>(&mut self, codec: &mut C) -> Result<()> {
        self.phase = Phase::Validated;
        let size = self.context.size;
        require_header_free(self.context, size)?;
        self.phase = Phase::HeaderDone;
        self.get_leaves(codec, size)
    }

    fn get_leaves<C: PrimitiveCodec>(&mut self, codec: &mut C, size: usize) -> Result<()> {
        let start = codec.position();
        let element = ElementCodec::select(self.context, size, first_scalar(self.value))?;
        get_node(self.value, 1, self.shape.depth, &element, codec)?;
        self.phase = Phase::LeavesDone;
        debug!(
            elements = self.value.scalar_count(),
            bytes = codec.position().saturating_sub(start),
            "array values read"
        );
        Ok(())
    }

    /// Compare the consumed descriptor with the context and the caller's array; returns
    /// the element size to read with
    fn check_descriptor(&self, descriptor: &ArrayDescriptor) -> Result<usize> {
        let expected = self.context.type_code;
        let is_string = matches!(
            self.context.leaf_kind(),
            LeafKind::FixedString | LeafKind::VaryingString
        );
        let size = if descriptor.is_dynamic_string() && expected == WireTypeCode::Text {
            0
        } else if descriptor.type_code == expected {
            if is_string {
                descriptor.element_length as usize
            } else {
                self.context.size
            }
        } else {
            debug!(
                expected = expected.name(),
                found = descriptor.type_code.name(),
                "array descriptor carries a different element type"
            );
            return Err(WireError::UnsupportedElementType {
                type_code: expected.name(),
                found: descriptor.type_code.name(),
            });
        };

        if descriptor.dim_count() != self.shape.depth {
            debug!(
                header = descriptor.dim_count(),
                array = self.shape.depth,
                "array descriptor dimension count does not match array"
            );
            return Err(WireError::DimensionCountMismatch {
                declared: descriptor.dim_count(),
                actual: self.shape.depth,
            });
        }
        let wire_extents = descriptor.extents();
        if wire_extents.as_slice() != self.shape.extents.as_slice() {
            let grammar = CommaGrammar;
            let declared = grammar.render(&wire_extents);
            let actual = grammar.render(&self.shape.extents);
            debug!(%declared, %actual, "array descriptor bounds do not match array");
            return Err(WireError::DimensionBoundsMismatch { declared, actual });
        }
        Ok(size)
    }
}

/// Export `value` with its descriptor
pub fn export_array<C: PrimitiveCodec>(
    context: &MarshalContext,
    value: &ArrayValue,
    codec: &mut C,
) -> Result<()> {
    ArrayExporter::new(context, value)?.export(codec)
}

/// Import into `value`, consuming a descriptor first
pub fn import_array<C: PrimitiveCodec>(
    context: &MarshalContext,
    value: &mut ArrayValue,
    codec: &mut C,
) -> Result<ArrayDescriptor> {
    ArrayImporter::new(context, value)?.import(codec)
}

/// Export the values of `value` without a descriptor
pub fn export_values<C: PrimitiveCodec>(
    context: &MarshalContext,
    value: &ArrayValue,
    codec: &mut C,
) -> Result<()> {
    ArrayExporter::new(context, value)?.export_values(codec)
}

/// Import values into `value` without consuming a descriptor
pub fn import_values<C: PrimitiveCodec>(
    context: &MarshalContext,
    value: &mut ArrayValue,
    codec: &mut C,
) -> Result<()> {
    ArrayImporter::new(context, value)?.import_values(codec)
}

/// Import a complete one-dimensional array of `len` elements into a fresh value.
///
/// The declared dimensions in `context` are not consulted. Structure arrays are rejected
/// because the element images cannot be sized without caller records.
pub fn import_new<C: PrimitiveCodec>(
    context: &MarshalContext,
    codec: &mut C,
    len: usize,
) -> Result<ArrayValue> {
    let seed = ElementCodec::select(context, context.size, None)?.default_scalar()?;
    let mut value = ArrayNode::Nested(vec![ArrayNode::Scalar(seed); len]);
    ArrayImporter::unchecked(context, &mut value)?.import(codec)?;
    Ok(value)
}

fn upper_bound(extent: usize) -> Result<i32> {
    i32::try_from(extent)
        .map(|e| e - 1)
        .map_err(|_| WireError::LimitExceeded(format!("extent {extent} does not fit 32 bits")))
}

/// Dynamic strings keep their descriptors next to the array descriptor, so they cannot
/// travel without one.
fn require_header_free(context: &MarshalContext, size: usize) -> Result<()> {
    if context.type_code == WireTypeCode::Text && size == 0 {
        debug!("dynamic string array needs an array descriptor");
        return Err(WireError::MissingArrayHeader);
    }
    Ok(())
}

fn first_scalar(value: &ArrayValue) -> Option<&ScalarNode> {
    match value {
        ArrayNode::Scalar(scalar) => Some(scalar),
        ArrayNode::Nested(children) => children.iter().find_map(first_scalar),
    }
}

fn largest_string(value: &ArrayValue) -> usize {
    match value {
        ArrayNode::Scalar(ScalarNode::Str(s)) => s.chars().count(),
        ArrayNode::Scalar(_) => 0,
        ArrayNode::Nested(children) => children.iter().map(largest_string).max().unwrap_or(0),
    }
}

/// Classify the children of one container: all containers, all leaves, or empty
enum Level<'a> {
    Containers(&'a [ArrayNode]),
    Leaves(SmallVec<[&'a ScalarNode; 16]>),
}

fn classify(node: &ArrayNode, level: usize, depth: usize) -> Result<Level<'_>> {
    let children = node.as_nested().ok_or_else(|| {
        WireError::InvalidArrayObject(format!("expected a container at level {level}"))
    })?;
    let leaves: SmallVec<[&ScalarNode; 16]> = children.iter().filter_map(ArrayNode::as_scalar).collect();

    if leaves.is_empty() && !children.is_empty() {
        if level >= depth {
            return Err(WireError::InvalidArrayObject(format!(
                "containers nested below the innermost level {depth}"
            )));
        }
        Ok(Level::Containers(children))
    } else if leaves.len() == children.len() {
        if !leaves.is_empty() && level != depth {
            return Err(WireError::InvalidArrayObject(format!(
                "scalars at level {level} of a {depth}-dimensional array"
            )));
        }
        Ok(Level::Leaves(leaves))
    } else {
        Err(WireError::InvalidArrayObject(format!(
            "level {level} mixes containers and scalars"
        )))
    }
}

fn put_node<C: PrimitiveCodec>(
    node: &ArrayNode,
    level: usize,
    depth: usize,
    element: &ElementCodec,
    codec: &mut C,
) -> Result<()> {
    match classify(node, level, depth)? {
        Level::Containers(children) => {
            for child in children {
                put_node(child, level + 1, depth, element, codec)?;
            }
            Ok(())
        }
        Level::Leaves(leaves) => {
            trace!(level, count = leaves.len(), "leaf list put");
            element.export(codec, &leaves)
        }
    }
}

fn get_node<C: PrimitiveCodec>(
    node: &mut ArrayNode,
    level: usize,
    depth: usize,
    element: &ElementCodec,
    codec: &mut C,
) -> Result<()> {
    let values = match classify(node, level, depth)? {
        Level::Containers(_) => None,
        Level::Leaves(template) => {
            trace!(level, count = template.len(), "leaf list get");
            Some(element.import(codec, &template)?)
        }
    };

    let ArrayNode::Nested(children) = node else {
        return Err(WireError::Internal("leaf node classified as container".to_string()));
    };
    match values {
        None => {
            for child in children.iter_mut() {
                get_node(child, level + 1, depth, element, codec)?;
            }
        }
        Some(values) => {
            if values.len() != children.len() {
                return Err(WireError::Internal(format!(
                    "bulk get returned {} of {} elements",
                    values.len(),
                    children.len()
                )));
            }
            for (slot, value) in children.iter_mut().zip(values) {
                *slot = ArrayNode::Scalar(value);
            }
        }
    }
    Ok(())
}
