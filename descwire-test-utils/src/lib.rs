//! descwire Test Utilities
//!
//! Shared fixtures and helpers for the descwire crates: array builders, parameter
//! descriptors in their JSON form, and tracing setup for tests.

use descwire_codec::{ArrayNode, ArrayValue, MarshalContext, ScalarNode};
use descwire_format::{Decimal, Record, StructRecord, V2Record, WireTypeCode};
use serde_json::json;

/// Install a tracing subscriber honoring `RUST_LOG`; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder for rectangular arrays of any depth
pub struct ArrayBuilder {
    extents: Vec<usize>,
}

impl ArrayBuilder {
    /// Array with the given extents, outermost first
    pub fn new(extents: &[usize]) -> Self {
        Self {
            extents: extents.to_vec(),
        }
    }

    /// Fill every element from its row-major index
    pub fn fill<F>(&self, mut f: F) -> ArrayValue
    where
        F: FnMut(usize) -> ScalarNode,
    {
        let mut next = 0;
        self.level(0, &mut next, &mut f)
    }

    fn level<F>(&self, depth: usize, next: &mut usize, f: &mut F) -> ArrayNode
    where
        F: FnMut(usize) -> ScalarNode,
    {
        let extent = self.extents[depth];
        let children = (0..extent)
            .map(|_| {
                if depth + 1 == self.extents.len() {
                    let scalar = f(*next);
                    *next += 1;
                    ArrayNode::Scalar(scalar)
                } else {
                    self.level(depth + 1, next, f)
                }
            })
            .collect();
        ArrayNode::Nested(children)
    }
}

/// `rows x cols` integers, element `(r, c)` holding `r * 100 + c`
pub fn int_grid(rows: usize, cols: usize) -> ArrayValue {
    ArrayNode::from(
        (0..rows)
            .map(|r| (0..cols).map(|c| (r * 100 + c) as i64).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )
}

/// Array of the same shape as `value` with every leaf replaced by `seed`
pub fn blank_like(value: &ArrayValue, seed: &ScalarNode) -> ArrayValue {
    match value {
        ArrayNode::Scalar(_) => ArrayNode::Scalar(seed.clone()),
        ArrayNode::Nested(children) => {
            ArrayNode::Nested(children.iter().map(|c| blank_like(c, seed)).collect())
        }
    }
}

/// Every leaf of `value` in depth-first order
pub fn leaves(value: &ArrayValue) -> Vec<ScalarNode> {
    fn walk(node: &ArrayNode, out: &mut Vec<ScalarNode>) {
        match node {
            ArrayNode::Scalar(scalar) => out.push(scalar.clone()),
            ArrayNode::Nested(children) => children.iter().for_each(|c| walk(c, out)),
        }
    }
    let mut out = Vec::new();
    walk(value, &mut out);
    out
}

/// Legacy record fixture: `len` bytes starting at `first`, aligned to `alignment`
pub fn record(first: u8, len: usize, alignment: usize) -> Record {
    let bytes = (0..len).map(|i| first.wrapping_add(i as u8)).collect();
    match StructRecord::new(bytes, alignment) {
        Ok(image) => Record::Legacy(image),
        Err(e) => panic!("invalid record fixture: {e}"),
    }
}

/// V2 record fixture wrapping [`record`]
pub fn v2_record(name: &str, first: u8, len: usize, alignment: usize) -> Record {
    Record::V2(V2Record::new(name, record(first, len, alignment).image().clone()))
}

/// Zeroed record of the same size and alignment as `template`
pub fn blank_record(template: &Record) -> Record {
    let image = template.image();
    let zeroed = match StructRecord::zeroed(image.len(), image.alignment()) {
        Ok(zeroed) => zeroed,
        Err(e) => panic!("invalid record fixture: {e}"),
    };
    match template {
        Record::Legacy(_) => Record::Legacy(zeroed),
        Record::V2(v2) => Record::V2(V2Record::new(v2.name(), zeroed)),
    }
}

/// Parse a decimal fixture
pub fn decimal(text: &str) -> Decimal {
    match Decimal::from_str_exact(text) {
        Ok(d) => d,
        Err(e) => panic!("invalid decimal fixture {text:?}: {e}"),
    }
}

/// Parameter descriptor as the IDL layer would produce it
pub fn param_json(type_code: WireTypeCode, size: usize, dimensions: &str) -> String {
    json!({
        "type": type_code.name(),
        "size": size,
        "dimensions": dimensions,
    })
    .to_string()
}

/// Context loaded from [`param_json`]
pub fn context(type_code: WireTypeCode, size: usize, dims: usize) -> MarshalContext {
    match MarshalContext::from_json(&param_json(type_code, size, &dims.to_string())) {
        Ok(ctx) => ctx,
        Err(e) => panic!("invalid parameter fixture: {e}"),
    }
}

/// Assertion helpers
pub mod assertions {
    use descwire_codec::ArrayValue;

    /// Assert two arrays are equal, naming the case on failure
    pub fn assert_array_equal(actual: &ArrayValue, expected: &ArrayValue, case: &str) {
        assert_eq!(actual, expected, "array mismatch in {case}");
    }

    /// Assert `bytes` starting at `at` are all zero
    pub fn assert_zero_fill(bytes: &[u8], at: usize, len: usize) {
        assert!(
            bytes[at..at + len].iter().all(|b| *b == 0),
            "expected zero fill at {at}..{}",
            at + len
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shapes() {
        let cube = ArrayBuilder::new(&[2, 3, 4]).fill(|i| ScalarNode::Int(i as i128));
        assert_eq!(cube.scalar_count(), 24);
        let all = leaves(&cube);
        assert_eq!(all[23], ScalarNode::Int(23));
    }

    #[test]
    fn test_context_fixture() {
        let ctx = context(WireTypeCode::Long, 4, 2);
        assert_eq!(ctx.type_code, WireTypeCode::Long);
        assert_eq!(ctx.size, 4);
        assert_eq!(ctx.declared_dimensions, "2");
    }

    #[test]
    fn test_blank_record_keeps_layout() {
        let r = v2_record("POINT", 1, 6, 2);
        let blank = blank_record(&r);
        assert!(blank.is_v2());
        assert_eq!(blank.image().len(), 6);
        assert!(blank.image().as_bytes().iter().all(|b| *b == 0));
    }
}
