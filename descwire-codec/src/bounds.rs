//! Shape discovery and declared-bounds validation
//!
//! Arrays are assumed rectangular: depth and extents follow the first element of every
//! level only.

use crate::context::MarshalContext;
use crate::value::ArrayValue;
use descwire_format::{Result, WireError};
use smallvec::SmallVec;
use tracing::debug;

/// Extents, outermost first
pub type Extents = SmallVec<[usize; 4]>;

/// Renders extents into the declared-bounds text used in by-reference mode
pub trait BoundsGrammar {
    /// Render `extents` (outermost first)
    fn render(&self, extents: &[usize]) -> String;
}

/// `"3,5"`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaGrammar;

impl BoundsGrammar for CommaGrammar {
    fn render(&self, extents: &[usize]) -> String {
        extents
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// `"[3][5]"`
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketGrammar;

impl BoundsGrammar for BracketGrammar {
    fn render(&self, extents: &[usize]) -> String {
        extents.iter().map(|e| format!("[{e}]")).collect()
    }
}

/// Number of nested containers along the first-element path.
///
/// An empty container counts as a level and ends the walk.
pub fn depth(value: &ArrayValue) -> usize {
    let mut depth = 0;
    let mut node = value;
    while let Some(children) = node.as_nested() {
        depth += 1;
        match children.first() {
            Some(first) => node = first,
            None => break,
        }
    }
    depth
}

/// Container length at each of the first `depth` levels; 0 below an empty level
pub fn extents(value: &ArrayValue, depth: usize) -> Extents {
    let mut out = Extents::with_capacity(depth);
    let mut node = Some(value);
    for _ in 0..depth {
        let children = node.and_then(|n| n.as_nested()).unwrap_or(&[]);
        out.push(children.len());
        node = children.first();
    }
    out
}

/// Validated shape of a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// Dimension count
    pub depth: usize,
    /// Extent per dimension, outermost first
    pub extents: Extents,
}

/// Checks a value's shape against the declaration in its context
#[derive(Debug, Clone, Default)]
pub struct BoundsValidator<G = CommaGrammar> {
    grammar: G,
}

impl BoundsValidator<CommaGrammar> {
    /// Validator with the default comma grammar
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: BoundsGrammar> BoundsValidator<G> {
    /// Validator with a custom bounds grammar
    pub fn with_grammar(grammar: G) -> Self {
        Self { grammar }
    }

    /// Render extents with this validator's grammar
    pub fn render(&self, extents: &[usize]) -> String {
        self.grammar.render(extents)
    }

    /// Compute the shape of `value` and compare it with the declaration
    pub fn validate(&self, context: &MarshalContext, value: &ArrayValue) -> Result<Shape> {
        let depth = depth(value);
        if depth == 0 {
            debug!("array value has no dimensions");
            return Err(WireError::InvalidDimension);
        }
        context.limits.check_dimensions(depth)?;

        let extents = extents(value, depth);
        if context.by_reference {
            let actual = self.grammar.render(&extents);
            if actual != context.declared_dimensions {
                debug!(
                    declared = %context.declared_dimensions,
                    actual = %actual,
                    "declared bounds do not match array"
                );
                return Err(WireError::DimensionBoundsMismatch {
                    declared: context.declared_dimensions.clone(),
                    actual,
                });
            }
        } else {
            let declared: usize = context.declared_dimensions.trim().parse().map_err(|_| {
                debug!(declared = %context.declared_dimensions, "declared dimension count is not a number");
                WireError::InvalidDeclaredDimensions(context.declared_dimensions.clone())
            })?;
            if declared != depth {
                debug!(declared, actual = depth, "declared dimension count does not match array");
                return Err(WireError::DimensionCountMismatch {
                    declared,
                    actual: depth,
                });
            }
        }

        Ok(Shape { depth, extents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArrayNode;
    use descwire_format::WireTypeCode;

    fn grid(rows: usize, cols: usize) -> ArrayValue {
        ArrayNode::from(
            (0..rows)
                .map(|r| (0..cols).map(|c| (r * cols + c) as i32).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_depth_and_extents() {
        let value = grid(3, 5);
        assert_eq!(depth(&value), 2);
        assert_eq!(extents(&value, 2).as_slice(), &[3, 5]);

        let cube = ArrayNode::from(vec![vec![vec![1, 2]], vec![vec![3, 4]]]);
        assert_eq!(depth(&cube), 3);
        assert_eq!(extents(&cube, 3).as_slice(), &[2, 1, 2]);
    }

    #[test]
    fn test_strings_do_not_add_depth() {
        let value = ArrayNode::from(vec![vec!["a", "bb"], vec!["ccc", "d"]]);
        assert_eq!(depth(&value), 2);
    }

    #[test]
    fn test_empty_container_counts_one_level() {
        let empty = ArrayNode::Nested(vec![]);
        assert_eq!(depth(&empty), 1);
        assert_eq!(extents(&empty, 1).as_slice(), &[0]);

        let outer = ArrayNode::Nested(vec![ArrayNode::Nested(vec![])]);
        assert_eq!(depth(&outer), 2);
        assert_eq!(extents(&outer, 2).as_slice(), &[1, 0]);
    }

    #[test]
    fn test_grammars() {
        assert_eq!(CommaGrammar.render(&[3, 5]), "3,5");
        assert_eq!(BracketGrammar.render(&[3, 5]), "[3][5]");
        assert_eq!(CommaGrammar.render(&[7]), "7");
    }

    #[test]
    fn test_scalar_root_is_invalid_dimension() {
        let ctx = MarshalContext::new(WireTypeCode::Long).with_dimension_count(0);
        let value = ArrayNode::from(5);
        assert!(matches!(
            BoundsValidator::new().validate(&ctx, &value),
            Err(WireError::InvalidDimension)
        ));
    }

    #[test]
    fn test_dimension_count_checks() {
        let value = ArrayNode::from(vec![vec![vec![1]]]);
        let ok = MarshalContext::new(WireTypeCode::Long).with_dimension_count(3);
        let shape = BoundsValidator::new().validate(&ok, &value).unwrap();
        assert_eq!(shape.depth, 3);

        let wrong = MarshalContext::new(WireTypeCode::Long).with_dimension_count(2);
        match BoundsValidator::new().validate(&wrong, &value) {
            Err(WireError::DimensionCountMismatch { declared, actual }) => {
                assert_eq!(declared, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected DimensionCountMismatch, got {other:?}"),
        }

        let garbage = MarshalContext::new(WireTypeCode::Long).with_bounds("x");
        let garbage = MarshalContext {
            by_reference: false,
            ..garbage
        };
        assert!(matches!(
            BoundsValidator::new().validate(&garbage, &value),
            Err(WireError::InvalidDeclaredDimensions(_))
        ));
    }

    #[test]
    fn test_by_reference_bounds() {
        let value = grid(3, 5);
        let validator = BoundsValidator::with_grammar(BracketGrammar);

        let ok = MarshalContext::new(WireTypeCode::Long).with_bounds("[3][5]");
        assert!(validator.validate(&ok, &value).is_ok());

        let wrong = MarshalContext::new(WireTypeCode::Long).with_bounds("[3][4]");
        match validator.validate(&wrong, &value) {
            Err(WireError::DimensionBoundsMismatch { declared, actual }) => {
                assert_eq!(declared, "[3][4]");
                assert_eq!(actual, "[3][5]");
            }
            other => panic!("expected DimensionBoundsMismatch, got {other:?}"),
        }

        let comma = MarshalContext::new(WireTypeCode::Long).with_bounds("3,5");
        assert!(BoundsValidator::new().validate(&comma, &value).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let mut value = ArrayNode::from(1);
        for _ in 0..4 {
            value = ArrayNode::Nested(vec![value]);
        }
        let mut limits = descwire_format::Limits::default();
        limits.max_dimensions = 3;
        let ctx = MarshalContext::new(WireTypeCode::Long)
            .with_dimension_count(4)
            .with_limits(limits);
        assert!(matches!(
            BoundsValidator::new().validate(&ctx, &value),
            Err(WireError::LimitExceeded(_))
        ));
    }
}
