//! Behavioural checks for validation, descriptor layout and headerless transfer

use descwire_codec::{
    export_array, export_values, import_array, import_values, ArrayExporter, ArrayNode,
    BoundsValidator, BracketGrammar, MarshalContext, Phase, PrimitiveCodec, ScalarNode,
    WireBuffer, WireClassCode, WireError, WireTypeCode,
};
use descwire_test_utils::assertions::assert_zero_fill;
use descwire_test_utils::{blank_like, context, init_tracing, int_grid, ArrayBuilder};

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn i32_at(bytes: &[u8], at: usize) -> i32 {
    u32_at(bytes, at) as i32
}

#[test]
fn test_dimension_count_mismatch_writes_nothing() {
    init_tracing();
    let cube = ArrayBuilder::new(&[2, 2, 2]).fill(|i| ScalarNode::Int(i as i128));
    let ctx = context(WireTypeCode::Long, 4, 2);
    let mut buf = WireBuffer::new();

    match export_array(&ctx, &cube, &mut buf) {
        Err(WireError::DimensionCountMismatch { declared, actual }) => {
            assert_eq!(declared, 2);
            assert_eq!(actual, 3);
        }
        other => panic!("expected DimensionCountMismatch, got {other:?}"),
    }
    assert!(buf.is_empty());
}

#[test]
fn test_by_reference_bounds() {
    let value = int_grid(3, 5);
    let validator = BoundsValidator::with_grammar(BracketGrammar);

    let ok = MarshalContext::new(WireTypeCode::Quad)
        .with_size(8)
        .with_bounds("[3][5]");
    let mut exporter = ArrayExporter::with_validator(&ok, &value, &validator).expect("valid");
    let mut buf = WireBuffer::new();
    exporter.export(&mut buf).expect("export");
    assert_eq!(exporter.phase(), Phase::LeavesDone);

    let wrong = MarshalContext::new(WireTypeCode::Quad)
        .with_size(8)
        .with_bounds("[3][4]");
    assert!(matches!(
        ArrayExporter::with_validator(&wrong, &value, &validator),
        Err(WireError::DimensionBoundsMismatch { .. })
    ));
}

#[test]
fn test_signed_byte_range() {
    let ctx = context(WireTypeCode::Byte, 1, 1);
    let value = ArrayNode::from(vec![300]);
    let mut buf = WireBuffer::new();
    assert!(matches!(
        export_array(&ctx, &value, &mut buf),
        Err(WireError::IntegerRangeError { value: 300, type_code: "B" })
    ));
}

#[test]
fn test_vsa_header_size_is_longest_string() {
    let ctx = MarshalContext::new(WireTypeCode::VaryingText)
        .with_class(WireClassCode::VariantStringArray)
        .with_dimension_count(2);
    let value = ArrayNode::from(vec![vec!["a", "bb"], vec!["ccc"]]);
    let mut buf = WireBuffer::new();
    export_array(&ctx, &value, &mut buf).expect("export");
    assert_eq!(u16_at(buf.as_bytes(), 0), 3);
}

#[test]
fn test_descriptor_layout() {
    let ctx = context(WireTypeCode::Long, 4, 3);
    let value = ArrayBuilder::new(&[2, 3, 4]).fill(|i| ScalarNode::Int(i as i128));
    let mut buf = WireBuffer::new();
    export_array(&ctx, &value, &mut buf).expect("export");
    let bytes = buf.as_bytes();

    // 24 + 3 * 12 = 60, padded to 64
    assert_eq!(bytes[2], WireTypeCode::Long as u8);
    assert_eq!(bytes[3], WireClassCode::Array as u8);
    assert_eq!(u32_at(bytes, 4), 64);
    assert_eq!(bytes[10], 192);
    assert_eq!(bytes[11], 3);
    assert_eq!(u32_at(bytes, 12), 4 * 24);
    assert_eq!(u32_at(bytes, 16), 64);
    assert_zero_fill(bytes, 60, 4);

    // class A multipliers are extents; level n sits in slot n - 1, so slot 0 is innermost
    assert_eq!(u32_at(bytes, 20), 4);
    assert_eq!(u32_at(bytes, 24), 3);
    assert_eq!(u32_at(bytes, 28), 2);
    let bounds = 20 + 3 * 4;
    assert_eq!((i32_at(bytes, bounds), i32_at(bytes, bounds + 4)), (0, 3));
    assert_eq!((i32_at(bytes, bounds + 16), i32_at(bytes, bounds + 20)), (0, 1));

    assert_eq!(bytes.len(), 64 + 4 * 24);
    assert_eq!(u32_at(bytes, 64 + 4 * 23), 23);
}

#[test]
fn test_column_major_flag() {
    let ctx = context(WireTypeCode::Long, 4, 2).with_row_major(false);
    let mut buf = WireBuffer::new();
    export_array(&ctx, &int_grid(2, 2), &mut buf).expect("export");
    assert_eq!(buf.as_bytes()[10], 192 + 32);

    let static_class = context(WireTypeCode::Long, 4, 2).with_class(WireClassCode::Static);
    let mut buf = WireBuffer::new();
    export_array(&static_class, &int_grid(2, 2), &mut buf).expect("export");
    assert_eq!(buf.as_bytes()[10], 64);
}

#[test]
fn test_headerless_transfers_only_payload() {
    let ctx = context(WireTypeCode::Word, 2, 2);
    let value = int_grid(3, 4);
    let mut buf = WireBuffer::new();
    export_values(&ctx, &value, &mut buf).expect("export");
    assert_eq!(buf.len(), 3 * 4 * 2);
    assert_eq!(u16_at(buf.as_bytes(), 2 * 5), 101);

    let mut reader = WireBuffer::from_bytes(buf.into_inner());
    let mut target = blank_like(&value, &ScalarNode::Int(0));
    import_values(&ctx, &mut target, &mut reader).expect("import");
    assert_eq!(target, value);
    assert_eq!(reader.position(), 24);
}

#[test]
fn test_export_is_deterministic() {
    let ctx = MarshalContext::new(WireTypeCode::Text).with_dimension_count(2);
    let value = ArrayNode::from(vec![vec!["alpha", "beta"], vec!["gamma", ""]]);

    let mut first = WireBuffer::new();
    export_array(&ctx, &value, &mut first).expect("export");
    let mut second = WireBuffer::new();
    export_array(&ctx, &value, &mut second).expect("export");
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_array_after_prefix() {
    let ctx = context(WireTypeCode::Long, 4, 1);
    let value = ArrayNode::from(vec![7, 8, 9]);
    let mut buf = WireBuffer::from_bytes(vec![0xAA; 5]);
    buf.set_position(5);
    export_array(&ctx, &value, &mut buf).expect("export");

    // descriptor at 5, 36 bytes, value area at the next multiple of 16
    assert_eq!(u32_at(buf.as_bytes(), 5 + 4), 48);

    let mut reader = WireBuffer::from_bytes(buf.into_inner());
    reader.set_position(5);
    let mut target = ArrayNode::from(vec![0, 0, 0]);
    import_array(&ctx, &mut target, &mut reader).expect("import");
    assert_eq!(target, value);
}

#[test]
fn test_unsupported_element_aborts() {
    let ctx = context(WireTypeCode::Bool, 1, 1);
    let value = ArrayNode::from(vec![ScalarNode::Bool(true), ScalarNode::Int(1)]);
    let mut buf = WireBuffer::new();
    assert!(matches!(
        export_array(&ctx, &value, &mut buf),
        Err(WireError::UnsupportedElementType { type_code: "V", found: "int" })
    ));
}

#[test]
fn test_non_latin1_string_is_rejected() {
    let ctx = context(WireTypeCode::Text, 8, 1);
    let value = ArrayNode::from(vec!["ok", "\u{263a}"]);
    let mut buf = WireBuffer::new();
    assert!(matches!(
        export_array(&ctx, &value, &mut buf),
        Err(WireError::InvalidString(_))
    ));
}

#[test]
fn test_empty_array() {
    let ctx = context(WireTypeCode::Long, 4, 1);
    let value = ArrayNode::Nested(vec![]);
    let mut buf = WireBuffer::new();
    export_array(&ctx, &value, &mut buf).expect("export");
    let bytes = buf.as_bytes();
    assert_eq!(bytes.len(), 48);
    assert_eq!(u32_at(bytes, 12), 0);
    assert_eq!((i32_at(bytes, 24), i32_at(bytes, 28)), (0, -1));

    let mut reader = WireBuffer::from_bytes(buf.into_inner());
    let mut target = ArrayNode::Nested(vec![]);
    import_array(&ctx, &mut target, &mut reader).expect("import");
    assert_eq!(target, value);
}

#[test]
fn test_oversized_first_path_is_limit_error() {
    // 20 levels of 10 along the first path; every other branch is empty
    let mut value = ArrayNode::from(vec![0i32; 10]);
    for _ in 1..20 {
        let mut children = vec![value];
        children.extend((0..9).map(|_| ArrayNode::Nested(vec![])));
        value = ArrayNode::Nested(children);
    }
    let ctx = context(WireTypeCode::Long, 4, 20);
    let mut buf = WireBuffer::new();
    assert!(matches!(
        export_array(&ctx, &value, &mut buf),
        Err(WireError::LimitExceeded(_))
    ));
}

#[test]
fn test_vsa_null_term_truncates_longest_string() {
    let ctx = MarshalContext::new(WireTypeCode::VaryingText)
        .with_class(WireClassCode::VariantStringArray)
        .with_null_term(true)
        .with_dimension_count(1);
    let value = ArrayNode::from(vec!["a", "bb"]);
    let mut buf = WireBuffer::new();
    export_array(&ctx, &value, &mut buf).expect("export");
    assert_eq!(u16_at(buf.as_bytes(), 0), 2);

    let mut reader = WireBuffer::from_bytes(buf.into_inner());
    let mut target = blank_like(&value, &ScalarNode::Str(String::new()));
    import_array(&ctx, &mut target, &mut reader).expect("import");
    assert_eq!(target, ArrayNode::from(vec!["a", "b\0"]));
}
