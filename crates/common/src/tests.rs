use super::*;
use types::Value;

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.page_size, 1000);
    assert_eq!(config.cache_size, 10);
    assert!(!config.strict_reads);
}

#[test]
fn config_builder_overrides() {
    let config = Config::builder().page_size(4).cache_size(2).build();
    assert_eq!(config.page_size, 4);
    assert_eq!(config.cache_size, 2);
    assert_eq!(config.data_dir, std::path::PathBuf::from("./data"));
}

#[test]
fn error_messages_name_the_offender() {
    let err =
        EngineError::SchemaMismatch("'(foo.a > 1)' references 'foo.a' which is absent".into());
    assert_eq!(
        err.to_string(),
        "schema mismatch: '(foo.a > 1)' references 'foo.a' which is absent"
    );

    let err = EngineError::parse(3, "unexpected token ')'");
    assert_eq!(err.to_string(), "parse error at position 3: unexpected token ')'");

    let err = EngineError::type_mismatch(
        "(a + b)",
        types::ValueError::BadOperands {
            op: "+",
            left: "str",
            right: "int",
        },
    );
    assert!(err.to_string().contains("(a + b)"));
}

#[test]
fn render_rows_includes_headers_and_nulls() {
    let headers = vec!["a".to_string(), "b".to_string()];
    let rows = vec![
        vec![Value::Int(1), Value::Null],
        vec![Value::Int(2), Value::Str("x".into())],
    ];
    let out = pretty::render_rows(&headers, &rows, pretty::TableStyleKind::Ascii);
    assert!(out.contains('a'));
    assert!(out.contains("NULL"));
    assert!(out.contains('x'));
}
