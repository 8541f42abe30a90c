use super::*;

// =============================================================================
// JSON strategy
// =============================================================================

#[test]
fn json_object_flattens_top_level() {
    let fields = extract_fields(r#"{"level":"INFO","msg":"started"}"#);
    assert_eq!(fields.get("level"), Some("INFO"));
    assert_eq!(fields.get("msg"), Some("started"));
}

#[test]
fn json_nested_objects_use_dot_paths() {
    let fields = extract_fields(r#"{"http":{"status":200,"req":{"method":"GET"}}}"#);
    assert_eq!(fields.get("http.status"), Some("200"));
    assert_eq!(fields.get("http.req.method"), Some("GET"));
}

#[test]
fn json_scalars_stringify() {
    let fields = extract_fields(r#"{"n":3.5,"ok":true,"missing":null}"#);
    assert_eq!(fields.get("n"), Some("3.5"));
    assert_eq!(fields.get("ok"), Some("true"));
    assert_eq!(fields.get("missing"), Some("null"));
}

#[test]
fn json_arrays_are_leaf_values() {
    let fields = extract_fields(r#"{"tags":["a","b"]}"#);
    assert_eq!(fields.get("tags"), Some(r#"["a","b"]"#));
}

#[test]
fn empty_json_object_falls_through() {
    // {} yields no fields, so later strategies run (and also find none)
    let fields = extract_fields("{}");
    assert!(fields.is_empty());
}

// =============================================================================
// key=value strategy
// =============================================================================

#[test]
fn key_value_whitespace_separated() {
    let fields = extract_fields("level=INFO msg=hi user=alice");
    assert_eq!(fields.get("level"), Some("INFO"));
    assert_eq!(fields.get("msg"), Some("hi"));
    assert_eq!(fields.get("user"), Some("alice"));
}

#[test]
fn key_value_comma_separated() {
    let fields = extract_fields("a=1,b=2,c=3");
    assert_eq!(fields.get("a"), Some("1"));
    assert_eq!(fields.get("b"), Some("2"));
    assert_eq!(fields.get("c"), Some("3"));
}

#[test]
fn key_value_quoted_value_keeps_spaces() {
    let fields = extract_fields(r#"msg="connection lost" level=WARN"#);
    assert_eq!(fields.get("msg"), Some("connection lost"));
    assert_eq!(fields.get("level"), Some("WARN"));
}

#[test]
fn key_value_ignores_bare_tokens() {
    let fields = extract_fields("prefix level=DEBUG trailing");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("level"), Some("DEBUG"));
}

// =============================================================================
// colon strategy
// =============================================================================

#[test]
fn colon_separated_lines() {
    let fields = extract_fields("status: ok\ncode: 200");
    assert_eq!(fields.get("status"), Some("ok"));
    assert_eq!(fields.get("code"), Some("200"));
}

#[test]
fn colon_requires_single_word_key() {
    // A sentence with a colon should not produce a junk field named
    // after the whole prefix; it falls through to positional naming.
    let fields = extract_fields("something went wrong: timeout");
    assert_eq!(fields.get("field_1"), Some("something"));
    assert!(fields.get("something went wrong").is_none());
}

// =============================================================================
// positional strategy
// =============================================================================

#[test]
fn positional_tokens_get_indexed_names() {
    let fields = extract_fields("alpha beta gamma");
    assert_eq!(fields.get("field_1"), Some("alpha"));
    assert_eq!(fields.get("field_2"), Some("beta"));
    assert_eq!(fields.get("field_3"), Some("gamma"));
    assert_eq!(fields.len(), 3);
}

#[test]
fn empty_payload_yields_nothing() {
    assert!(extract_fields("").is_empty());
    assert!(extract_fields("   ").is_empty());
}

// =============================================================================
// priority ordering
// =============================================================================

#[test]
fn json_wins_over_key_value() {
    // Valid JSON whose string content contains '=' must be parsed as JSON
    let fields = extract_fields(r#"{"q":"a=b"}"#);
    assert_eq!(fields.get("q"), Some("a=b"));
    assert!(fields.get("a").is_none());
}

#[test]
fn key_value_wins_over_positional() {
    let fields = extract_fields("user=bob");
    assert_eq!(fields.get("user"), Some("bob"));
    assert!(fields.get("field_1").is_none());
}

#[test]
fn lookup_field_finds_nested_path() {
    assert_eq!(
        lookup_field(r#"{"a":{"b":"deep"}}"#, "a.b"),
        Some("deep".to_owned())
    );
    assert_eq!(lookup_field("plain text here", "a.b"), None);
}

#[test]
fn extraction_order_is_stable() {
    let fields = extract_fields("z=1 a=2 m=3");
    let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
}
