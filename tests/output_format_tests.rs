//! Output formatting through the pipeline: JSON layouts and YAML documents.

use jqpipe::{
    BoxError, Context, EncodeOption, Encoder, ExecuteOptions, Format, JsonStyle, Pipeline, Value,
    YamlEncoder,
};
use serde_json::json;

fn render(query: &str, input: &serde_json::Value, opts: ExecuteOptions<'_>, format: Format) -> String {
    let pipeline = Pipeline::new(query).unwrap();
    let mut out = Vec::new();
    pipeline
        .execute(&Context::background(), input, opts.writer(&mut out, format))
        .unwrap();
    String::from_utf8(out).unwrap()
}

fn json_out(query: &str, input: &serde_json::Value, opts: ExecuteOptions<'_>) -> String {
    render(query, input, opts, Format::Json)
}

fn yaml_out(query: &str, input: &serde_json::Value, opts: ExecuteOptions<'_>) -> String {
    render(query, input, opts, Format::Yaml)
}

// ============================================================================
// JSON layouts
// ============================================================================

#[test]
fn compact_wins_in_either_order() {
    let input = json!({"a": [1, 2]});
    let first = json_out(".", &input, ExecuteOptions::new().compact_json().pretty_json());
    let second = json_out(".", &input, ExecuteOptions::new().pretty_json().compact_json());
    assert_eq!(first, "{\"a\":[1,2]}\n");
    assert_eq!(first, second);
}

#[test]
fn raw_combinations_are_order_independent() {
    let input = json!({"s": "hello world", "o": {"k": [1]}});
    let orders = [
        ExecuteOptions::new().raw_json().pretty_json(),
        ExecuteOptions::new().pretty_json().raw_json(),
        ExecuteOptions::new().raw_json().compact_json(),
        ExecuteOptions::new().compact_json().raw_json(),
    ];
    for opts in orders {
        assert_eq!(json_out(".s, .o", &input, opts), "hello world\n{\"k\":[1]}\n");
    }
}

#[test]
fn raw_string_has_no_quotes() {
    let out = json_out(".", &json!("hello world"), ExecuteOptions::new().raw_json());
    assert_eq!(out, "hello world\n");
}

#[test]
fn raw_keeps_embedded_newlines() {
    let out = json_out(".", &json!("a\nb"), ExecuteOptions::new().raw_json());
    assert_eq!(out, "a\nb\n");
}

#[test]
fn raw_non_strings_are_json() {
    let out = json_out(".[]", &json!([1, null, true, [2]]), ExecuteOptions::new().raw_json());
    assert_eq!(out, "1\nnull\ntrue\n[2]\n");
}

#[test]
fn pretty_nested() {
    let out = json_out(".", &json!({"b": [1, {}], "a": []}), ExecuteOptions::new().pretty_json());
    assert_eq!(
        out,
        "{\n  \"a\": [],\n  \"b\": [\n    1,\n    {}\n  ]\n}\n"
    );
}

#[test]
fn raw_style_pipeline_default() {
    let pipeline = Pipeline::builder()
        .query(".name")
        .default_json_style(JsonStyle::PRETTY | JsonStyle::RAW)
        .build()
        .unwrap();
    let mut out = Vec::new();
    pipeline
        .execute(
            &Context::background(),
            &json!({"name": "x"}),
            ExecuteOptions::new().writer(&mut out, Format::Json),
        )
        .unwrap();
    assert_eq!(out, b"x\n");
}

#[test]
fn special_floats_become_null() {
    let input = Value::from(vec![Value::Float(f64::NAN), Value::Float(f64::INFINITY)]);
    let pipeline = Pipeline::new(".").unwrap();
    let mut out = Vec::new();
    pipeline
        .execute(
            &Context::background(),
            &input,
            ExecuteOptions::new().writer(&mut out, Format::Json),
        )
        .unwrap();
    assert_eq!(out, b"[null,null]\n");
}

// ============================================================================
// YAML
// ============================================================================

#[test]
fn yaml_single_document() {
    let input = json!({"name": "test", "items": ["a", "b", "c"]});
    let out = yaml_out(".", &input, ExecuteOptions::new());
    assert_eq!(out, "items:\n- a\n- b\n- c\nname: test\n");
}

#[test]
fn yaml_documents_separated() {
    let input = json!([{"id": 1}, {"id": 2}, {"id": 3}]);
    let out = yaml_out(".[]", &input, ExecuteOptions::new());
    assert_eq!(out, "id: 1\n---\nid: 2\n---\nid: 3\n");
    assert_eq!(out.matches("---").count(), 2);
}

#[test]
fn yaml_no_results_no_output() {
    let out = yaml_out("empty", &json!(1), ExecuteOptions::new());
    assert_eq!(out, "");
}

#[test]
fn yaml_indent_options() {
    let input = json!({"outer": {"list": [1, 2]}});
    let out = yaml_out(
        ".",
        &input,
        ExecuteOptions::new().encode_options([
            EncodeOption::Indent(4),
            EncodeOption::IndentSequence(true),
        ]),
    );
    assert_eq!(out, "outer:\n    list:\n        - 1\n        - 2\n");
}

#[test]
fn yaml_literal_multiline_option() {
    let input = json!({"text": "line1\nline2"});
    let plain = yaml_out(".", &input, ExecuteOptions::new());
    assert_eq!(plain, "text: \"line1\\nline2\"\n");

    let literal = yaml_out(
        ".",
        &input,
        ExecuteOptions::new().encode_options([EncodeOption::LiteralStyleIfMultiline(true)]),
    );
    assert_eq!(literal, "text: |-\n  line1\n  line2\n");
}

#[test]
fn yaml_quotes_ambiguous_strings() {
    let input = json!(["true", "123", "", "plain"]);
    let out = yaml_out(".", &input, ExecuteOptions::new());
    assert_eq!(out, "- \"true\"\n- \"123\"\n- \"\"\n- plain\n");
}

#[test]
fn pipeline_defaults_reach_yaml_writer() {
    let pipeline = Pipeline::builder()
        .query(".")
        .default_encode_options([EncodeOption::IndentSequence(true)])
        .build()
        .unwrap();
    let mut out = Vec::new();
    pipeline
        .execute(
            &Context::background(),
            &json!({"k": ["v"]}),
            ExecuteOptions::new().writer(&mut out, Format::Yaml),
        )
        .unwrap();
    assert_eq!(out, b"k:\n  - v\n");
}

#[test]
fn shared_yaml_encoder_continues_separators() {
    let pipeline = Pipeline::new(".").unwrap();
    let mut enc = YamlEncoder::new(Vec::new());
    for doc in [json!(1), json!(2)] {
        pipeline
            .execute(
                &Context::background(),
                &doc,
                ExecuteOptions::new().encoder(&mut enc),
            )
            .unwrap();
    }
    assert_eq!(enc.documents(), 2);
    assert_eq!(enc.into_inner(), b"1\n---\n2\n");
}

#[test]
fn custom_encoder_sees_values_in_order() {
    struct Names(Vec<String>);
    impl Encoder for Names {
        fn encode(&mut self, value: &Value) -> Result<(), BoxError> {
            let name = value.as_str().ok_or("expected a string")?;
            self.0.push(name.to_string());
            Ok(())
        }
    }

    let pipeline = Pipeline::new(".[].name").unwrap();
    let mut names = Names(Vec::new());
    pipeline
        .execute(
            &Context::background(),
            &json!([{"name": "x"}, {"name": "y"}]),
            ExecuteOptions::new().encoder(&mut names),
        )
        .unwrap();
    assert_eq!(names.0, ["x", "y"]);
}
