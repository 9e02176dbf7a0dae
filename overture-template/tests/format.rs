use std::collections::HashMap;

use serde_json::{json, Value};

use overture_template::{format, format_str, Params, TemplateError, TemplateValue};

fn params(pairs: &[(&str, Value)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn substitutes_named_placeholders() {
    let vars = params(&[("food", json!("pizza")), ("city", json!("Rome"))]);
    let rendered = format_str("Where can I eat {food} in {city}?", &vars).unwrap();
    assert_eq!(rendered, "Where can I eat pizza in Rome?");
}

#[test]
fn numbers_render_in_decimal_form() {
    let vars = params(&[("quantity", json!(3))]);
    let rendered = format_str("give no more than {quantity} options", &vars).unwrap();
    assert_eq!(rendered, "give no more than 3 options");
}

#[test]
fn missing_placeholder_is_left_verbatim() {
    let rendered = format_str("Hello {name}", &HashMap::new()).unwrap();
    assert_eq!(rendered, "Hello {name}");
}

#[test]
fn unescapes_escaped_variable_references() {
    let template = TemplateValue::tagged(json!({
        "a": "A here: \\{a\\}",
        "b": "B here: \\{b\\}",
        "c": { "d": "D here: \\{d\\}", "e": "E here: \\{e\\}" },
    }));
    let resolved = format(&template, Some(&HashMap::new())).unwrap();
    assert_eq!(
        resolved,
        json!({
            "a": "A here: {a}",
            "b": "B here: {b}",
            "c": { "d": "D here: {d}", "e": "E here: {e}" },
        })
    );
}

#[test]
fn escape_collapses_even_when_param_is_defined() {
    let vars = params(&[("x", json!("V"))]);
    let rendered = format_str("\\{x\\}", &vars).unwrap();
    assert_eq!(rendered, "{x}");
}

#[test]
fn mixes_escaped_and_unescaped_references() {
    let template = TemplateValue::tagged(json!({
        "a": "A here: \\{a\\} but this is the value of a: {a}",
        "b": "B here: \\{b\\}",
    }));
    let vars = params(&[("a", json!("Heya"))]);
    let resolved = format(&template, Some(&vars)).unwrap();
    assert_eq!(
        resolved,
        json!({
            "a": "A here: {a} but this is the value of a: Heya",
            "b": "B here: {b}",
        })
    );
}

#[test]
fn tagged_template_without_params_fails_fast() {
    let template = TemplateValue::tagged(json!("Hello {name}"));
    let err = format(&template, None).unwrap_err();
    assert!(matches!(err, TemplateError::MissingParams));
}

#[test]
fn raw_value_passes_through_without_params() {
    let template = TemplateValue::raw(json!("Hello {name}"));
    let resolved = format(&template, None).unwrap();
    assert_eq!(resolved, json!("Hello {name}"));
}

#[test]
fn formatting_does_not_mutate_the_source() {
    let original = json!({ "content": "Hi {name}" });
    let template = TemplateValue::tagged(original.clone());
    let vars = params(&[("name", json!("Ada"))]);
    let resolved = format(&template, Some(&vars)).unwrap();

    assert_eq!(resolved, json!({ "content": "Hi Ada" }));
    assert_eq!(template.source(), Some(&original));
    assert_eq!(template.value(), &original);
}

#[test]
fn numbers_and_booleans_pass_through_recursion_unchanged() {
    let template = TemplateValue::tagged(json!({
        "schema": { "count": 7, "flag": true, "nothing": null },
        "label": "{label}",
    }));
    let vars = params(&[("label", json!("ok"))]);
    let resolved = format(&template, Some(&vars)).unwrap();
    assert_eq!(
        resolved,
        json!({
            "schema": { "count": 7, "flag": true, "nothing": null },
            "label": "ok",
        })
    );
}
