//! Tests for expression parsing, evaluation and dependency extraction

use approx::assert_relative_eq;
use param_resolver::parameters::expression::{
    is_reserved, EvaluationContext, Expression, ExpressionError, SimpleContext, RESERVED_NAMES,
};
use param_resolver::parameters::Value;
use std::collections::HashMap;

/// Context that records every lookup in order
#[derive(Default)]
struct RecordingContext {
    values: HashMap<String, Value>,
    reads: Vec<String>,
}

impl EvaluationContext for RecordingContext {
    fn read_variable(&mut self, name: &str) -> Value {
        self.reads.push(name.to_string());
        self.values.get(name).cloned().unwrap_or_default()
    }
}

#[test]
fn test_expression_variables() {
    let expr = Expression::parse("wall_line_width * wall_line_count").unwrap();
    assert_eq!(
        expr.variables(),
        vec!["wall_line_count".to_string(), "wall_line_width".to_string()]
    );

    let expr = Expression::parse("round(max(a, b) / Math.PI, 2) + parseInt(c)").unwrap();
    assert_eq!(
        expr.variables(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );

    // Literals only
    let expr = Expression::parse("42 * 2").unwrap();
    assert!(expr.variables().is_empty());

    // Duplicates collapse
    let expr = Expression::parse("x + x * x").unwrap();
    assert_eq!(expr.variables(), vec!["x".to_string()]);
}

#[test]
fn test_helper_string_keys_are_dependencies() {
    let expr = Expression::parse("resolveOrValue('adhesion_type') === 'brim'").unwrap();
    assert_eq!(expr.variables(), vec!["adhesion_type".to_string()]);

    let expr = Expression::parse("extruderValue(defaultExtruderPosition(), 'material_flow')")
        .unwrap();
    assert_eq!(expr.variables(), vec!["material_flow".to_string()]);

    let expr = Expression::parse("max(extruderValues('infill_line_width'))").unwrap();
    assert_eq!(expr.variables(), vec!["infill_line_width".to_string()]);
}

#[test]
fn test_reserved_names() {
    for name in RESERVED_NAMES {
        assert!(is_reserved(name));
    }
    assert!(!is_reserved("layer_height"));

    let expr = Expression::parse("Math.ceil(Number.EPSILON)").unwrap();
    assert!(expr.variables().is_empty());
}

#[test]
fn test_simple_context_evaluation() {
    let mut context = SimpleContext::new();
    context.set_variable("machine_nozzle_size", 0.4);
    context.set_variable("adhesion_type", "brim");

    let expr = Expression::parse("machine_nozzle_size * 20").unwrap();
    assert_relative_eq!(expr.evaluate(&mut context).unwrap().to_number(), 8.0);

    let expr = Expression::parse("adhesion_type == 'brim' ? 1 : 0").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Number(1.0));

    let expr = Expression::parse("ceil(machine_nozzle_size * 10) / 10").unwrap();
    assert_relative_eq!(expr.evaluate(&mut context).unwrap().to_number(), 0.4);
}

#[test]
fn test_string_escapes() {
    let mut context = SimpleContext::new();
    context.set_variable("label", "it's");

    let expr = Expression::parse(r#"label === 'it\'s'"#).unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Bool(true));

    let expr = Expression::parse(r#""a \"quoted\" \\ path\n""#).unwrap();
    assert_eq!(
        expr.evaluate(&mut context).unwrap(),
        Value::from("a \"quoted\" \\ path\n")
    );

    let expr = Expression::parse("''").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::from(""));

    assert!(Expression::parse(r#"'unterminated\'"#).is_err());
}

#[test]
fn test_hashmap_context() {
    let mut variables: HashMap<String, Value> = HashMap::new();
    variables.insert("speed".to_string(), Value::Number(60.0));

    let expr = Expression::parse("speed / 2 >= 30").unwrap();
    assert_eq!(expr.evaluate(&mut variables).unwrap(), Value::Bool(true));
}

#[test]
fn test_reads_are_observed() {
    let mut context = RecordingContext::default();
    context.values.insert("a".to_string(), Value::Bool(false));
    context.values.insert("b".to_string(), Value::Number(2.0));

    // `b` is never read because `&&` short-circuits
    let expr = Expression::parse("a && b").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Bool(false));
    assert_eq!(context.reads, vec!["a".to_string()]);

    context.reads.clear();
    let expr = Expression::parse("resolveOrValue('b')").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Number(2.0));
    assert!(context.reads.contains(&"b".to_string()));
}

#[test]
fn test_resolve_or_value_falls_back_to_key() {
    let mut context = SimpleContext::new();
    let expr = Expression::parse("resolveOrValue('unknown_key')").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::from("unknown_key"));
}

#[test]
fn test_extruder_values_is_single_element() {
    let mut context = SimpleContext::new();
    context.set_variable("infill_line_width", 0.5);

    let expr = Expression::parse("extruderValues('infill_line_width')").unwrap();
    assert_eq!(
        expr.evaluate(&mut context).unwrap(),
        Value::List(vec![Value::Number(0.5)])
    );

    let expr = Expression::parse("max(extruderValues('infill_line_width'))").unwrap();
    assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Number(0.5));
}

#[test]
fn test_runtime_errors() {
    let mut context = SimpleContext::new();

    let expr = Expression::parse("support_angle.value").unwrap();
    assert!(matches!(
        expr.evaluate(&mut context),
        Err(ExpressionError::PropertyOfUndefined { .. })
    ));

    let expr = Expression::parse("not_a_function(1)").unwrap();
    assert!(matches!(
        expr.evaluate(&mut context),
        Err(ExpressionError::UndefinedFunction { .. })
    ));

    context.set_variable("n", 3.0);
    let expr = Expression::parse("n(1)").unwrap();
    assert!(matches!(
        expr.evaluate(&mut context),
        Err(ExpressionError::NotCallable { .. })
    ));
}

#[test]
fn test_parse_errors() {
    for source in ["", "   ", "a +", "(a", "a b", "'open"] {
        assert!(
            matches!(
                Expression::parse(source),
                Err(ExpressionError::ParseError { .. })
            ),
            "expected parse error for {:?}",
            source
        );
    }
}
