//! Tests for definitions and the catalog

use crate::test_helpers::{float, printer_profile};
use param_resolver::parameters::{
    Bounds, CatalogError, Definition, DefinitionError, ParameterCatalog, ParameterType,
    SettingState, Value,
};
use std::io::Write;

#[test]
fn test_json_round_trip_keeps_order_and_fields() {
    let definition = printer_profile("printer");
    let json = definition.to_json().unwrap();
    let back = Definition::from_json(&json).unwrap();

    assert_eq!(back, definition);
    let keys: Vec<&String> = back.keys().collect();
    assert_eq!(keys[0], "resolution");
    assert_eq!(keys[keys.len() - 1], "brim_width");
}

#[test]
fn test_host_spellings() {
    let json = r##"{
        "definitionId": "printer",
        "settings": {
            "machine_settings": { "type": "mainCategory" },
            "machine_name": { "type": "str", "default_value": "Delta" },
            "material_color": { "type": "color", "default_value": "#ff0000" },
            "support_enable": { "type": "bool", "default_value": false, "visible": true },
            "speed_print": { "type": "float", "default_value": 60, "min": 1, "max": 300 }
        }
    }"##;

    let definition = Definition::from_json(json).unwrap();
    assert_eq!(
        definition.get("machine_settings").unwrap().param_type,
        ParameterType::MainCategory
    );
    assert_eq!(
        definition.get("machine_name").unwrap().param_type,
        ParameterType::String
    );
    assert_eq!(
        definition.value("support_enable"),
        Some(&Value::Bool(false))
    );

    let speed = definition.get("speed_print").unwrap();
    assert_eq!(speed.min, Some(1.0));
    assert_eq!(speed.max, Some(300.0));
    assert_eq!(Bounds::from_limits(speed.min, speed.max).clamp(500.0), 300.0);
}

#[test]
fn test_load_json_file() {
    let path = std::env::temp_dir().join(format!(
        "param-resolver-definition-{}.json",
        std::process::id()
    ));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(printer_profile("from-file").to_json().unwrap().as_bytes())
        .unwrap();
    drop(file);

    let definition = Definition::load_json(&path).unwrap();
    assert_eq!(definition.definition_id, "from-file");
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        Definition::load_json(&path),
        Err(DefinitionError::IoError(_))
    ));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        Definition::from_json("{ \"settings\": {} }"),
        Err(DefinitionError::JsonError(_))
    ));
}

#[test]
fn test_catalog_first_definition_wins() {
    let mut catalog = ParameterCatalog::new();
    let first = printer_profile("first");
    let second = Definition::new("second")
        .with_setting("line_width", float(0.5).with_expr("machine_nozzle_size * 1.2"))
        .with_setting("layer_height", float(0.2));

    for definition in [&first, &second] {
        for (key, setting) in &definition.settings {
            catalog.register(key, setting);
        }
    }

    // Category skipped, `layer_height` appended after the first profile's keys
    assert_eq!(catalog.len(), first.len());
    assert!(!catalog.contains("resolution"));
    assert_eq!(catalog.keys().last().map(String::as_str), Some("layer_height"));

    let line_width = catalog.require("line_width").unwrap();
    assert_eq!(line_width.default_expr.as_deref(), Some("machine_nozzle_size"));
    assert_eq!(line_width.min_expr.as_deref(), Some("machine_nozzle_size * 0.5"));
    assert_eq!(line_width.default_value, Value::Number(0.4));

    assert!(matches!(
        catalog.require("resolution"),
        Err(CatalogError::UnknownParameter { .. })
    ));
}

#[test]
fn test_constraint_expressions() {
    let mut catalog = ParameterCatalog::new();
    catalog.register(
        "brim_width",
        &SettingState::new(ParameterType::Float, 8.0)
            .with_visible_expr("adhesion_type === 'brim'")
            .with_max_expr("100"),
    );

    let item = catalog.get("brim_width").unwrap();
    let exprs: Vec<&str> = item.constraint_exprs().collect();
    assert_eq!(exprs, ["adhesion_type === 'brim'", "100"]);
    assert!(!item.has_expr());
}
