//! Resolve a small printer profile and show what a nozzle change cascades into.
//!
//! Run with `cargo run --example machine_profile`.

use param_resolver::parameters::{Definition, Value};
use param_resolver::resolver::{ResolveOptions, ResolverService};

const PROFILE: &str = r#"{
    "definitionId": "delta_printer",
    "settings": {
        "machine_settings": { "type": "mainCategory" },
        "machine_nozzle_size": { "type": "float", "default_value": 0.4, "min_expr": "0.1", "max_expr": "1.2" },
        "line_width": {
            "type": "float", "default_value": 0.4,
            "calcu_value": "machine_nozzle_size",
            "min_expr": "machine_nozzle_size * 0.5",
            "max_expr": "machine_nozzle_size * 2"
        },
        "wall_line_count": { "type": "int", "default_value": 2 },
        "wall_thickness": {
            "type": "float", "default_value": 0.8,
            "calcu_value": "line_width * wall_line_count"
        },
        "layer_height": { "type": "float", "default_value": 0.2, "max_expr": "machine_nozzle_size * 0.8" },
        "adhesion_type": { "type": "enum", "default_value": "skirt" },
        "brim_width": {
            "type": "float", "default_value": 8,
            "calcu_value": "round(line_width * 20, 1)",
            "visible_expr": "adhesion_type === 'brim'"
        },
        "skirt_line_count": {
            "type": "int", "default_value": 1,
            "visible_expr": "adhesion_type === 'skirt'"
        }
    }
}"#;

fn print_definition(title: &str, definition: &Definition) {
    println!("\n{}", title);
    println!("{:-<72}", "");
    for (key, setting) in &definition.settings {
        if setting.param_type.is_category() {
            continue;
        }
        let bounds = match (setting.min, setting.max) {
            (None, None) => String::new(),
            (min, max) => format!(
                " [{}, {}]",
                min.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
                max.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
            ),
        };
        println!(
            "{:<22} {:>8}{:<16} visible={:<5} mismatch={}",
            key,
            setting.default_value.to_string(),
            bounds,
            setting.visible.unwrap_or(true),
            setting.mismatch
        );
    }
}

fn main() -> param_resolver::Result<()> {
    let mut definition = Definition::from_json(PROFILE)?;
    let mut resolver = ResolverService::new();
    let options = ResolveOptions::default();

    let report = resolver.resolve(&mut definition, &[], &options);
    println!("Initial resolve, context '{}'", report.context_key);
    print_definition("Initial state", &definition);

    let modified = vec![
        ("machine_nozzle_size".to_string(), Value::from(0.6)),
        ("adhesion_type".to_string(), Value::from("brim")),
    ];
    let report = resolver.resolve(&mut definition, &modified, &options);
    println!("\nCascade updated: {}", report.updated.join(", "));
    println!("Visibility updated: {}", report.visibility_updated.join(", "));
    for failure in &report.failures {
        println!("failed: {}", failure);
    }
    print_definition("After nozzle 0.6 and brim adhesion", &definition);

    // Overriding a computed value leaves it flagged as diverging from its formula
    let modified = vec![("line_width".to_string(), Value::from(0.7))];
    resolver.resolve(&mut definition, &modified, &options);
    print_definition("After overriding line_width", &definition);

    println!("\n{}", definition.to_json()?);
    Ok(())
}
