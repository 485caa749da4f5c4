//! Tests for contexts, the catalog and host functions

use crate::test_helpers::{float, modifications, number, printer_profile};
use param_resolver::parameters::{Binding, ContextState, Definition, Value};
use param_resolver::resolver::{ResolveOptions, ResolverConfig, ResolverService};

#[test]
fn test_context_created_per_definition() {
    let mut resolver = ResolverService::new();
    let mut first = printer_profile("first");
    let mut second = printer_profile("second");

    assert_eq!(resolver.context_state("first"), ContextState::Uninitialized);
    resolver.resolve(&mut first, &[], &ResolveOptions::default());
    resolver.resolve(&mut second, &[], &ResolveOptions::default());

    assert_eq!(resolver.context_count(), 2);
    assert_eq!(resolver.context_state("first"), ContextState::Ready);
    assert_eq!(resolver.context_state("second"), ContextState::Ready);

    let context = resolver.context("first").unwrap();
    assert!(context.is_accessor("line_width"));
    // Categories never get a binding
    assert!(context.binding("resolution").is_none());
    assert!(matches!(
        context.binding("resolveOrValue"),
        Some(Binding::Helper(_))
    ));
}

#[test]
fn test_contexts_are_isolated() {
    let mut resolver = ResolverService::new();
    let mut first = printer_profile("first");
    let mut second = printer_profile("second");

    resolver.resolve(
        &mut first,
        &modifications(&[("machine_nozzle_size", 0.8)]),
        &ResolveOptions::default(),
    );
    resolver.resolve(&mut second, &[], &ResolveOptions::default());

    assert_eq!(number(&first, "line_width"), 0.8);
    assert_eq!(number(&second, "line_width"), 0.4);
}

#[test]
fn test_shared_context_key() {
    let mut resolver = ResolverService::new();
    let options = ResolveOptions::default().with_context_key("shared");
    let mut first = printer_profile("first");
    let mut second = printer_profile("second");

    resolver.resolve(&mut first, &[], &options);
    resolver.resolve(
        &mut second,
        &modifications(&[("machine_nozzle_size", 0.6)]),
        &options,
    );

    assert_eq!(resolver.context_count(), 1);
    assert_eq!(resolver.context_state("shared"), ContextState::Ready);
    assert_eq!(resolver.context_state("first"), ContextState::Uninitialized);
    assert_eq!(number(&second, "line_width"), 0.6);
    assert_eq!(number(&first, "line_width"), 0.4);
}

#[test]
fn test_shared_context_with_different_key_sets() {
    let mut resolver = ResolverService::new();
    let options = ResolveOptions::default().with_context_key("shared");
    let mut full = Definition::new("full")
        .with_setting("a", float(1.0))
        .with_setting("b", float(2.0).with_expr("a * 2"));
    let mut partial = Definition::new("partial").with_setting("a", float(1.0));

    resolver.resolve(&mut full, &[], &options);
    resolver.resolve(&mut partial, &[], &options);
    let report = resolver.resolve(&mut full, &modifications(&[("a", 5.0)]), &options);

    assert!(report.is_clean());
    assert_eq!(number(&full, "a"), 5.0);
    assert_eq!(number(&full, "b"), 10.0);
    assert!(resolver.context("shared").unwrap().is_accessor("b"));

    resolver.resolve(&mut partial, &modifications(&[("a", 3.0)]), &options);
    resolver.resolve(&mut full, &modifications(&[("a", 7.0)]), &options);
    assert_eq!(number(&partial, "a"), 3.0);
    assert!(!partial.contains("b"));
    assert_eq!(number(&full, "b"), 14.0);
}

#[test]
fn test_shared_context_created_by_smaller_definition() {
    let mut resolver = ResolverService::new();
    let options = ResolveOptions::default().with_context_key("shared");
    let mut full = Definition::new("full")
        .with_setting("a", float(1.0))
        .with_setting("b", float(2.0).with_expr("a * 2"));
    let mut partial = Definition::new("partial").with_setting("a", float(1.0));

    // Registers both keys so the graphs know `b` depends on `a`
    resolver.register_definition(&full);
    resolver.resolve(&mut partial, &[], &options);
    resolver.resolve(&mut full, &modifications(&[("a", 4.0)]), &options);

    assert_eq!(number(&full, "b"), 8.0);
    assert!(resolver.context("shared").unwrap().is_accessor("b"));
}

#[test]
fn test_report_names_context() {
    let mut resolver = ResolverService::new();
    let mut definition = printer_profile("printer");

    let report = resolver.resolve(&mut definition, &[], &ResolveOptions::default());
    assert_eq!(report.context_key, "printer");

    let options = ResolveOptions::default().with_context_key("preview");
    let report = resolver.resolve(&mut definition, &[], &options);
    assert_eq!(report.context_key, "preview");
}

#[test]
fn test_first_definition_rules_win() {
    let mut resolver = ResolverService::new();
    let mut first = Definition::new("first")
        .with_setting("a", float(1.0))
        .with_setting("b", float(2.0).with_expr("a * 2"));
    let mut second = Definition::new("second")
        .with_setting("a", float(1.0))
        .with_setting("b", float(3.0).with_expr("a * 3"));

    resolver.resolve(&mut first, &[], &ResolveOptions::default());
    resolver.resolve(
        &mut second,
        &modifications(&[("a", 2.0)]),
        &ResolveOptions::default(),
    );

    assert_eq!(
        resolver.get_parameter_item("b").unwrap().default_expr.as_deref(),
        Some("a * 2")
    );
    assert_eq!(number(&second, "b"), 4.0);
}

#[test]
fn test_parameter_item_available_after_registration() {
    let mut resolver = ResolverService::new();
    assert!(resolver.get_parameter_item("line_width").is_none());

    let added = resolver.register_definition(&printer_profile("printer"));
    assert_eq!(added, 7);

    let item = resolver.get_parameter_item("line_width").unwrap();
    assert_eq!(item.max_expr.as_deref(), Some("machine_nozzle_size * 2"));
    assert!(resolver.value_graph().is_empty());
    assert_eq!(resolver.register_definition(&printer_profile("again")), 0);
}

#[test]
fn test_missing_entry_uses_catalog_default() {
    let mut resolver = ResolverService::new();
    let mut full = Definition::new("full")
        .with_setting("a", float(3.0))
        .with_setting("b", float(6.0).with_expr("a * 2"));
    resolver.resolve(&mut full, &[], &ResolveOptions::default());

    // `a` is absent here, so `b` is computed from the catalog's default for it
    let mut partial = Definition::new("partial").with_setting("b", float(6.0).with_expr("a * 2"));
    let report = resolver.resolve(&mut partial, &[], &ResolveOptions::default());

    assert!(report.is_clean());
    assert!(!partial.get("b").unwrap().mismatch);
}

#[test]
fn test_reset_keeps_catalog_and_graphs() {
    let mut resolver = ResolverService::new();
    let mut definition = printer_profile("printer");
    resolver.resolve(&mut definition, &[], &ResolveOptions::default());
    let nodes = resolver.value_graph().node_count();

    resolver.reset_all_contexts();

    assert_eq!(resolver.context_count(), 0);
    assert_eq!(resolver.context_state("printer"), ContextState::Uninitialized);
    assert!(resolver.get_parameter_item("brim_width").is_some());
    assert_eq!(resolver.value_graph().node_count(), nodes);

    resolver.resolve(
        &mut definition,
        &modifications(&[("machine_nozzle_size", 0.25)]),
        &ResolveOptions::default(),
    );
    assert_eq!(number(&definition, "wall_line_width"), 0.25);
}

#[test]
fn test_apply_parameter_modifications_does_not_cascade() {
    let resolver = ResolverService::new();
    let mut definition = printer_profile("printer");

    let written = resolver.apply_parameter_modifications(
        &mut definition,
        &[
            ("machine_nozzle_size".to_string(), Value::from(0.6)),
            ("resolution".to_string(), Value::from(1.0)),
        ],
    );

    assert_eq!(written, 1);
    assert_eq!(number(&definition, "machine_nozzle_size"), 0.6);
    assert_eq!(number(&definition, "line_width"), 0.4);
    assert_eq!(definition.value("resolution"), Some(&Value::Undefined));
}

#[test]
fn test_uncached_resolver_matches_cached() {
    let config = ResolverConfig::default().with_cache_expressions(false);
    let mut uncached = ResolverService::with_config(config);
    let mut cached = ResolverService::new();

    let mut a = printer_profile("printer");
    let mut b = printer_profile("printer");
    let items = modifications(&[("machine_nozzle_size", 0.6), ("wall_line_count", 3.0)]);

    uncached.resolve(&mut a, &items, &ResolveOptions::default());
    cached.resolve(&mut b, &items, &ResolveOptions::default());

    assert_eq!(a, b);
    assert!(!uncached.config().cache_expressions);
}
