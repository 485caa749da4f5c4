//! Integration tests for the parameter system
//!
//! These tests exercise the building blocks the resolver is made of.

// Tests for expression parsing, evaluation and dependency extraction
mod expression_tests;


// Tests for the dependency graph
mod graph_tests;

// Tests for definitions and the catalog
mod definition_tests;
