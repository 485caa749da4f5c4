//! Expression parsing and evaluation for parameter definitions
//!
//! Parameter defaults, bounds and visibility are written as small expressions over
//! other parameters, e.g. `"line_width * 2"` or
//! `"support_enable && adhesion_type !== 'none'"`. This module parses those strings
//! into an [`Expression`] tree and interprets the tree against an
//! [`EvaluationContext`], which observes every variable read.

use crate::parameters::value::Value;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{anychar, char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{opt, recognize},
    error::ErrorKind,
    multi::fold_many0,
    sequence::{pair, preceded},
    IResult, Parser,
};
use std::collections::HashMap;
use thiserror::Error;

/// Names that are helpers or namespaces rather than parameter keys.
///
/// Identifiers in this list never become dependency edges.
pub const RESERVED_NAMES: &[&str] = &[
    "Math",
    "round",
    "max",
    "min",
    "ceil",
    "Number",
    "parseInt",
    "resolveOrValue",
    "extruderValue",
    "extruderValues",
    "defaultExtruderPosition",
];

/// Check whether an identifier is a reserved helper or namespace name
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("{name} is not a function")]
    NotCallable { name: String },

    #[error("Cannot read property '{property}' of undefined")]
    PropertyOfUndefined { property: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

/// Failure to evaluate one parameter's expression
///
/// The resolver catches these per parameter; they carry enough context to log the
/// offending key and expression.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot evaluate expression '{expression}' for parameter '{key}': {source}")]
pub struct EvaluationError {
    /// Parameter whose expression failed
    pub key: String,

    /// The expression text
    pub expression: String,

    /// Underlying parse or runtime failure
    #[source]
    pub source: ExpressionError,
}

/// Result type for expression evaluation
type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal number, string, boolean, `null` or `undefined`
    Literal(Value),

    /// Variable reference
    Identifier(String),

    /// Array literal
    Array(Vec<Expression>),

    /// Property access (`object.property`)
    Member(Box<Expression>, String),

    /// Index access (`object[index]`)
    Index(Box<Expression>, Box<Expression>),

    /// Function call
    Call(Box<Expression>, Vec<Expression>),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Conditional (`test ? then : else`)
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,

    /// Numeric conversion (+)
    Plus,

    /// Logical not (!)
    Not,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition or string concatenation (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Remainder (%)
    Rem,

    /// Power (**)
    Pow,

    /// Less than (<)
    Lt,

    /// Less than or equal (<=)
    Le,

    /// Greater than (>)
    Gt,

    /// Greater than or equal (>=)
    Ge,

    /// Loose equality (==)
    Eq,

    /// Loose inequality (!=)
    Ne,

    /// Strict equality (===)
    StrictEq,

    /// Strict inequality (!==)
    StrictNe,

    /// Short-circuit and (&&)
    And,

    /// Short-circuit or (||)
    Or,
}

/// Helper functions and namespaces available to every expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    ResolveOrValue,
    ExtruderValue,
    ExtruderValues,
    DefaultExtruderPosition,
    Round,
    Max,
    Min,
    Ceil,
    ParseInt,
    /// The `Math` namespace
    Math,
    /// The `Number` namespace
    Number,
    MathAbs,
    MathCeil,
    MathFloor,
    MathRound,
    MathMax,
    MathMin,
    MathPow,
    MathSqrt,
    MathSin,
    MathCos,
    MathTan,
    MathLog,
    MathExp,
    NumberIsNaN,
    NumberIsFinite,
}

impl Builtin {
    /// Every top-level helper, in the order they are installed into a context
    pub const TOP_LEVEL: [Builtin; 11] = [
        Builtin::Math,
        Builtin::Round,
        Builtin::Max,
        Builtin::Min,
        Builtin::Ceil,
        Builtin::Number,
        Builtin::ParseInt,
        Builtin::ResolveOrValue,
        Builtin::ExtruderValue,
        Builtin::ExtruderValues,
        Builtin::DefaultExtruderPosition,
    ];

    /// Look up a top-level helper by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::TOP_LEVEL.iter().copied().find(|b| b.name() == name)
    }

    /// Name as written in expressions
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::ResolveOrValue => "resolveOrValue",
            Builtin::ExtruderValue => "extruderValue",
            Builtin::ExtruderValues => "extruderValues",
            Builtin::DefaultExtruderPosition => "defaultExtruderPosition",
            Builtin::Round => "round",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Ceil => "ceil",
            Builtin::ParseInt => "parseInt",
            Builtin::Math => "Math",
            Builtin::Number => "Number",
            Builtin::MathAbs => "abs",
            Builtin::MathCeil => "ceil",
            Builtin::MathFloor => "floor",
            Builtin::MathRound => "round",
            Builtin::MathMax => "max",
            Builtin::MathMin => "min",
            Builtin::MathPow => "pow",
            Builtin::MathSqrt => "sqrt",
            Builtin::MathSin => "sin",
            Builtin::MathCos => "cos",
            Builtin::MathTan => "tan",
            Builtin::MathLog => "log",
            Builtin::MathExp => "exp",
            Builtin::NumberIsNaN => "isNaN",
            Builtin::NumberIsFinite => "isFinite",
        }
    }

    /// Property lookup on a namespace (`Math.max`, `Number.EPSILON`)
    fn member(&self, property: &str) -> Value {
        let found = match (self, property) {
            (Builtin::Math, "abs") => Builtin::MathAbs,
            (Builtin::Math, "ceil") => Builtin::MathCeil,
            (Builtin::Math, "floor") => Builtin::MathFloor,
            (Builtin::Math, "round") => Builtin::MathRound,
            (Builtin::Math, "max") => Builtin::MathMax,
            (Builtin::Math, "min") => Builtin::MathMin,
            (Builtin::Math, "pow") => Builtin::MathPow,
            (Builtin::Math, "sqrt") => Builtin::MathSqrt,
            (Builtin::Math, "sin") => Builtin::MathSin,
            (Builtin::Math, "cos") => Builtin::MathCos,
            (Builtin::Math, "tan") => Builtin::MathTan,
            (Builtin::Math, "log") => Builtin::MathLog,
            (Builtin::Math, "exp") => Builtin::MathExp,
            (Builtin::Math, "PI") => return Value::Number(std::f64::consts::PI),
            (Builtin::Math, "E") => return Value::Number(std::f64::consts::E),
            (Builtin::Number, "isNaN") => Builtin::NumberIsNaN,
            (Builtin::Number, "isFinite") => Builtin::NumberIsFinite,
            (Builtin::Number, "parseInt") => Builtin::ParseInt,
            (Builtin::Number, "MAX_VALUE") => return Value::Number(f64::MAX),
            (Builtin::Number, "MIN_VALUE") => return Value::Number(f64::from_bits(1)),
            (Builtin::Number, "EPSILON") => return Value::Number(f64::EPSILON),
            (Builtin::Number, "POSITIVE_INFINITY") => return Value::Number(f64::INFINITY),
            (Builtin::Number, "NEGATIVE_INFINITY") => return Value::Number(f64::NEG_INFINITY),
            _ => return Value::Undefined,
        };
        Value::Builtin(found)
    }

    /// Invoke the helper with already-evaluated arguments
    fn call<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        args: &[Value],
    ) -> ExprResult<Value> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
        let num = |i: usize| arg(i).to_number();

        let result = match self {
            Builtin::ResolveOrValue => {
                let key = arg(0).to_display_string();
                let value = context.read_variable(&key);
                if value.is_undefined() {
                    Value::Str(key)
                } else {
                    value
                }
            }
            Builtin::ExtruderValue => {
                let key = arg(1).to_display_string();
                context.read_variable(&key)
            }
            Builtin::ExtruderValues => {
                let key = arg(0).to_display_string();
                Value::List(vec![context.read_variable(&key)])
            }
            Builtin::DefaultExtruderPosition => Value::Number(0.0),
            Builtin::Round => {
                let precision = if args.len() > 1 { num(1) } else { 0.0 };
                let factor = 10f64.powf(precision);
                Value::Number(round_half_up(num(0) * factor) / factor)
            }
            Builtin::Max | Builtin::MathMax => Value::Number(
                flatten_numbers(args)
                    .into_iter()
                    .fold(f64::NEG_INFINITY, |acc, n| {
                        if acc.is_nan() || n.is_nan() {
                            f64::NAN
                        } else {
                            acc.max(n)
                        }
                    }),
            ),
            Builtin::Min | Builtin::MathMin => Value::Number(
                flatten_numbers(args).into_iter().fold(f64::INFINITY, |acc, n| {
                    if acc.is_nan() || n.is_nan() {
                        f64::NAN
                    } else {
                        acc.min(n)
                    }
                }),
            ),
            Builtin::Ceil | Builtin::MathCeil => Value::Number(num(0).ceil()),
            Builtin::ParseInt => {
                let radix = if args.len() > 1 { num(1) } else { 0.0 };
                Value::Number(parse_int(&arg(0).to_display_string(), radix))
            }
            Builtin::MathAbs => Value::Number(num(0).abs()),
            Builtin::MathFloor => Value::Number(num(0).floor()),
            Builtin::MathRound => Value::Number(round_half_up(num(0))),
            Builtin::MathPow => Value::Number(num(0).powf(num(1))),
            Builtin::MathSqrt => Value::Number(num(0).sqrt()),
            Builtin::MathSin => Value::Number(num(0).sin()),
            Builtin::MathCos => Value::Number(num(0).cos()),
            Builtin::MathTan => Value::Number(num(0).tan()),
            Builtin::MathLog => Value::Number(num(0).ln()),
            Builtin::MathExp => Value::Number(num(0).exp()),
            Builtin::NumberIsNaN => Value::Bool(matches!(arg(0), Value::Number(n) if n.is_nan())),
            Builtin::NumberIsFinite => {
                Value::Bool(matches!(arg(0), Value::Number(n) if n.is_finite()))
            }
            Builtin::Math | Builtin::Number => {
                return Err(ExpressionError::NotCallable {
                    name: self.name().to_string(),
                })
            }
        };

        Ok(result)
    }
}

/// Round half towards positive infinity
fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

/// Numeric arguments with list arguments spread in place
fn flatten_numbers(args: &[Value]) -> Vec<f64> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::List(items) => numbers.extend(items.iter().map(Value::to_number)),
            other => numbers.push(other.to_number()),
        }
    }
    numbers
}

/// Parse the leading integer of a string, NaN if there is none
fn parse_int(text: &str, radix: f64) -> f64 {
    let mut rest = text.trim_start();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut radix = if radix.is_nan() { 0 } else { radix as u32 };
    if radix == 0 || radix == 16 {
        if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = stripped;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut result: Option<f64> = None;
    for c in rest.chars() {
        match c.to_digit(radix) {
            Some(d) => result = Some(result.unwrap_or(0.0) * f64::from(radix) + f64::from(d)),
            None => break,
        }
    }

    result.map(|n| sign * n).unwrap_or(f64::NAN)
}

/// Context for expression evaluation, providing variable values
///
/// Reads go through `read_variable` so implementations can observe which
/// variables an expression actually used.
pub trait EvaluationContext {
    /// Read the value of a variable, `Value::Undefined` when unbound
    fn read_variable(&mut self, name: &str) -> Value;
}

/// Simple implementation of EvaluationContext using a HashMap
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    /// Map of variable names to values
    variables: HashMap<String, Value>,
}

impl SimpleContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Set a variable value
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }
}

impl EvaluationContext for SimpleContext {
    fn read_variable(&mut self, name: &str) -> Value {
        self.variables.get(name).cloned().unwrap_or_default()
    }
}

impl EvaluationContext for HashMap<String, Value> {
    fn read_variable(&mut self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl Expression {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> ExprResult<Self> {
        if input.trim().is_empty() {
            return Err(ExpressionError::ParseError {
                message: "Empty expression".to_string(),
            });
        }

        match conditional(input) {
            Ok((remainder, expr)) => {
                // Make sure the entire input was consumed
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder.trim()),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &mut C) -> ExprResult<Value> {
        match self {
            Self::Literal(value) => Ok(value.clone()),

            Self::Identifier(name) => {
                let value = context.read_variable(name);
                if value.is_undefined() {
                    if let Some(builtin) = Builtin::from_name(name) {
                        return Ok(Value::Builtin(builtin));
                    }
                }
                Ok(value)
            }

            Self::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.evaluate(context)?);
                }
                Ok(Value::List(values))
            }

            Self::Member(object, property) => {
                let target = object.evaluate(context)?;
                member(&target, property)
            }

            Self::Index(object, index) => {
                let target = object.evaluate(context)?;
                let index = index.evaluate(context)?;
                match (&target, &index) {
                    (Value::List(items), _) => {
                        let i = index.to_number();
                        if i.fract() == 0.0 && i >= 0.0 {
                            Ok(items.get(i as usize).cloned().unwrap_or_default())
                        } else {
                            Ok(Value::Undefined)
                        }
                    }
                    (Value::Str(s), _) => {
                        let i = index.to_number();
                        if i.fract() == 0.0 && i >= 0.0 {
                            Ok(s.chars()
                                .nth(i as usize)
                                .map(|c| Value::Str(c.to_string()))
                                .unwrap_or_default())
                        } else {
                            member(&target, &index.to_display_string())
                        }
                    }
                    _ => member(&target, &index.to_display_string()),
                }
            }

            Self::Call(callee, args) => {
                let function = callee.evaluate(context)?;

                // Evaluate all arguments
                let mut evaluated_args = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated_args.push(arg.evaluate(context)?);
                }

                match function {
                    Value::Builtin(builtin) => builtin.call(context, &evaluated_args),
                    Value::Undefined => match callee.as_ref() {
                        Self::Identifier(name) => Err(ExpressionError::UndefinedFunction {
                            name: name.clone(),
                        }),
                        other => Err(ExpressionError::NotCallable {
                            name: other.describe(),
                        }),
                    },
                    _ => Err(ExpressionError::NotCallable {
                        name: callee.describe(),
                    }),
                }
            }

            Self::Unary(op, expr) => {
                let value = expr.evaluate(context)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Number(-value.to_number())),
                    UnaryOp::Plus => Ok(Value::Number(value.to_number())),
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                }
            }

            Self::Binary(BinaryOp::And, left, right) => {
                let lhs = left.evaluate(context)?;
                if lhs.truthy() {
                    right.evaluate(context)
                } else {
                    Ok(lhs)
                }
            }

            Self::Binary(BinaryOp::Or, left, right) => {
                let lhs = left.evaluate(context)?;
                if lhs.truthy() {
                    Ok(lhs)
                } else {
                    right.evaluate(context)
                }
            }

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;
                Ok(apply_binary(*op, &lhs, &rhs))
            }

            Self::Conditional(test, consequent, alternate) => {
                if test.evaluate(context)?.truthy() {
                    consequent.evaluate(context)
                } else {
                    alternate.evaluate(context)
                }
            }
        }
    }

    /// Find all parameter keys the expression reads
    ///
    /// Reserved helper names are skipped. String keys passed to the lookup helpers
    /// (`resolveOrValue('key')`, `extruderValue(0, 'key')`, `extruderValues('key')`)
    /// count as reads.
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Recursively collect all variable names used in the expression
    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Literal(_) => {}

            Self::Identifier(name) => {
                if !is_reserved(name) {
                    vars.push(name.clone());
                }
            }

            Self::Array(items) => {
                for item in items {
                    item.collect_variables(vars);
                }
            }

            Self::Member(object, _) => {
                object.collect_variables(vars);
            }

            Self::Index(object, index) => {
                object.collect_variables(vars);
                index.collect_variables(vars);
            }

            Self::Call(callee, args) => {
                if let Self::Identifier(name) = callee.as_ref() {
                    let key_arg = match name.as_str() {
                        "resolveOrValue" | "extruderValues" => args.first(),
                        "extruderValue" => args.get(1),
                        _ => None,
                    };
                    if let Some(Self::Literal(Value::Str(key))) = key_arg {
                        vars.push(key.clone());
                    }
                }

                callee.collect_variables(vars);
                for arg in args {
                    arg.collect_variables(vars);
                }
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Conditional(test, consequent, alternate) => {
                test.collect_variables(vars);
                consequent.collect_variables(vars);
                alternate.collect_variables(vars);
            }
        }
    }

    /// Short description for error messages
    fn describe(&self) -> String {
        match self {
            Self::Identifier(name) => name.clone(),
            Self::Member(object, property) => format!("{}.{}", object.describe(), property),
            Self::Literal(value) => value.to_string(),
            _ => "expression".to_string(),
        }
    }
}

/// Property access on an evaluated value
fn member(target: &Value, property: &str) -> ExprResult<Value> {
    match target {
        Value::Undefined | Value::Null => Err(ExpressionError::PropertyOfUndefined {
            property: property.to_string(),
        }),
        Value::Builtin(builtin) => Ok(builtin.member(property)),
        Value::Str(s) if property == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::List(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
        _ => Ok(Value::Undefined),
    }
}

/// Apply a non-short-circuit binary operator
fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    use std::cmp::Ordering;

    let compare = |accept: fn(Ordering) -> bool| {
        Value::Bool(lhs.compare(rhs).map(accept).unwrap_or(false))
    };

    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::Str(_) | Value::List(_));
            if stringy(lhs) || stringy(rhs) {
                Value::Str(format!("{}{}", lhs, rhs))
            } else {
                Value::Number(lhs.to_number() + rhs.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Pow => Value::Number(lhs.to_number().powf(rhs.to_number())),
        BinaryOp::Lt => compare(|o| o == Ordering::Less),
        BinaryOp::Le => compare(|o| o != Ordering::Greater),
        BinaryOp::Gt => compare(|o| o == Ordering::Greater),
        BinaryOp::Ge => compare(|o| o != Ordering::Less),
        BinaryOp::Eq => Value::Bool(lhs.loose_eq(rhs)),
        BinaryOp::Ne => Value::Bool(!lhs.loose_eq(rhs)),
        BinaryOp::StrictEq => Value::Bool(lhs.strict_eq(rhs)),
        BinaryOp::StrictNe => Value::Bool(!lhs.strict_eq(rhs)),
        // Short-circuit operators are handled by `evaluate`
        BinaryOp::And | BinaryOp::Or => Value::Undefined,
    }
}

// Parser functions using nom

type PResult<'a, T> = IResult<&'a str, T>;

/// Skip leading whitespace
fn ws(input: &str) -> PResult<'_, &str> {
    multispace0(input)
}

/// Match a fixed symbol after optional whitespace
fn symbol<'a>(input: &'a str, sym: &'static str) -> PResult<'a, &'a str> {
    let (input, _) = ws(input)?;
    tag(sym).parse(input)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    ))
    .parse(input)
}

/// Parse a number
///
/// Only plain decimal literals are accepted so identifiers such as `infill_density`
/// are never mistaken for `inf`.
fn number(input: &str) -> PResult<'_, Expression> {
    let (rest, text) = recognize(pair(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(input)?;

    let value = text
        .parse::<f64>()
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, ErrorKind::Float)))?;
    Ok((rest, Expression::Literal(Value::Number(value))))
}

/// Parse a single- or double-quoted string with backslash escapes
fn string_literal(input: &str) -> PResult<'_, Expression> {
    let (input, quote) = one_of("'\"").parse(input)?;
    let (input, body) = fold_many0(
        alt((
            satisfy(move |c| c != quote && c != '\\'),
            preceded(char('\\'), escaped_char),
        )),
        String::new,
        |mut body, c| {
            body.push(c);
            body
        },
    )
    .parse(input)?;
    let (input, _) = char(quote).parse(input)?;
    Ok((input, Expression::Literal(Value::Str(body))))
}

/// Character after a backslash; unknown escapes stand for themselves
fn escaped_char(input: &str) -> PResult<'_, char> {
    let (input, c) = anychar(input)?;
    let c = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    };
    Ok((input, c))
}

/// Parse a comma-separated list of expressions up to a closing symbol
fn expression_list<'a>(input: &'a str, close: &'static str) -> PResult<'a, Vec<Expression>> {
    // Handle empty list case
    if let Ok((input, _)) = symbol(input, close) {
        return Ok((input, Vec::new()));
    }

    let (mut remainder, first) = conditional(input)?;
    let mut items = vec![first];

    while let Ok((after_comma, _)) = symbol(remainder, ",") {
        let (after_expr, item) = conditional(after_comma)?;
        items.push(item);
        remainder = after_expr;
    }

    let (remainder, _) = symbol(remainder, close)?;
    Ok((remainder, items))
}

/// Parse an array literal
fn array_literal(input: &str) -> PResult<'_, Expression> {
    let (input, _) = symbol(input, "[")?;
    let (input, items) = expression_list(input, "]")?;
    Ok((input, Expression::Array(items)))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> PResult<'_, Expression> {
    let (input, _) = symbol(input, "(")?;
    let (input, expr) = conditional(input)?;
    let (input, _) = symbol(input, ")")?;
    Ok((input, expr))
}

/// Parse a primary expression (literal, identifier, array or parenthesized expression)
fn primary(input: &str) -> PResult<'_, Expression> {
    let (input, _) = ws(input)?;

    if let Ok(result) = number(input) {
        return Ok(result);
    }

    if let Ok(result) = string_literal(input) {
        return Ok(result);
    }

    if let Ok(result) = array_literal(input) {
        return Ok(result);
    }

    if let Ok(result) = parens(input) {
        return Ok(result);
    }

    let (input, name) = identifier(input)?;
    let expr = match name {
        "true" => Expression::Literal(Value::Bool(true)),
        "false" => Expression::Literal(Value::Bool(false)),
        "null" => Expression::Literal(Value::Null),
        "undefined" => Expression::Literal(Value::Undefined),
        _ => Expression::Identifier(name.to_string()),
    };
    Ok((input, expr))
}

/// Parse calls, member and index access following a primary expression
fn postfix(input: &str) -> PResult<'_, Expression> {
    let (mut input, mut expr) = primary(input)?;

    loop {
        if let Ok((rest, _)) = symbol(input, "(") {
            let (rest, args) = expression_list(rest, ")")?;
            expr = Expression::Call(Box::new(expr), args);
            input = rest;
        } else if let Ok((rest, _)) = symbol(input, "[") {
            let (rest, index) = conditional(rest)?;
            let (rest, _) = symbol(rest, "]")?;
            expr = Expression::Index(Box::new(expr), Box::new(index));
            input = rest;
        } else if let Ok((rest, _)) = symbol(input, ".") {
            let (rest, _) = ws(rest)?;
            let (rest, property) = identifier(rest)?;
            expr = Expression::Member(Box::new(expr), property.to_string());
            input = rest;
        } else {
            return Ok((input, expr));
        }
    }
}

/// Parse a unary expression (-expr, +expr, !expr)
fn unary(input: &str) -> PResult<'_, Expression> {
    let (input, _) = ws(input)?;

    let prefix: PResult<'_, char> = one_of("-+!").parse(input);
    match prefix {
        Ok((remaining, c)) => {
            let op = match c {
                '-' => UnaryOp::Neg,
                '+' => UnaryOp::Plus,
                _ => UnaryOp::Not,
            };
            let (remaining, operand) = unary(remaining)?;
            Ok((remaining, Expression::Unary(op, Box::new(operand))))
        }
        Err(_) => postfix(input),
    }
}

/// Parse a power expression (expr ** expr), right associative
fn power(input: &str) -> PResult<'_, Expression> {
    let (input, left) = unary(input)?;

    match symbol(input, "**") {
        Ok((after_op, _)) => {
            let (after_right, right) = power(after_op)?;
            Ok((
                after_right,
                Expression::Binary(BinaryOp::Pow, Box::new(left), Box::new(right)),
            ))
        }
        Err(_) => Ok((input, left)),
    }
}

/// Parse a left-associative chain of operators from `table` over `operand`
///
/// Symbols sharing a prefix must be listed longest first.
fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> PResult<'a, Expression>,
    table: &[(&'static str, BinaryOp)],
) -> PResult<'a, Expression> {
    let (mut input, mut left) = operand(input)?;

    'chain: loop {
        for &(sym, op) in table {
            if let Ok((after_op, _)) = symbol(input, sym) {
                let (remaining, right) = operand(after_op)?;
                left = Expression::Binary(op, Box::new(left), Box::new(right));
                input = remaining;
                continue 'chain;
            }
        }
        return Ok((input, left));
    }
}

/// Parse a multiplicative expression (expr * expr, expr / expr, expr % expr)
fn term(input: &str) -> PResult<'_, Expression> {
    left_assoc(
        input,
        power,
        &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
    )
}

/// Parse an additive expression (expr + expr, expr - expr)
fn additive(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, term, &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)])
}

/// Parse a relational expression
fn relational(input: &str) -> PResult<'_, Expression> {
    left_assoc(
        input,
        additive,
        &[
            ("<=", BinaryOp::Le),
            (">=", BinaryOp::Ge),
            ("<", BinaryOp::Lt),
            (">", BinaryOp::Gt),
        ],
    )
}

/// Parse an equality expression
fn equality(input: &str) -> PResult<'_, Expression> {
    left_assoc(
        input,
        relational,
        &[
            ("===", BinaryOp::StrictEq),
            ("!==", BinaryOp::StrictNe),
            ("==", BinaryOp::Eq),
            ("!=", BinaryOp::Ne),
        ],
    )
}

fn logical_and(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, equality, &[("&&", BinaryOp::And)])
}

fn logical_or(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, logical_and, &[("||", BinaryOp::Or)])
}

/// Parse a conditional expression (test ? then : else)
fn conditional(input: &str) -> PResult<'_, Expression> {
    let (input, test) = logical_or(input)?;

    match symbol(input, "?") {
        Ok((after_q, _)) => {
            let (after_then, consequent) = conditional(after_q)?;
            let (after_colon, _) = symbol(after_then, ":")?;
            let (remaining, alternate) = conditional(after_colon)?;
            Ok((
                remaining,
                Expression::Conditional(
                    Box::new(test),
                    Box::new(consequent),
                    Box::new(alternate),
                ),
            ))
        }
        Err(_) => Ok((input, test)),
    }
}
