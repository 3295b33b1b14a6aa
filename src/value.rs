//! Dynamic values flowing through expressions and between stages.
//!
//! Coercions follow JavaScript rules closely enough that expressions like
//! `$ * 2`, `$ + '!'` or `!$` behave the way users of `filter`/`map` one-liners
//! expect.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Expr;
use crate::interpreter::Scope;

/// Library namespaces reachable as identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `R`: curried, data-last helpers.
    Ramda,
    Math,
    Json,
}

impl Namespace {
    pub fn name(self) -> &'static str {
        match self {
            Namespace::Ramda => "R",
            Namespace::Math => "Math",
            Namespace::Json => "JSON",
        }
    }
}

/// A user-defined arrow function with its captured scope.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Expr>,
    pub scope: Scope,
}

#[derive(Clone)]
pub enum Function {
    /// A library function, possibly partially applied.
    ///
    /// `arity: None` marks a variadic function that runs on every call.
    Native {
        ns: Option<Namespace>,
        name: &'static str,
        arity: Option<usize>,
        bound: Vec<Value>,
    },
    Lambda(Rc<Closure>),
    /// Left-to-right composition built by `R.pipe` / `R.compose`.
    Pipe(Vec<Value>),
}

impl Function {
    pub fn native(ns: Option<Namespace>, name: &'static str, arity: Option<usize>) -> Self {
        Function::Native {
            ns,
            name,
            arity,
            bound: Vec::new(),
        }
    }

    /// Qualified name for messages, e.g. `R.toUpper`.
    pub fn describe(&self) -> String {
        match self {
            Function::Native { ns: Some(ns), name, .. } => format!("{}.{name}", ns.name()),
            Function::Native { ns: None, name, .. } => name.to_string(),
            Function::Lambda(_) => "anonymous".to_string(),
            Function::Pipe(_) => "pipe".to_string(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { bound, .. } => {
                write!(f, "Native({}, {} bound)", self.describe(), bound.len())
            }
            Function::Lambda(closure) => write!(f, "Lambda({})", closure.params.join(", ")),
            Function::Pipe(fns) => write!(f, "Pipe({})", fns.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Function(Function),
    Namespace(Namespace),
    /// Wrapper produced by `chain(x)`; library calls on it thread the value.
    Chain(Box<Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl PartialEq for Value {
    /// Structural equality; functions never compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Namespace(a), Value::Namespace(b)) => a == b,
            (Value::Chain(a), Value::Chain(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) | Value::Namespace(_) | Value::Chain(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// JavaScript truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric coercion in the manner of JavaScript's `Number(x)`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    /// String form used by `String(x)`, `+` concatenation and text output.
    pub fn render(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
            Value::Function(_) => "[Function]".to_string(),
            Value::Namespace(ns) => format!("[Namespace {}]", ns.name()),
            Value::Chain(inner) => format!("[Chain {}]", inner.render()),
        }
    }

    /// Convert to JSON. Values JSON cannot express become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Chain(inner) => inner.to_json(),
            Value::Undefined
            | Value::Null
            | Value::Function(_)
            | Value::Namespace(_) => serde_json::Value::Null,
        }
    }

    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        self == other
    }

    /// `==`, with the coercions that matter for line data: `null == undefined`,
    /// and numbers compare against numeric strings and booleans.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nil() && b.is_nil() => true,
            (a, b) if a.is_nil() || b.is_nil() => false,
            (Value::Number(_), Value::String(_) | Value::Bool(_))
            | (Value::String(_) | Value::Bool(_), Value::Number(_))
            | (Value::Bool(_), Value::String(_))
            | (Value::String(_), Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }
}

/// Parse a string the way `Number("...")` does: surrounding whitespace is
/// ignored, the empty string is 0, `0x`/`0o`/`0b` prefixes select a radix
/// (unsigned only), anything unparsable is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(radix) = radix_prefix(trimmed) {
        return parse_radix(&trimmed[2..], radix);
    }
    let numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !numeric {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn radix_prefix(s: &str) -> Option<u32> {
    match s.get(..2)? {
        "0x" | "0X" => Some(16),
        "0o" | "0O" => Some(8),
        "0b" | "0B" => Some(2),
        _ => None,
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Format a number the way JavaScript prints it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // JS writes the exponent sign: 1e+21, 1.5e-7
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}
