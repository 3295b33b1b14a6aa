//! Function library bound into every expression.
//!
//! - `R`: curried, data-last list/string helpers in the Ramda style
//!   (`R.split(',')` is a function still waiting for its string).
//! - `Math`, `JSON`, `Number`, `String`, `Boolean`, `parseInt`,
//!   `parseFloat`, `isNaN`: the familiar globals.
//! - `chain(x)`: fluent wrapper; `chain($).split(',').map(R.trim).value()`.
//! - Methods on strings, arrays and numbers (`$.trim()`, `xs.join('-')`).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::error::ExprError;
use crate::interpreter::{call_value, compare, get_index};
use crate::value::{Function, Namespace, Value, format_number};

/// `R` members and their arities.
const RAMDA: &[(&str, usize)] = &[
    ("identity", 1),
    ("not", 1),
    ("add", 2),
    ("subtract", 2),
    ("multiply", 2),
    ("divide", 2),
    ("inc", 1),
    ("dec", 1),
    ("negate", 1),
    ("equals", 2),
    ("gt", 2),
    ("lt", 2),
    ("gte", 2),
    ("lte", 2),
    ("toUpper", 1),
    ("toLower", 1),
    ("trim", 1),
    ("trimStart", 1),
    ("trimEnd", 1),
    ("split", 2),
    ("join", 2),
    ("replace", 3),
    ("test", 2),
    ("match", 2),
    ("startsWith", 2),
    ("endsWith", 2),
    ("includes", 2),
    ("length", 1),
    ("head", 1),
    ("last", 1),
    ("tail", 1),
    ("init", 1),
    ("take", 2),
    ("drop", 2),
    ("reverse", 1),
    ("sum", 1),
    ("mean", 1),
    ("prop", 2),
    ("path", 2),
    ("keys", 1),
    ("values", 1),
    ("isEmpty", 1),
    ("isNil", 1),
    ("map", 2),
    ("filter", 2),
    ("reject", 2),
    ("always", 2),
    ("uniq", 1),
    ("sort", 2),
    ("concat", 2),
    ("nth", 2),
    ("toString", 1),
];

/// Variadic `R` members: they run on every call.
const RAMDA_VARIADIC: &[&str] = &["pipe", "compose"];

const MATH: &[&str] = &[
    "abs", "ceil", "floor", "round", "trunc", "sign", "sqrt", "pow", "log", "min", "max",
];

const JSON_FNS: &[&str] = &["parse", "stringify"];

const GLOBAL_FNS: &[&str] = &[
    "chain",
    "Number",
    "String",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
];

/// Resolve a global identifier.
pub fn global(name: &str) -> Option<Value> {
    match name {
        "R" => Some(Value::Namespace(Namespace::Ramda)),
        "Math" => Some(Value::Namespace(Namespace::Math)),
        "JSON" => Some(Value::Namespace(Namespace::Json)),
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        _ => GLOBAL_FNS
            .iter()
            .find(|g| **g == name)
            .map(|&g| Value::Function(Function::native(None, g, None))),
    }
}

pub fn is_global(name: &str) -> bool {
    global(name).is_some()
}

/// Resolve `ns.name`.
pub fn namespace_member(ns: Namespace, name: &str) -> Option<Value> {
    let function = match ns {
        Namespace::Ramda => RAMDA
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(n, arity)| Function::native(Some(ns), n, Some(arity)))
            .or_else(|| {
                RAMDA_VARIADIC
                    .iter()
                    .find(|n| **n == name)
                    .map(|&n| Function::native(Some(ns), n, None))
            }),
        Namespace::Math => match name {
            "PI" => return Some(Value::Number(std::f64::consts::PI)),
            "E" => return Some(Value::Number(std::f64::consts::E)),
            _ => MATH
                .iter()
                .find(|n| **n == name)
                .map(|&n| Function::native(Some(ns), n, None)),
        },
        Namespace::Json => JSON_FNS
            .iter()
            .find(|n| **n == name)
            .map(|&n| Function::native(Some(ns), n, None)),
    };
    function.map(Value::Function)
}

/// One step of a `chain(x)` pipeline.
pub fn chain_step(inner: Value, name: &str, mut args: Vec<Value>) -> Result<Value, ExprError> {
    if name == "value" {
        return Ok(inner);
    }
    let Some(function) = namespace_member(Namespace::Ramda, name) else {
        return Err(ExprError::type_error(format!(
            "chain has no step '{name}' (use an R function or .value())"
        )));
    };
    args.push(inner);
    Ok(Value::Chain(Box::new(call_value(&function, args)?)))
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    args.get(i).map(Value::to_number).unwrap_or(f64::NAN)
}

fn list(value: &Value, function: &str) -> Result<Vec<Value>, ExprError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        other => Err(ExprError::type_error(format!(
            "{function} expects an array, got {}",
            other.type_name()
        ))),
    }
}

/// Longest string `repeat` and `padStart`/`padEnd` will build, in bytes.
const MAX_STRING_LEN: usize = 1 << 29;

/// Compiled patterns are kept until this many distinct ones have been seen.
const REGEX_CACHE_LIMIT: usize = 64;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

fn regex(pattern: &Value) -> Result<Regex, ExprError> {
    let pattern = pattern.render();
    if let Some(re) = REGEX_CACHE.with(|cache| cache.borrow().get(&pattern).cloned()) {
        return Ok(re);
    }
    let re = Regex::new(&pattern)
        .map_err(|e| ExprError::syntax(format!("invalid regular expression: {e}"), 0))?;
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.len() >= REGEX_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(pattern, re.clone());
    });
    Ok(re)
}

/// Validate a length argument for a string builder, as JS's RangeError would.
fn string_length(n: f64, what: &str) -> Result<usize, ExprError> {
    if !n.is_finite() || n < 0.0 {
        return Err(ExprError::type_error(format!(
            "invalid {what} {}",
            format_number(n)
        )));
    }
    Ok(n as usize)
}

fn too_long(what: &str) -> ExprError {
    ExprError::type_error(format!("{what} exceeds the maximum string length"))
}

/// Dispatch a native function by namespace and name.
pub fn call_native(
    ns: Option<Namespace>,
    name: &str,
    args: Vec<Value>,
) -> Result<Value, ExprError> {
    match ns {
        Some(Namespace::Ramda) => ramda(name, args),
        Some(Namespace::Math) => Ok(math(name, &args)),
        Some(Namespace::Json) => json(name, &args),
        None => global_fn(name, args),
    }
}

fn ramda(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    let a = arg(&args, 0);
    let b = arg(&args, 1);
    let value = match name {
        "identity" => a,
        "not" => Value::Bool(!a.truthy()),
        "add" => Value::Number(a.to_number() + b.to_number()),
        "subtract" => Value::Number(a.to_number() - b.to_number()),
        "multiply" => Value::Number(a.to_number() * b.to_number()),
        "divide" => Value::Number(a.to_number() / b.to_number()),
        "inc" => Value::Number(a.to_number() + 1.0),
        "dec" => Value::Number(a.to_number() - 1.0),
        "negate" => Value::Number(-a.to_number()),
        "equals" => Value::Bool(a.strict_equals(&b)),
        "gt" => Value::Bool(compare(&a, &b) == Some(Ordering::Greater)),
        "lt" => Value::Bool(compare(&a, &b) == Some(Ordering::Less)),
        "gte" => Value::Bool(matches!(
            compare(&a, &b),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        "lte" => Value::Bool(matches!(
            compare(&a, &b),
            Some(Ordering::Less | Ordering::Equal)
        )),
        "toUpper" => Value::String(a.render().to_uppercase()),
        "toLower" => Value::String(a.render().to_lowercase()),
        "trim" => Value::String(a.render().trim().to_string()),
        "trimStart" => Value::String(a.render().trim_start().to_string()),
        "trimEnd" => Value::String(a.render().trim_end().to_string()),
        "split" => split(&b.render(), Some(a.render().as_str())),
        "join" => join(&list(&b, "R.join")?, &a.render()),
        "replace" => Value::String(arg(&args, 2).render().replacen(&a.render(), &b.render(), 1)),
        "test" => Value::Bool(regex(&a)?.is_match(&b.render())),
        "match" => Value::Array(
            regex(&a)?
                .find_iter(&b.render())
                .map(|m| Value::from(m.as_str()))
                .collect(),
        ),
        "startsWith" => Value::Bool(b.render().starts_with(&a.render())),
        "endsWith" => Value::Bool(b.render().ends_with(&a.render())),
        "includes" => includes(&b, &a),
        "length" => match &a {
            Value::String(s) => Value::from(s.chars().count()),
            Value::Array(items) => Value::from(items.len()),
            _ => Value::Number(f64::NAN),
        },
        "head" => nth(&a, 0.0),
        "last" => nth(&a, -1.0),
        "tail" => slice(&a, Some(1.0), None),
        "init" => slice(&a, Some(0.0), Some(-1.0)),
        "take" => slice(&b, Some(0.0), Some(a.to_number().max(0.0))),
        "drop" => slice(&b, Some(a.to_number().max(0.0)), None),
        "reverse" => reverse(&a),
        "sum" => Value::Number(list(&a, "R.sum")?.iter().map(Value::to_number).sum()),
        "mean" => {
            let items = list(&a, "R.mean")?;
            let total: f64 = items.iter().map(Value::to_number).sum();
            Value::Number(total / items.len() as f64)
        }
        "prop" => {
            if b.is_nil() {
                Value::Undefined
            } else {
                get_index(&b, &a)?
            }
        }
        "path" => {
            let mut current = b;
            for key in list(&a, "R.path")? {
                if current.is_nil() {
                    return Ok(Value::Undefined);
                }
                current = get_index(&current, &key)?;
            }
            current
        }
        "keys" => match a {
            Value::Object(fields) => Value::Array(fields.into_keys().map(Value::String).collect()),
            _ => Value::Array(vec![]),
        },
        "values" => match a {
            Value::Object(fields) => Value::Array(fields.into_values().collect()),
            _ => Value::Array(vec![]),
        },
        "isEmpty" => Value::Bool(match &a {
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            _ => false,
        }),
        "isNil" => Value::Bool(a.is_nil()),
        "map" => match b {
            Value::Object(fields) => {
                let mut out = BTreeMap::new();
                for (key, value) in fields {
                    out.insert(key, call_value(&a, vec![value])?);
                }
                Value::Object(out)
            }
            other => Value::Array(
                list(&other, "R.map")?
                    .into_iter()
                    .map(|item| call_value(&a, vec![item]))
                    .collect::<Result<_, _>>()?,
            ),
        },
        "filter" | "reject" => {
            let keep = name == "filter";
            let mut out = Vec::new();
            for item in list(&b, name)? {
                if call_value(&a, vec![item.clone()])?.truthy() == keep {
                    out.push(item);
                }
            }
            Value::Array(out)
        }
        "always" => a,
        "uniq" => {
            let mut out: Vec<Value> = Vec::new();
            for item in list(&a, "R.uniq")? {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            Value::Array(out)
        }
        "sort" => sort_by(list(&b, "R.sort")?, &a)?,
        "concat" => concat(&a, &[b]),
        "nth" => nth(&b, a.to_number()),
        "toString" => Value::String(a.render()),
        "pipe" => Value::Function(Function::Pipe(args)),
        "compose" => Value::Function(Function::Pipe(args.into_iter().rev().collect())),
        other => {
            return Err(ExprError::type_error(format!("R.{other} is not a function")));
        }
    };
    Ok(value)
}

fn math(name: &str, args: &[Value]) -> Value {
    let x = num_arg(args, 0);
    let n = match name {
        "abs" => x.abs(),
        "ceil" => x.ceil(),
        "floor" => x.floor(),
        "round" => (x + 0.5).floor(),
        "trunc" => x.trunc(),
        "sign" => {
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => x.sqrt(),
        "pow" => x.powf(num_arg(args, 1)),
        "log" => x.ln(),
        "min" => args.iter().map(Value::to_number).fold(f64::INFINITY, |acc, v| {
            if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.min(v) }
        }),
        "max" => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |acc, v| {
            if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.max(v) }
        }),
        _ => f64::NAN,
    };
    Value::Number(n)
}

fn json(name: &str, args: &[Value]) -> Result<Value, ExprError> {
    let a = arg(args, 0);
    match name {
        "parse" => serde_json::from_str::<serde_json::Value>(&a.render())
            .map(Value::from_json)
            .map_err(|e| ExprError::type_error(format!("JSON.parse: {e}"))),
        "stringify" => Ok(match a {
            Value::Undefined | Value::Function(_) => Value::Undefined,
            other => Value::String(other.to_json().to_string()),
        }),
        other => Err(ExprError::type_error(format!("JSON.{other} is not a function"))),
    }
}

fn global_fn(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    let a = arg(&args, 0);
    Ok(match name {
        "chain" => Value::Chain(Box::new(a)),
        "Number" => Value::Number(if args.is_empty() { 0.0 } else { a.to_number() }),
        "String" => Value::String(if args.is_empty() {
            String::new()
        } else {
            a.render()
        }),
        "Boolean" => Value::Bool(a.truthy()),
        "parseInt" => {
            let radix = match args.get(1) {
                Some(r) if r.to_number() >= 2.0 && r.to_number() <= 36.0 => r.to_number() as u32,
                _ => 10,
            };
            Value::Number(parse_int(&a.render(), radix))
        }
        "parseFloat" => Value::Number(parse_float(&a.render())),
        "isNaN" => Value::Bool(a.to_number().is_nan()),
        other => return Err(ExprError::type_error(format!("{other} is not a function"))),
    })
}

/// Longest leading integer in `radix`, like `parseInt`.
fn parse_int(s: &str, radix: u32) -> f64 {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut n = 0.0;
    for c in digits.chars() {
        n = n * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    sign * n
}

/// Longest leading decimal number, like `parseFloat`.
fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut best = f64::NAN;
    for (i, c) in s.char_indices() {
        if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
            break;
        }
        end = i + c.len_utf8();
        if let Ok(n) = s[..end].parse::<f64>() {
            best = n;
        }
    }
    if end == 0 && s.starts_with("Infinity") {
        return f64::INFINITY;
    }
    best
}

fn split(s: &str, separator: Option<&str>) -> Value {
    match separator {
        None => Value::Array(vec![Value::from(s)]),
        Some("") => Value::Array(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Some(sep) => Value::Array(s.split(sep).map(Value::from).collect()),
    }
}

fn join(items: &[Value], separator: &str) -> Value {
    let parts: Vec<String> = items
        .iter()
        .map(|v| if v.is_nil() { String::new() } else { v.render() })
        .collect();
    Value::String(parts.join(separator))
}

fn includes(haystack: &Value, needle: &Value) -> Value {
    Value::Bool(match haystack {
        Value::String(s) => s.contains(needle.render().as_str()),
        Value::Array(items) => items.contains(needle),
        _ => false,
    })
}

/// Resolve JavaScript-style relative `start`/`end` against `len`.
fn relative_range(len: usize, start: Option<f64>, end: Option<f64>) -> (usize, usize) {
    let resolve = |n: f64| -> usize {
        if n.is_nan() {
            0
        } else if n < 0.0 {
            (len as f64 + n.trunc()).max(0.0) as usize
        } else {
            (n.trunc() as usize).min(len)
        }
    };
    let from = start.map(resolve).unwrap_or(0);
    let to = end.map(resolve).unwrap_or(len);
    (from, to.max(from))
}

fn slice(value: &Value, start: Option<f64>, end: Option<f64>) -> Value {
    match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = relative_range(chars.len(), start, end);
            Value::String(chars[from..to].iter().collect())
        }
        Value::Array(items) => {
            let (from, to) = relative_range(items.len(), start, end);
            Value::Array(items[from..to].to_vec())
        }
        _ => Value::Undefined,
    }
}

/// Element at `index`; negative counts from the end. Empty strings give `""`.
fn nth(value: &Value, index: f64) -> Value {
    let resolve = |len: usize| -> Option<usize> {
        let i = if index < 0.0 { len as f64 + index } else { index };
        if i >= 0.0 && (i as usize) < len {
            Some(i as usize)
        } else {
            None
        }
    };
    match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            resolve(chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .unwrap_or_else(|| Value::String(String::new()))
        }
        Value::Array(items) => resolve(items.len())
            .map(|i| items[i].clone())
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn reverse(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.chars().rev().collect()),
        Value::Array(items) => Value::Array(items.iter().rev().cloned().collect()),
        other => other.clone(),
    }
}

fn concat(base: &Value, rest: &[Value]) -> Value {
    match base {
        Value::Array(items) => {
            let mut out = items.clone();
            for value in rest {
                match value {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::Array(out)
        }
        other => {
            let mut out = other.render();
            for value in rest {
                out.push_str(&value.render());
            }
            Value::String(out)
        }
    }
}

/// Stable sort with a user comparator returning a number (negative = less).
fn sort_by(mut items: Vec<Value>, comparator: &Value) -> Result<Value, ExprError> {
    let mut failure = None;
    items.sort_by(|x, y| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match call_value(comparator, vec![x.clone(), y.clone()]) {
            Ok(v) => v.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal),
            Err(e) => {
                failure = Some(e);
                Ordering::Equal
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(Value::Array(items)),
    }
}

/// Built-in methods on strings, arrays and numbers.
pub fn call_method(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    let a = arg(&args, 0);
    let opt_num = |i: usize| args.get(i).filter(|v| !matches!(v, Value::Undefined)).map(Value::to_number);

    let value = match (&receiver, name) {
        (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
        (Value::String(s), "trim") => Value::String(s.trim().to_string()),
        (Value::String(s), "trimStart") => Value::String(s.trim_start().to_string()),
        (Value::String(s), "trimEnd") => Value::String(s.trim_end().to_string()),
        (Value::String(s), "split") => {
            let sep = if a.is_nil() { None } else { Some(a.render()) };
            split(s, sep.as_deref())
        }
        (Value::String(s), "startsWith") => Value::Bool(s.starts_with(&a.render())),
        (Value::String(s), "endsWith") => Value::Bool(s.ends_with(&a.render())),
        (Value::String(s), "indexOf") => Value::Number(
            s.find(&a.render())
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0),
        ),
        (Value::String(_), "slice") => slice(&receiver, opt_num(0), opt_num(1)),
        (Value::String(s), "substring") => {
            let len = s.chars().count() as f64;
            let clamp = |n: f64| if n.is_nan() { 0.0 } else { n.clamp(0.0, len) };
            let start = clamp(opt_num(0).unwrap_or(0.0));
            let end = clamp(opt_num(1).unwrap_or(len));
            slice(&receiver, Some(start.min(end)), Some(start.max(end)))
        }
        (Value::String(s), "replace") => Value::String(s.replacen(&a.render(), &arg(&args, 1).render(), 1)),
        (Value::String(s), "replaceAll") => Value::String(s.replace(&a.render(), &arg(&args, 1).render())),
        (Value::String(s), "repeat") => {
            let count = a.to_number();
            let count = if count.is_nan() { 0 } else { string_length(count, "repeat count")? };
            match s.len().checked_mul(count) {
                Some(total) if total <= MAX_STRING_LEN => Value::String(s.repeat(count)),
                _ => return Err(too_long("repeat count")),
            }
        }
        (Value::String(_), "charAt") => {
            let index = opt_num(0).unwrap_or(0.0);
            if index < 0.0 {
                Value::String(String::new())
            } else {
                nth(&receiver, index)
            }
        }
        (Value::String(s), "padStart" | "padEnd") => {
            let width = a.to_number();
            let width = if width.is_nan() { 0 } else { string_length(width.max(0.0), "string length")? };
            if width > MAX_STRING_LEN {
                return Err(too_long(name));
            }
            let fill = match args.get(1) {
                Some(f) if !f.is_nil() => f.render(),
                _ => " ".to_string(),
            };
            let len = s.chars().count();
            if width <= len || fill.is_empty() {
                Value::String(s.clone())
            } else {
                let padding: String = fill.chars().cycle().take(width - len).collect();
                if name == "padStart" {
                    Value::String(format!("{padding}{s}"))
                } else {
                    Value::String(format!("{s}{padding}"))
                }
            }
        }
        (Value::String(_) | Value::Array(_), "includes") => includes(&receiver, &a),
        (Value::String(_) | Value::Array(_), "at") => nth(&receiver, a.to_number()),
        (Value::String(_) | Value::Array(_), "concat") => concat(&receiver, &args),
        (Value::Array(items), "join") => {
            let sep = if a.is_nil() { ",".to_string() } else { a.render() };
            join(items, &sep)
        }
        (Value::Array(items), "indexOf") => Value::Number(
            items
                .iter()
                .position(|v| v.strict_equals(&a))
                .map(|i| i as f64)
                .unwrap_or(-1.0),
        ),
        (Value::Array(_), "slice") => slice(&receiver, opt_num(0), opt_num(1)),
        (Value::Array(_), "reverse") => reverse(&receiver),
        (Value::Array(items), "map") => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| call_value(&a, vec![item.clone(), Value::from(i)]))
                .collect::<Result<_, _>>()?,
        ),
        (Value::Array(items), "filter") => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if call_value(&a, vec![item.clone(), Value::from(i)])?.truthy() {
                    out.push(item.clone());
                }
            }
            Value::Array(out)
        }
        (Value::Array(items), "find") => {
            let mut found = Value::Undefined;
            for (i, item) in items.iter().enumerate() {
                if call_value(&a, vec![item.clone(), Value::from(i)])?.truthy() {
                    found = item.clone();
                    break;
                }
            }
            found
        }
        (Value::Array(items), "some" | "every") => {
            let want = name == "some";
            let mut result = !want;
            for (i, item) in items.iter().enumerate() {
                if call_value(&a, vec![item.clone(), Value::from(i)])?.truthy() == want {
                    result = want;
                    break;
                }
            }
            Value::Bool(result)
        }
        (Value::Array(items), "reduce") => {
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(ExprError::type_error(
                            "reduce of empty array with no initial value",
                        ));
                    }
                },
            };
            for (i, item) in iter {
                acc = call_value(&a, vec![acc, item.clone(), Value::from(i)])?;
            }
            acc
        }
        (Value::Number(n), "toFixed") => {
            let digits = a.to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
            Value::String(format!("{n:.digits$}"))
        }
        (Value::Number(n), "toString") => Value::String(format_number(*n)),
        (_, "toString") => Value::String(receiver.render()),
        _ => {
            return Err(ExprError::type_error(format!(
                "{}.{name} is not a function",
                receiver.type_name()
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Scope, evaluate};
    use crate::parser::parse_expression;

    fn eval(source: &str, line: &str) -> Value {
        try_eval(source, line).unwrap()
    }

    fn try_eval(source: &str, line: &str) -> Result<Value, ExprError> {
        let expr = parse_expression(source)?;
        let scope = Scope::default().with([("$".to_string(), Value::from(line))]);
        evaluate(&expr, &scope)
    }

    fn strings(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_ramda_string_helpers() {
        assert_eq!(eval("R.toUpper($)", "abc"), Value::from("ABC"));
        assert_eq!(eval("R.trim($)", "  x "), Value::from("x"));
        assert_eq!(eval("R.split(',', $)", "a,b"), strings(&["a", "b"]));
        assert_eq!(eval("R.join('-', R.split(',', $))", "a,b"), Value::from("a-b"));
        assert_eq!(eval("R.replace('o', '0', $)", "foo"), Value::from("f0o"));
        assert_eq!(eval("R.startsWith('ab', $)", "abc"), Value::Bool(true));
    }

    #[test]
    fn test_currying() {
        assert_eq!(eval("R.split(',')($)", "x,y"), strings(&["x", "y"]));
        assert_eq!(eval("R.add(1)(2)", ""), Value::from(3.0));
        assert_eq!(eval("R.replace('a')('b')($)", "aa"), Value::from("ba"));
    }

    #[test]
    fn test_ramda_list_helpers() {
        assert_eq!(eval("R.head(R.split(' ', $))", "a b c"), Value::from("a"));
        assert_eq!(eval("R.last(R.split(' ', $))", "a b c"), Value::from("c"));
        assert_eq!(eval("R.take(2, $)", "abc"), Value::from("ab"));
        assert_eq!(eval("R.drop(1, [1, 2, 3])", ""), Value::Array(vec![2.0.into(), 3.0.into()]));
        assert_eq!(eval("R.sum(R.split(',', $))", "1,2,3"), Value::from(6.0));
        assert_eq!(eval("R.uniq([1, 1, 2])", ""), Value::Array(vec![1.0.into(), 2.0.into()]));
        assert_eq!(eval("R.reverse($)", "abc"), Value::from("cba"));
        assert_eq!(eval("R.nth(-1, [1, 2])", ""), Value::from(2.0));
        assert_eq!(eval("R.head([])", ""), Value::Undefined);
    }

    #[test]
    fn test_ramda_higher_order() {
        assert_eq!(
            eval("R.map(R.toUpper, R.split('', $))", "ab"),
            strings(&["A", "B"])
        );
        assert_eq!(
            eval("R.filter(x => x > 1, [1, 2, 3])", ""),
            Value::Array(vec![2.0.into(), 3.0.into()])
        );
        assert_eq!(
            eval("R.reject(R.isEmpty, R.split(',', $))", "a,,b"),
            strings(&["a", "b"])
        );
        assert_eq!(eval("R.pipe(R.trim, R.toUpper)($)", " hi "), Value::from("HI"));
        assert_eq!(eval("R.compose(R.length, R.trim)($)", " hi "), Value::from(2.0));
        assert_eq!(
            eval("R.sort((a, b) => a - b, [3, 1, 2])", ""),
            Value::Array(vec![1.0.into(), 2.0.into(), 3.0.into()])
        );
    }

    #[test]
    fn test_ramda_objects() {
        assert_eq!(eval("R.prop('a', {a: 1})", ""), Value::from(1.0));
        assert_eq!(eval("R.path(['a', 'b'], {a: {b: 2}})", ""), Value::from(2.0));
        assert_eq!(eval("R.path(['x', 'y'], {})", ""), Value::Undefined);
        assert_eq!(eval("R.keys({b: 1, a: 2})", ""), strings(&["a", "b"]));
    }

    #[test]
    fn test_regex_helpers() {
        assert_eq!(eval("R.test('^\\\\d+$', $)", "123"), Value::Bool(true));
        assert_eq!(eval("R.match('[0-9]+', $)", "a1b22"), strings(&["1", "22"]));
        assert!(matches!(
            try_eval("R.test('(', $)", "x"),
            Err(ExprError::Syntax { .. })
        ));
    }

    #[test]
    fn test_regex_is_compiled_once_per_pattern() {
        REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
        eval("R.test('a+', $)", "aaa");
        eval("R.match('a+', $)", "bab");
        eval("R.test('b', $)", "b");
        assert_eq!(REGEX_CACHE.with(|cache| cache.borrow().len()), 2);
        // a bad pattern is never cached
        assert!(try_eval("R.test('[', $)", "x").is_err());
        assert_eq!(REGEX_CACHE.with(|cache| cache.borrow().len()), 2);
    }

    #[test]
    fn test_chain() {
        assert_eq!(
            eval("chain($).split(',').map(R.trim).join('|').value()", "a , b"),
            Value::from("a|b")
        );
        assert!(matches!(
            try_eval("chain($).nope().value()", "x"),
            Err(ExprError::Type(_))
        ));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval("$.toUpperCase()", "ab"), Value::from("AB"));
        assert_eq!(eval("$.split(':')[1]", "k:v"), Value::from("v"));
        assert_eq!(eval("$.slice(-2)", "hello"), Value::from("lo"));
        assert_eq!(eval("$.substring(3, 1)", "hello"), Value::from("el"));
        assert_eq!(eval("$.indexOf('l')", "hello"), Value::from(2.0));
        assert_eq!(eval("$.padStart(5, '0')", "42"), Value::from("00042"));
        assert_eq!(eval("$.replaceAll('l', 'L')", "hello"), Value::from("heLLo"));
        assert_eq!(eval("$.includes('ell')", "hello"), Value::Bool(true));
        assert_eq!(eval("$.charAt(1)", "hello"), Value::from("e"));
    }

    #[test]
    fn test_string_builders_reject_huge_lengths() {
        assert_eq!(eval("$.repeat(3)", "ab"), Value::from("ababab"));
        assert_eq!(eval("$.repeat(0)", "ab"), Value::from(""));
        assert_eq!(eval("$.repeat(NaN)", "ab"), Value::from(""));
        assert_eq!(eval("$.padEnd(NaN)", "ab"), Value::from("ab"));
        for source in [
            "$.repeat(1/0)",
            "$.repeat(1e19)",
            "$.repeat(-1)",
            "$.padStart(1e12)",
            "$.padEnd(Infinity, '-')",
        ] {
            assert!(
                matches!(try_eval(source, "x"), Err(ExprError::Type(_))),
                "{source}"
            );
        }
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(eval("[1, 2, 3].map((x, i) => x * i)", ""), Value::Array(vec![0.0.into(), 2.0.into(), 6.0.into()]));
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b)", ""), Value::from(6.0));
        assert_eq!(eval("[1, 2, 3].reduce((a, b) => a + b, 10)", ""), Value::from(16.0));
        assert_eq!(eval("['a', null, 'b'].join()", ""), Value::from("a,,b"));
        assert_eq!(eval("[1, 2].some(x => x > 1)", ""), Value::Bool(true));
        assert_eq!(eval("[1, 2].every(x => x > 1)", ""), Value::Bool(false));
        assert_eq!(eval("[1, 2].find(x => x > 1)", ""), Value::from(2.0));
        assert!(matches!(
            try_eval("[].reduce((a, b) => a + b)", ""),
            Err(ExprError::Type(_))
        ));
    }

    #[test]
    fn test_number_methods_and_globals() {
        assert_eq!(eval("(1 / 3).toFixed(2)", ""), Value::from("0.33"));
        assert_eq!(eval("Number($) + 1", "41"), Value::from(42.0));
        assert_eq!(eval("parseInt($)", "12px"), Value::from(12.0));
        assert_eq!(eval("parseInt('ff', 16)", ""), Value::from(255.0));
        assert_eq!(eval("parseFloat($)", "3.5kg"), Value::from(3.5));
        assert_eq!(eval("isNaN($)", "abc"), Value::Bool(true));
        assert_eq!(eval("Math.max(1, $, 3)", "7"), Value::from(7.0));
        assert_eq!(eval("Math.round(2.5)", ""), Value::from(3.0));
        assert_eq!(eval("String(12) + Boolean('')", ""), Value::from("12false"));
    }

    #[test]
    fn test_json_helpers() {
        assert_eq!(eval("JSON.parse($).name", r#"{"name":"x"}"#), Value::from("x"));
        assert_eq!(eval("JSON.stringify({a: [1]})", ""), Value::from(r#"{"a":[1]}"#));
        assert!(matches!(try_eval("JSON.parse($)", "{"), Err(ExprError::Type(_))));
    }

    #[test]
    fn test_unknown_method_is_type_error() {
        assert!(matches!(try_eval("$.frobnicate()", "x"), Err(ExprError::Type(_))));
        assert!(matches!(try_eval("R.frobnicate($)", "x"), Err(ExprError::Type(_))));
    }

    #[test]
    fn test_globals_resolve() {
        assert!(is_global("R"));
        assert!(is_global("chain"));
        assert!(is_global("parseInt"));
        assert!(!is_global("require"));
        assert!(namespace_member(Namespace::Ramda, "toUpper").is_some());
        assert!(namespace_member(Namespace::Ramda, "nope").is_none());
        assert_eq!(
            namespace_member(Namespace::Math, "PI"),
            Some(Value::Number(std::f64::consts::PI))
        );
    }
}
