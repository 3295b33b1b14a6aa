//! Tree-walking evaluator for parsed expressions.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::ExprError;
use crate::library;
use crate::value::{Closure, Function, Value};

/// Lexical variable bindings. Cloning is cheap; frames are shared.
#[derive(Clone, Default)]
pub struct Scope(Option<Rc<Frame>>);

struct Frame {
    vars: HashMap<String, Value>,
    parent: Scope,
}

impl Scope {
    /// A child scope holding `bindings` on top of this one.
    pub fn with(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Scope {
        Scope(Some(Rc::new(Frame {
            vars: bindings.into_iter().collect(),
            parent: self.clone(),
        })))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = self;
        while let Some(frame) = &current.0 {
            if let Some(value) = frame.vars.get(name) {
                return Some(value.clone());
            }
            current = &frame.parent;
        }
        None
    }
}

pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Undefined => Ok(Value::Undefined),
        Expr::Ident(name) => scope
            .lookup(name)
            .or_else(|| library::global(name))
            .ok_or_else(|| ExprError::reference(name.clone())),
        Expr::Array(items) => Ok(Value::Array(evaluate_all(items, scope)?)),
        Expr::Object(fields) => {
            let mut map = std::collections::BTreeMap::new();
            for (key, value) in fields {
                map.insert(key.clone(), evaluate(value, scope)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Member { object, property } => {
            let object = evaluate(object, scope)?;
            get_property(&object, property)
        }
        Expr::Index { object, index } => {
            let object = evaluate(object, scope)?;
            let index = evaluate(index, scope)?;
            get_index(&object, &index)
        }
        Expr::Call { callee, args } => {
            if let Expr::Member { object, property } = callee.as_ref() {
                let receiver = evaluate(object, scope)?;
                let args = evaluate_all(args, scope)?;
                return call_member(receiver, property, args);
            }
            let function = evaluate(callee, scope)?;
            let Value::Function(function) = function else {
                return Err(ExprError::type_error(format!("{callee} is not a function")));
            };
            let args = evaluate_all(args, scope)?;
            apply(&function, args)
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, scope)?;
            let short_circuit = match op {
                LogicalOp::And => !left.truthy(),
                LogicalOp::Or => left.truthy(),
                LogicalOp::Nullish => !left.is_nil(),
            };
            if short_circuit {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
        Expr::Arrow { params, body } => Ok(Value::Function(Function::Lambda(Rc::new(Closure {
            params: params.clone(),
            body: Rc::clone(body),
            scope: scope.clone(),
        })))),
    }
}

fn evaluate_all(exprs: &[Expr], scope: &Scope) -> Result<Vec<Value>, ExprError> {
    exprs.iter().map(|e| evaluate(e, scope)).collect()
}

/// `receiver.name(args)`: namespace members, chain steps, object-held
/// functions, then built-in methods of strings, arrays and numbers.
fn call_member(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match receiver {
        Value::Namespace(ns) => match library::namespace_member(ns, name) {
            Some(function) => call_value(&function, args),
            None => Err(ExprError::type_error(format!(
                "{}.{name} is not a function",
                ns.name()
            ))),
        },
        Value::Chain(inner) => library::chain_step(*inner, name, args),
        Value::Object(ref fields) if matches!(fields.get(name), Some(Value::Function(_))) => {
            let function = fields.get(name).cloned().unwrap_or(Value::Undefined);
            call_value(&function, args)
        }
        Value::Undefined | Value::Null => Err(ExprError::type_error(format!(
            "cannot read properties of {} (reading '{name}')",
            receiver.type_name()
        ))),
        other => library::call_method(other, name, args),
    }
}

pub fn get_property(object: &Value, name: &str) -> Result<Value, ExprError> {
    match object {
        Value::Undefined | Value::Null => Err(ExprError::type_error(format!(
            "cannot read properties of {} (reading '{name}')",
            object.type_name()
        ))),
        Value::Namespace(ns) => Ok(library::namespace_member(*ns, name).unwrap_or(Value::Undefined)),
        Value::Object(fields) => Ok(fields.get(name).cloned().unwrap_or(Value::Undefined)),
        Value::String(s) if name == "length" => Ok(Value::from(s.chars().count())),
        Value::Array(items) if name == "length" => Ok(Value::from(items.len())),
        _ => Ok(Value::Undefined),
    }
}

pub fn get_index(object: &Value, index: &Value) -> Result<Value, ExprError> {
    match (object, index) {
        (Value::Array(items), Value::Number(n)) => Ok(position(*n)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Undefined)),
        (Value::String(s), Value::Number(n)) => Ok(position(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Undefined)),
        (object, index) => get_property(object, &index.render()),
    }
}

/// Non-negative integral index, if `n` is one.
fn position(n: f64) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 {
        Some(n as usize)
    } else {
        None
    }
}

pub fn call_value(function: &Value, args: Vec<Value>) -> Result<Value, ExprError> {
    match function {
        Value::Function(f) => apply(f, args),
        other => Err(ExprError::type_error(format!(
            "{} is not a function",
            other.type_name()
        ))),
    }
}

/// Apply a function value. Curried natives collect arguments until their
/// arity is reached and return a partial application until then.
pub fn apply(function: &Function, args: Vec<Value>) -> Result<Value, ExprError> {
    match function {
        Function::Native {
            ns,
            name,
            arity,
            bound,
        } => {
            let mut all = bound.clone();
            all.extend(args);
            match arity {
                Some(n) if all.len() < *n => Ok(Value::Function(Function::Native {
                    ns: *ns,
                    name,
                    arity: *arity,
                    bound: all,
                })),
                _ => library::call_native(*ns, name, all),
            }
        }
        Function::Lambda(closure) => {
            let mut args = args.into_iter();
            let bindings: Vec<(String, Value)> = closure
                .params
                .iter()
                .map(|p| (p.clone(), args.next().unwrap_or(Value::Undefined)))
                .collect();
            evaluate(&closure.body, &closure.scope.with(bindings))
        }
        Function::Pipe(functions) => {
            let mut functions = functions.iter();
            let Some(first) = functions.next() else {
                return Ok(args.into_iter().next().unwrap_or(Value::Undefined));
            };
            let mut result = call_value(first, args)?;
            for f in functions {
                result = call_value(f, vec![result])?;
            }
            Ok(result)
        }
    }
}

/// Relational comparison: strings compare lexically, everything else
/// numerically. `None` when either side is NaN.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// `+` concatenates as soon as either side is not a primitive number-like.
fn add(left: &Value, right: &Value) -> Value {
    let stringy = |v: &Value| {
        matches!(
            v,
            Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    };
    if stringy(left) || stringy(right) {
        Value::String(format!("{}{}", left.render(), right.render()))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}
