//! Compilation of user expressions into evaluable stage functions.
//!
//! Each expression is lexed and parsed once, rewritten when written
//! point-free (`R.toUpper` means `R.toUpper($)`), and checked for unbound
//! identifiers before any input is read.

use std::fmt;

use crate::ast::{Expr, LINE_VAR};
use crate::error::ExprError;
use crate::interpreter::{Scope, evaluate};
use crate::library;
use crate::parser::parse_expression;
use crate::value::Value;

/// Names bound for filter and map expressions.
pub const LINE_NAMES: &[&str] = &[LINE_VAR, "i"];

/// Names bound for custom reduce expressions.
pub const ACCUMULATOR_NAMES: &[&str] = &["acc", LINE_VAR, "i"];

/// Name of the library namespace targeted by the point-free rewrite.
const LIBRARY: &str = "R";

/// A parsed, checked expression ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    expr: Expr,
}

impl CompiledExpr {
    /// The expression as the user wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The expression actually evaluated, after any rewrite.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate with the given variable bindings.
    pub fn eval<const N: usize>(&self, bindings: [(&str, Value); N]) -> Result<Value, ExprError> {
        let scope = Scope::default().with(
            bindings
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
        evaluate(&self.expr, &scope)
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Compile a filter or map expression (binds `$` and `i`).
pub fn compile_expression(source: &str) -> Result<CompiledExpr, ExprError> {
    let expr = point_free(parse_expression(source)?);
    check_references(&expr, LINE_NAMES)?;
    Ok(CompiledExpr {
        source: source.to_string(),
        expr,
    })
}

/// Compile a custom reduce expression (binds `acc`, `$` and `i`).
pub fn compile_accumulator(source: &str) -> Result<CompiledExpr, ExprError> {
    let expr = parse_expression(source)?;
    check_references(&expr, ACCUMULATOR_NAMES)?;
    Ok(CompiledExpr {
        source: source.to_string(),
        expr,
    })
}

/// Wrap `expr` as `expr($)` when it is a point-free library reference.
///
/// Applies to `R.f`, and to calls rooted in `R` whose arguments never
/// mention `$` (`R.split(',')`, `R.pipe(R.trim, R.toUpper)`).
pub fn point_free(expr: Expr) -> Expr {
    let wrap = match &expr {
        Expr::Member { object, .. } => rooted_in_library(object),
        Expr::Call { callee, args } => {
            rooted_in_library(callee) && !args.iter().any(|a| a.mentions(LINE_VAR))
        }
        _ => false,
    };
    if wrap {
        Expr::call(expr, vec![Expr::Ident(LINE_VAR.to_string())])
    } else {
        expr
    }
}

fn rooted_in_library(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(name) => name == LIBRARY,
        Expr::Member { object, .. } | Expr::Index { object, .. } => rooted_in_library(object),
        Expr::Call { callee, .. } => rooted_in_library(callee),
        _ => false,
    }
}

/// Fail on the first identifier that nothing binds.
fn check_references(expr: &Expr, stage_names: &[&str]) -> Result<(), ExprError> {
    let mut bound: Vec<String> = stage_names.iter().map(|n| n.to_string()).collect();
    check(expr, &mut bound)
}

fn check(expr: &Expr, bound: &mut Vec<String>) -> Result<(), ExprError> {
    let is_bound = |bound: &[String], name: &str| bound.iter().any(|b| b == name);
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined => Ok(()),
        Expr::Ident(name) => {
            if is_bound(bound, name) || library::is_global(name) {
                Ok(())
            } else {
                Err(ExprError::reference(name.clone()))
            }
        }
        Expr::Member { object, property } => {
            if let Expr::Ident(root) = object.as_ref()
                && !is_bound(bound, root)
                && let Some(Value::Namespace(ns)) = library::global(root)
            {
                return match library::namespace_member(ns, property) {
                    Some(_) => Ok(()),
                    None => Err(ExprError::reference(format!("{root}.{property}"))),
                };
            }
            check(object, bound)
        }
        Expr::Index { object, index } => {
            check(object, bound)?;
            check(index, bound)
        }
        Expr::Call { callee, args } => {
            check(callee, bound)?;
            args.iter().try_for_each(|a| check(a, bound))
        }
        Expr::Array(items) => items.iter().try_for_each(|e| check(e, bound)),
        Expr::Object(fields) => fields.iter().try_for_each(|(_, e)| check(e, bound)),
        Expr::Unary { operand, .. } => check(operand, bound),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            check(left, bound)?;
            check(right, bound)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            check(test, bound)?;
            check(consequent, bound)?;
            check(alternate, bound)
        }
        Expr::Arrow { params, body } => {
            let depth = bound.len();
            bound.extend(params.iter().cloned());
            let result = check(body, bound);
            bound.truncate(depth);
            result
        }
    }
}

/// Built-in reducers selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Length,
    Min,
    Max,
    Sum,
    Avg,
    Concat,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "length" => Some(Builtin::Length),
            "min" => Some(Builtin::Min),
            "max" => Some(Builtin::Max),
            "sum" => Some(Builtin::Sum),
            "avg" => Some(Builtin::Avg),
            "concat" => Some(Builtin::Concat),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Length => "length",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Avg => "avg",
            Builtin::Concat => "concat",
        }
    }
}

/// A compiled `--reduce` argument.
#[derive(Debug, Clone)]
pub enum Reducer {
    Builtin(Builtin),
    Custom(CompiledExpr),
}

impl Reducer {
    pub fn describe(&self) -> String {
        match self {
            Reducer::Builtin(b) => b.name().to_string(),
            Reducer::Custom(expr) => expr.source().to_string(),
        }
    }
}

/// Built-in names win; anything else is a custom accumulator expression.
pub fn compile_reducer(source: &str) -> Result<Reducer, ExprError> {
    match Builtin::from_name(source.trim()) {
        Some(builtin) => Ok(Reducer::Builtin(builtin)),
        None => compile_accumulator(source).map(Reducer::Custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewritten(source: &str) -> String {
        compile_expression(source).unwrap().expr().to_string()
    }

    fn line(expr: &CompiledExpr, text: &str, index: usize) -> Value {
        expr.eval([(LINE_VAR, Value::from(text)), ("i", Value::from(index))])
            .unwrap()
    }

    #[test]
    fn test_point_free_member_is_applied_to_line() {
        assert_eq!(rewritten("R.toUpper"), "R.toUpper($)");
        let expr = compile_expression("R.toUpper").unwrap();
        assert_eq!(line(&expr, "abc", 0), Value::from("ABC"));
    }

    #[test]
    fn test_point_free_partial_call_is_applied_to_line() {
        assert_eq!(rewritten("R.split(',')"), r#"R.split(",")($)"#);
        assert_eq!(
            rewritten("R.pipe(R.trim, R.toUpper)"),
            "R.pipe(R.trim, R.toUpper)($)"
        );
    }

    #[test]
    fn test_explicit_application_is_unchanged() {
        assert_eq!(rewritten("R.toUpper($)"), "R.toUpper($)");
        assert_eq!(rewritten("R.split(',', $)"), r#"R.split(",", $)"#);
    }

    #[test]
    fn test_expressions_without_library_are_unchanged() {
        assert_eq!(rewritten("$.length > 3"), "$.length > 3");
        assert_eq!(rewritten("$.toUpperCase()"), "$.toUpperCase()");
        assert_eq!(rewritten("i"), "i");
    }

    #[test]
    fn test_index_binding() {
        let expr = compile_expression("i + ':' + $").unwrap();
        assert_eq!(line(&expr, "x", 4), Value::from("4:x"));
    }

    #[test]
    fn test_undefined_identifier_is_reference_error() {
        let err = compile_expression("foo + 1").unwrap_err();
        assert_eq!(err, ExprError::reference("foo"));
        assert!(err.is_invalid_expression());
    }

    #[test]
    fn test_unknown_library_member_is_reference_error() {
        let err = compile_expression("R.nosuch($)").unwrap_err();
        assert_eq!(err, ExprError::reference("R.nosuch"));
    }

    #[test]
    fn test_arrow_parameters_are_bound() {
        assert!(compile_expression("R.map(x => x + 1, [1])").is_ok());
        assert!(compile_expression("R.map(x => y, [1])").is_err());
        // `acc` only exists inside a reduce
        assert!(compile_expression("acc + $").is_err());
    }

    #[test]
    fn test_syntax_error_surfaces() {
        let err = compile_expression("R.toUpper($").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { .. }));
    }

    #[test]
    fn test_compile_reducer_builtins() {
        for name in ["length", "min", "max", "sum", "avg", "concat"] {
            match compile_reducer(name).unwrap() {
                Reducer::Builtin(b) => assert_eq!(b.name(), name),
                Reducer::Custom(_) => panic!("{name} should be a builtin"),
            }
        }
    }

    #[test]
    fn test_compile_reducer_custom() {
        let Reducer::Custom(expr) = compile_reducer("acc + Number($)").unwrap() else {
            panic!("expected a custom reducer");
        };
        let value = expr
            .eval([
                ("acc", Value::from(1.0)),
                (LINE_VAR, Value::from("2")),
                ("i", Value::from(1usize)),
            ])
            .unwrap();
        assert_eq!(value, Value::from(3.0));
    }

    #[test]
    fn test_custom_reducer_is_not_point_free() {
        let Reducer::Custom(expr) = compile_reducer("R.add").unwrap() else {
            panic!("expected a custom reducer");
        };
        assert_eq!(expr.expr().to_string(), "R.add");
    }
}
