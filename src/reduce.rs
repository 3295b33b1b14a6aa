//! Running accumulator state for the reduce stage.

use crate::ast::LINE_VAR;
use crate::compile::{Builtin, Reducer};
use crate::error::ExprError;
use crate::value::Value;

/// Accumulates the values reaching a reduce stage and yields one result.
#[derive(Debug)]
pub struct Accumulator {
    reducer: Reducer,
    acc: Option<Value>,
    sum: f64,
    count: usize,
}

impl Accumulator {
    pub fn new(reducer: Reducer) -> Self {
        Self {
            reducer,
            acc: None,
            sum: 0.0,
            count: 0,
        }
    }

    /// Fold `value`, the `index`-th value seen by the stage, into the state.
    pub fn update(&mut self, value: Value, index: usize) -> Result<(), ExprError> {
        self.count += 1;
        match &self.reducer {
            Reducer::Builtin(Builtin::Length) => {}
            Reducer::Builtin(Builtin::Sum | Builtin::Avg) => self.sum += value.to_number(),
            Reducer::Builtin(builtin @ (Builtin::Min | Builtin::Max)) => {
                let n = value.to_number();
                let next = match self.acc.take() {
                    None => n,
                    Some(prev) => {
                        let prev = prev.to_number();
                        if prev.is_nan() || n.is_nan() {
                            f64::NAN
                        } else if *builtin == Builtin::Min {
                            prev.min(n)
                        } else {
                            prev.max(n)
                        }
                    }
                };
                self.acc = Some(Value::Number(next));
            }
            Reducer::Builtin(Builtin::Concat) => {
                self.acc = Some(match self.acc.take() {
                    None => value,
                    Some(acc) => concat(acc, value),
                });
            }
            Reducer::Custom(expr) => {
                // the first value seeds the accumulator unevaluated
                self.acc = Some(match self.acc.take() {
                    None => value,
                    Some(acc) => expr.eval([
                        ("acc", acc),
                        (LINE_VAR, value),
                        ("i", Value::from(index)),
                    ])?,
                });
            }
        }
        Ok(())
    }

    /// Number of values folded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The final result. Resets the state.
    pub fn finish(&mut self) -> Value {
        let acc = self.acc.take();
        let (sum, count) = (self.sum, self.count);
        self.sum = 0.0;
        self.count = 0;
        match &self.reducer {
            Reducer::Builtin(Builtin::Length) => Value::from(count),
            Reducer::Builtin(Builtin::Sum) => Value::Number(sum),
            Reducer::Builtin(Builtin::Avg) if count == 0 => Value::Number(0.0),
            Reducer::Builtin(Builtin::Avg) => Value::Number(sum / count as f64),
            Reducer::Builtin(Builtin::Concat) => acc.unwrap_or_else(|| Value::from("")),
            Reducer::Builtin(Builtin::Min | Builtin::Max) | Reducer::Custom(_) => {
                acc.unwrap_or(Value::Undefined)
            }
        }
    }
}

/// Arrays extend arrays; anything else appends its text to a string.
fn concat(acc: Value, value: Value) -> Value {
    match (acc, value) {
        (Value::Array(mut items), Value::Array(more)) => {
            items.extend(more);
            Value::Array(items)
        }
        (Value::Array(mut items), other) => {
            items.push(other);
            Value::Array(items)
        }
        (acc, value) => Value::String(acc.render() + &value.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_reducer;

    fn reduce(reducer: &str, lines: &[&str]) -> Value {
        let mut acc = Accumulator::new(compile_reducer(reducer).unwrap());
        for (i, line) in lines.iter().enumerate() {
            acc.update(Value::from(*line), i).unwrap();
        }
        acc.finish()
    }

    #[test]
    fn test_length() {
        assert_eq!(reduce("length", &["a", "b", "c", "d"]), Value::from(4usize));
        assert_eq!(reduce("length", &[]), Value::from(0usize));
    }

    #[test]
    fn test_sum_and_avg() {
        assert_eq!(reduce("sum", &["1", "2", "3.5"]), Value::from(6.5));
        assert_eq!(reduce("sum", &[]), Value::from(0.0));
        assert_eq!(reduce("avg", &["1", "2", "3", "4"]), Value::from(2.5));
        assert_eq!(reduce("avg", &[]), Value::from(0.0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(reduce("min", &["3", "1", "2"]), Value::from(1.0));
        assert_eq!(reduce("max", &["3", "10", "2"]), Value::from(10.0));
        assert_eq!(reduce("max", &[]), Value::Undefined);
    }

    #[test]
    fn test_min_propagates_nan() {
        let Value::Number(n) = reduce("min", &["1", "abc", "0"]) else {
            panic!("expected a number");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_concat() {
        assert_eq!(reduce("concat", &["a", "b", "c"]), Value::from("abc"));
        assert_eq!(reduce("concat", &[]), Value::from(""));

        let mut acc = Accumulator::new(compile_reducer("concat").unwrap());
        acc.update(Value::Array(vec![Value::from(1.0)]), 0).unwrap();
        acc.update(Value::Array(vec![Value::from(2.0)]), 1).unwrap();
        acc.update(Value::from(3.0), 2).unwrap();
        assert_eq!(
            acc.finish(),
            Value::Array(vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)])
        );
    }

    #[test]
    fn test_custom_seeds_with_first_value() {
        assert_eq!(
            reduce("acc + '|' + $", &["a", "b", "c"]),
            Value::from("a|b|c")
        );
        assert_eq!(reduce("acc + $", &["only"]), Value::from("only"));
        assert_eq!(reduce("acc + $", &[]), Value::Undefined);
    }

    #[test]
    fn test_custom_sees_index() {
        assert_eq!(reduce("acc + i", &["x", "y", "z"]), Value::from("x12"));
    }

    #[test]
    fn test_custom_error_propagates() {
        let mut acc = Accumulator::new(compile_reducer("acc.foo()").unwrap());
        acc.update(Value::from("a"), 0).unwrap();
        assert!(matches!(
            acc.update(Value::from("b"), 1),
            Err(ExprError::Type(_))
        ));
    }
}
