//! Line-at-a-time stage trait and implementations.
//!
//! Each `LineStage` takes one value and returns zero or more values for the
//! next stage. Reduce holds everything back until `flush`.

use tracing::trace;

use crate::ast::LINE_VAR;
use crate::compile::{CompiledExpr, Reducer};
use crate::error::PipeError;
use crate::output::{render_json, render_text};
use crate::reduce::Accumulator;
use crate::value::Value;

/// A pipeline stage that processes values one at a time.
pub trait LineStage {
    /// Process a single input value, returning zero or more output values.
    fn process(&mut self, value: Value) -> Result<Vec<Value>, PipeError>;

    /// Flush accumulated state after the last input value.
    fn flush(&mut self) -> Result<Vec<Value>, PipeError> {
        Ok(vec![])
    }

    /// The display name of this stage.
    fn name(&self) -> &str;
}

/// What a stage does, as requested on the command line.
#[derive(Debug, Clone)]
pub enum StageKind {
    Filter(CompiledExpr),
    Map(CompiledExpr),
    Reduce(Reducer),
    Json { pretty: bool },
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Filter(_) => "filter",
            StageKind::Map(_) => "map",
            StageKind::Reduce(_) => "reduce",
            StageKind::Json { .. } => "json",
        }
    }
}

/// Output of a stage; the last stage renders to text, dropping `undefined`.
fn emit(value: Value, emit_text: bool) -> Vec<Value> {
    match value {
        Value::Undefined if emit_text => vec![],
        Value::String(_) => vec![value],
        other if emit_text => vec![Value::String(render_text(&other))],
        other => vec![other],
    }
}

fn line_bindings(value: Value, index: usize) -> [(&'static str, Value); 2] {
    [(LINE_VAR, value), ("i", Value::from(index))]
}

/// FILTER - keeps values whose expression result is truthy.
pub struct FilterStage {
    expr: CompiledExpr,
    index: usize,
    emit_text: bool,
}

impl LineStage for FilterStage {
    fn process(&mut self, value: Value) -> Result<Vec<Value>, PipeError> {
        let index = self.index;
        self.index += 1;
        let keep = self
            .expr
            .eval(line_bindings(value.clone(), index))
            .map_err(|e| PipeError::expression("filter", self.expr.source(), e))?
            .truthy();
        trace!(index, keep, "filter");
        Ok(if keep {
            emit(value, self.emit_text)
        } else {
            vec![]
        })
    }

    fn name(&self) -> &str {
        "filter"
    }
}

/// MAP - replaces each value with its expression result.
pub struct MapStage {
    expr: CompiledExpr,
    index: usize,
    emit_text: bool,
}

impl LineStage for MapStage {
    fn process(&mut self, value: Value) -> Result<Vec<Value>, PipeError> {
        let index = self.index;
        self.index += 1;
        let mapped = self
            .expr
            .eval(line_bindings(value, index))
            .map_err(|e| PipeError::expression("map", self.expr.source(), e))?;
        Ok(emit(mapped, self.emit_text))
    }

    fn name(&self) -> &str {
        "map"
    }
}

/// REDUCE - folds every value and emits the result on flush.
pub struct ReduceStage {
    accumulator: Accumulator,
    source: String,
    emit_text: bool,
}

impl LineStage for ReduceStage {
    fn process(&mut self, value: Value) -> Result<Vec<Value>, PipeError> {
        let index = self.accumulator.count();
        self.accumulator
            .update(value, index)
            .map_err(|e| PipeError::expression("reduce", &self.source, e))?;
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<Value>, PipeError> {
        Ok(emit(self.accumulator.finish(), self.emit_text))
    }

    fn name(&self) -> &str {
        "reduce"
    }
}

/// JSON - renders each value as a JSON document.
pub struct JsonStage {
    pretty: bool,
}

impl LineStage for JsonStage {
    fn process(&mut self, value: Value) -> Result<Vec<Value>, PipeError> {
        Ok(vec![Value::String(render_json(&value, self.pretty))])
    }

    fn name(&self) -> &str {
        "json"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a `LineStage`. `emit_text` is set for the last stage only.
pub fn build_stage(kind: StageKind, emit_text: bool) -> Box<dyn LineStage> {
    match kind {
        StageKind::Filter(expr) => Box::new(FilterStage {
            expr,
            index: 0,
            emit_text,
        }),
        StageKind::Map(expr) => Box::new(MapStage {
            expr,
            index: 0,
            emit_text,
        }),
        StageKind::Reduce(reducer) => Box::new(ReduceStage {
            source: reducer.describe(),
            accumulator: Accumulator::new(reducer),
            emit_text,
        }),
        StageKind::Json { pretty } => Box::new(JsonStage { pretty }),
    }
}
