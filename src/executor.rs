//! Line-at-a-time pipeline executor.
//!
//! Each input line flows through the entire stage chain before the next one
//! is read. At end of input the stages are flushed in order, and whatever a
//! stage emits on flush is pushed through the stages after it.

use crate::error::PipeError;
use crate::line_stage::LineStage;
use crate::value::Value;

/// Push values through a slice of stages, processing each value
/// through each stage in sequence.
pub fn push_through_stages(
    values: Vec<Value>,
    stages: &mut [Box<dyn LineStage>],
) -> Result<Vec<Value>, PipeError> {
    let mut current = values;
    for stage in stages.iter_mut() {
        let mut next = Vec::new();
        for v in current {
            next.extend(stage.process(v)?);
        }
        current = next;
    }
    Ok(current)
}

/// Flush every stage in order, propagating flush output downstream.
pub fn flush_stages(stages: &mut [Box<dyn LineStage>]) -> Result<Vec<Value>, PipeError> {
    let mut output = Vec::new();
    for i in 0..stages.len() {
        let flush_output = stages[i].flush()?;
        if !flush_output.is_empty() {
            output.extend(push_through_stages(flush_output, &mut stages[i + 1..])?);
        }
    }
    Ok(output)
}

/// Run a whole input through the stages and flush them.
pub fn execute(
    input: impl IntoIterator<Item = Value>,
    stages: &mut [Box<dyn LineStage>],
) -> Result<Vec<Value>, PipeError> {
    let mut output = Vec::new();
    for value in input {
        output.extend(push_through_stages(vec![value], stages)?);
    }
    output.extend(flush_stages(stages)?);
    Ok(output)
}
