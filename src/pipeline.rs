//! Pipeline assembly: compile the requested stages once, then push lines.

use std::io::Write;

use tracing::debug;

use crate::compile::{compile_expression, compile_reducer};
use crate::error::PipeError;
use crate::executor::{flush_stages, push_through_stages};
use crate::line_stage::{LineStage, StageKind, build_stage};
use crate::output::TextSink;
use crate::value::Value;

/// What the user asked for. Built by the command line front end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSpec {
    /// Drop empty and whitespace-only lines before any stage.
    pub ignore_blank: bool,
    pub filter: Option<String>,
    pub map: Option<String>,
    pub reduce: Option<String>,
    pub json: bool,
}

impl PipelineSpec {
    /// True when at least one stage is requested.
    pub fn has_actions(&self) -> bool {
        self.filter.is_some() || self.map.is_some() || self.reduce.is_some() || self.json
    }

    /// Compile the requested stages in their fixed order:
    /// filter, map, reduce, json.
    pub fn stage_kinds(&self) -> Result<Vec<StageKind>, PipeError> {
        let mut kinds = Vec::new();
        if let Some(source) = &self.filter {
            let expr =
                compile_expression(source).map_err(|e| PipeError::expression("filter", source, e))?;
            kinds.push(StageKind::Filter(expr));
        }
        if let Some(source) = &self.map {
            let expr =
                compile_expression(source).map_err(|e| PipeError::expression("map", source, e))?;
            kinds.push(StageKind::Map(expr));
        }
        if let Some(source) = &self.reduce {
            let reducer =
                compile_reducer(source).map_err(|e| PipeError::expression("reduce", source, e))?;
            kinds.push(StageKind::Reduce(reducer));
        }
        if self.json {
            kinds.push(StageKind::Json {
                pretty: self.reduce.is_some(),
            });
        }
        Ok(kinds)
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub lines_written: usize,
}

/// An assembled pipeline writing to `W`. Stays open across input sources.
pub struct Pipeline<W: Write> {
    stages: Vec<Box<dyn LineStage>>,
    sink: TextSink<W>,
    ignore_blank: bool,
    summary: RunSummary,
}

impl<W: Write> Pipeline<W> {
    /// Compile every expression up front; nothing is read before this
    /// succeeds.
    pub fn build(spec: &PipelineSpec, writer: W) -> Result<Self, PipeError> {
        let kinds = spec.stage_kinds()?;
        let last = kinds.len().saturating_sub(1);
        let stages: Vec<Box<dyn LineStage>> = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| build_stage(kind, i == last))
            .collect();
        let pipeline = Self {
            stages,
            sink: TextSink::new(writer),
            ignore_blank: spec.ignore_blank,
            summary: RunSummary::default(),
        };
        debug!(
            stages = ?pipeline.stage_names(),
            ignore_blank = spec.ignore_blank,
            "pipeline assembled"
        );
        Ok(pipeline)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Push one input line through every stage.
    pub fn push(&mut self, line: String) -> Result<(), PipeError> {
        self.summary.lines_read += 1;
        if self.ignore_blank && line.trim().is_empty() {
            self.summary.lines_skipped += 1;
            return Ok(());
        }
        let output = push_through_stages(vec![Value::String(line)], &mut self.stages)?;
        self.write_all(&output)
    }

    /// Flush the stages, write their final output and the sink.
    pub fn finish(mut self) -> Result<RunSummary, PipeError> {
        let output = flush_stages(&mut self.stages)?;
        self.write_all(&output)?;
        self.sink.flush()?;
        self.summary.lines_written = self.sink.written();
        debug!(
            read = self.summary.lines_read,
            skipped = self.summary.lines_skipped,
            written = self.summary.lines_written,
            "pipeline finished"
        );
        Ok(self.summary)
    }

    fn write_all(&mut self, values: &[Value]) -> Result<(), PipeError> {
        for value in values {
            self.sink.write_value(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PipelineSpec {
        PipelineSpec::default()
    }

    fn run(spec: &PipelineSpec, lines: &[&str]) -> String {
        let mut out = Vec::new();
        let mut pipeline = Pipeline::build(spec, &mut out).unwrap();
        for line in lines {
            pipeline.push(line.to_string()).unwrap();
        }
        pipeline.finish().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_has_actions() {
        assert!(!spec().has_actions());
        assert!(PipelineSpec { json: true, ..spec() }.has_actions());
        // ignoring blank lines alone is not an action
        assert!(!PipelineSpec { ignore_blank: true, ..spec() }.has_actions());
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let spec = PipelineSpec {
            filter: Some("$".into()),
            map: Some("$".into()),
            reduce: Some("length".into()),
            json: true,
            ..spec()
        };
        let pipeline = Pipeline::build(&spec, Vec::new()).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["filter", "map", "reduce", "json"]);
    }

    #[test]
    fn test_compile_error_before_input() {
        let spec = PipelineSpec {
            map: Some("R.toUpper($".into()),
            ..spec()
        };
        let Err(err) = Pipeline::build(&spec, Vec::new()) else {
            panic!("expected a compile error");
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("map expression `R.toUpper($`"));
    }

    #[test]
    fn test_ignore_blank() {
        let spec = PipelineSpec {
            ignore_blank: true,
            reduce: Some("length".into()),
            ..spec()
        };
        assert_eq!(run(&spec, &["a", "", "  \t", "b"]), "2\n");
    }

    #[test]
    fn test_json_streams_compact_documents() {
        let spec = PipelineSpec {
            map: Some("$.split(',')".into()),
            json: true,
            ..spec()
        };
        assert_eq!(run(&spec, &["a,b", "c"]), "[\"a\",\"b\"]\n[\"c\"]\n");
    }

    #[test]
    fn test_json_after_reduce_is_one_pretty_document() {
        let spec = PipelineSpec {
            map: Some("[Number($)]".into()),
            reduce: Some("concat".into()),
            json: true,
            ..spec()
        };
        assert_eq!(run(&spec, &["1", "2", "3"]), "[\n  1,\n  2,\n  3\n]\n");
    }

    #[test]
    fn test_passthrough_without_stages() {
        assert_eq!(run(&spec(), &["x", "", "y"]), "x\n\ny\n");
    }

    #[test]
    fn test_summary_counts() {
        let spec = PipelineSpec {
            ignore_blank: true,
            filter: Some("$ !== 'b'".into()),
            ..spec()
        };
        let mut pipeline = Pipeline::build(&spec, Vec::new()).unwrap();
        for line in ["a", "b", "", "c"] {
            pipeline.push(line.to_string()).unwrap();
        }
        let summary = pipeline.finish().unwrap();
        assert_eq!(
            summary,
            RunSummary {
                lines_read: 4,
                lines_skipped: 1,
                lines_written: 2,
            }
        );
    }
}
