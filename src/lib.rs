//! # linepipe
//!
//! Line-oriented stream processing with inline expressions.
//!
//! Text is read from stdin or a list of files as one continuous stream of
//! lines. Each line goes through up to four stages, always in this order:
//!
//! - **filter**: keep the line when an expression is truthy
//! - **map**: replace the line with an expression's result
//! - **reduce**: fold everything into one value (`length`, `sum`, `avg`,
//!   `min`, `max`, `concat`, or an expression over `acc`, `$` and `i`)
//! - **json**: print results as JSON documents
//!
//! Expressions are a small JavaScript-flavoured language. `$` is the line,
//! `i` its index, and `R` a library of curried helpers. A bare library
//! reference is applied to the line, so `R.toUpper` means `R.toUpper($)`.
//!
//! ## Example
//!
//! ```
//! use linepipe::{PipelineSpec, Pipeline};
//!
//! let spec = PipelineSpec {
//!     filter: Some("$.length > 3".to_string()),
//!     map: Some("R.toUpper".to_string()),
//!     ..PipelineSpec::default()
//! };
//!
//! let mut out = Vec::new();
//! let mut pipeline = Pipeline::build(&spec, &mut out).unwrap();
//! for line in ["bird", "cat", "horse"] {
//!     pipeline.push(line.to_string()).unwrap();
//! }
//! pipeline.finish().unwrap();
//!
//! assert_eq!(String::from_utf8(out).unwrap(), "BIRD\nHORSE\n");
//! ```

pub mod ast;
pub mod compile;
pub mod error;
pub mod executor;
pub mod input;
pub mod interpreter;
pub mod lexer;
pub mod library;
pub mod line_stage;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod reduce;
pub mod value;

pub use compile::{Builtin, CompiledExpr, Reducer, compile_expression, compile_reducer};
pub use error::{EXIT_FAILURE, EXIT_INVALID_EXPRESSION, ExprError, PipeError};
pub use executor::{execute, flush_stages, push_through_stages};
pub use input::{Lines, Source, SourceChain, lines, run};
pub use line_stage::{LineStage, StageKind, build_stage};
pub use output::{TextSink, render_json, render_text};
pub use pipeline::{Pipeline, PipelineSpec, RunSummary};
pub use reduce::Accumulator;
pub use value::Value;
