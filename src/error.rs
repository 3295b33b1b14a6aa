//! Error types for expression compilation, evaluation and pipeline runs.
//!
//! Every failure is classified once, at the top of the program, through
//! [`PipeError::exit_code`].

use std::io;
use thiserror::Error;

/// Exit status for malformed user expressions (syntax or reference errors).
pub const EXIT_INVALID_EXPRESSION: u8 = 3;

/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors raised while compiling or evaluating a user expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("{name} is not defined")]
    Reference { name: String },

    #[error("type error: {0}")]
    Type(String),
}

impl ExprError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        ExprError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ExprError::Reference { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ExprError::Type(message.into())
    }

    /// True for errors caused by the expression text itself rather than
    /// by the data it ran against.
    pub fn is_invalid_expression(&self) -> bool {
        matches!(self, ExprError::Syntax { .. } | ExprError::Reference { .. })
    }
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("{stage} expression `{expression}`: {source}")]
    Expression {
        stage: &'static str,
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("write error: {0}")]
    Output(#[from] io::Error),
}

impl PipeError {
    pub fn expression(stage: &'static str, expression: &str, source: ExprError) -> Self {
        PipeError::Expression {
            stage,
            expression: expression.to_string(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipeError::Expression { source, .. } if source.is_invalid_expression() => {
                EXIT_INVALID_EXPRESSION
            }
            _ => EXIT_FAILURE,
        }
    }

    /// The reader on the other end of stdout went away (`linepipe ... | head`).
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, PipeError::Output(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}
