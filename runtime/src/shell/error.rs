//! Evaluation errors.

use super::executor::ExecError;
use super::parser::Operator;
use std::fmt;
use thiserror::Error;

/// A piece of syntax outside the supported subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    /// A node kind the evaluator cannot turn into a string.
    Node(&'static str),
    /// An operator other than `;` inside a command list.
    Operator(Operator),
    /// A node kind that cannot appear between a list's operators.
    CompoundPart(&'static str),
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Node(kind) => write!(f, "\"{kind}\""),
            Construct::Operator(op) => write!(f, "operator \"{op}\""),
            Construct::CompoundPart(kind) => write!(f, "\"{kind}\" in compound command"),
        }
    }
}

/// Errors returned by [`evaluate`](super::evaluate).
///
/// All of them abort the evaluation; there are no partial results.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("malformed expression {input:?}: {reason}")]
    MalformedExpression { input: String, reason: String },
    #[error("unsupported bash construct: {0}")]
    UnsupportedConstruct(Construct),
    #[error("command substitution failed: {0}")]
    ExecutionFailure(#[from] ExecError),
}

impl EvalError {
    pub(crate) fn malformed(input: &str, reason: impl fmt::Display) -> Self {
        EvalError::MalformedExpression {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
