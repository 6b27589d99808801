//! Environment mapping and `NAME=value` assignment lists.
//!
//! An assignment list is the kind of string users put in configuration to
//! extend an environment, e.g. `PREFIX=/opt/tool BIN=$PREFIX/bin ARCH=$(uname -m)`.
//! Each value is an expression evaluated against the environment built so far.

use super::error::EvalError;
use super::eval::evaluate_with;
use super::executor::Executor;
use super::parser::{self, Node, ParseError};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Variable name to value. Caller-owned; the evaluator never mutates it.
pub type Environment = HashMap<String, String>;

// ============================================================================
// Assignments
// ============================================================================

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentValue {
    /// Evaluated as a shell expression when the environment is built.
    Expression(String),
    /// Used verbatim.
    Raw(String),
}

/// A single `NAME=value` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: AssignmentValue,
}

impl Assignment {
    pub fn expression(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AssignmentValue::Expression(value.into()),
        }
    }

    pub fn raw(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AssignmentValue::Raw(value.into()),
        }
    }

    /// The value this assignment produces in `environment`.
    pub fn evaluated_value(
        &self,
        environment: &Environment,
        executor: &dyn Executor,
    ) -> Result<String, EvalError> {
        match &self.value {
            AssignmentValue::Expression(expr) => evaluate_with(expr, environment, executor),
            AssignmentValue::Raw(value) => Ok(value.clone()),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            AssignmentValue::Expression(expr) => write!(f, "{}={}", self.name, expr),
            AssignmentValue::Raw(value) => match shlex::try_quote(value) {
                Ok(quoted) => write!(f, "{}={}", self.name, quoted),
                Err(_) => write!(f, "{}={}", self.name, value),
            },
        }
    }
}

// ============================================================================
// Assignment lists
// ============================================================================

/// Errors from [`parse_environment`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvParseError {
    #[error("malformed environment option {input:?}: {source}")]
    Syntax {
        input: String,
        #[source]
        source: ParseError,
    },
    #[error("malformed environment assignment {0:?}: expected NAME=value")]
    MissingEquals(String),
    #[error("invalid variable name {0:?}")]
    InvalidName(String),
    #[error("unexpected {0} in environment option")]
    Unexpected(String),
}

/// An ordered list of assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEnvironment {
    assignments: Vec<Assignment>,
}

impl ParsedEnvironment {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Add a raw assignment at the end, or at the start when `prepend` is set.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>, prepend: bool) {
        let assignment = Assignment::raw(name, value);
        if prepend {
            self.assignments.insert(0, assignment);
        } else {
            self.assignments.push(assignment);
        }
    }

    /// Apply every assignment in order on top of `previous`.
    ///
    /// Each value is evaluated against the environment as it stands after the
    /// assignments before it, so later entries can refer to earlier ones.
    /// `previous` is left untouched.
    pub fn as_environment(
        &self,
        previous: &Environment,
        executor: &dyn Executor,
    ) -> Result<Environment, EvalError> {
        let mut environment = previous.clone();
        for assignment in &self.assignments {
            let value = assignment.evaluated_value(&environment, executor)?;
            tracing::trace!(name = %assignment.name, "assigned variable");
            environment.insert(assignment.name.clone(), value);
        }
        Ok(environment)
    }
}

impl fmt::Display for ParsedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{assignment}")?;
        }
        Ok(())
    }
}

/// Parse a whitespace-separated list of `NAME=value` assignments.
///
/// Values keep their original quoting and expansions; they are only evaluated
/// by [`ParsedEnvironment::as_environment`].
pub fn parse_environment(text: &str) -> Result<ParsedEnvironment, EnvParseError> {
    let tree = parser::parse(text).map_err(|source| EnvParseError::Syntax {
        input: text.to_string(),
        source,
    })?;

    if let Some(op) = tree.parts().iter().find_map(|part| match part {
        Node::Operator { op, .. } => Some(*op),
        _ => None,
    }) {
        return Err(EnvParseError::Unexpected(format!("operator {:?}", op.symbol())));
    }

    let mut assignments = Vec::with_capacity(tree.parts().len());
    for part in tree.parts() {
        // Leading items parse as assignments, later ones as plain words
        let (Node::Assignment { span, .. } | Node::Word { span, .. }) = part else {
            return Err(EnvParseError::Unexpected(part.kind_name().to_string()));
        };
        let item = &text[span.clone()];
        let Some((name, value)) = item.split_once('=') else {
            return Err(EnvParseError::MissingEquals(item.to_string()));
        };
        if !parser::is_identifier(name) {
            return Err(EnvParseError::InvalidName(name.to_string()));
        }
        assignments.push(Assignment::expression(name, value));
    }

    Ok(ParsedEnvironment { assignments })
}
